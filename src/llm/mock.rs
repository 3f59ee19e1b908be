//! Mock providers for offline mode and tests
//!
//! The mock embedder is deterministic: the same text always maps to the same
//! vector, seeded from a hash of the input. That keeps retrieval tests
//! reproducible and honours the embedder contract.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::EngineResult;

use super::{Embedder, TextGenerator};

/// Canned text generation: snapshot-extraction prompts get a parseable JSON
/// array, everything else gets a fixed non-causal analysis paragraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockTextGenerator;

impl MockTextGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate(&self, prompt: &str, _system_prompt: &str) -> EngineResult<String> {
        if prompt.to_lowercase().contains("snapshot") {
            return Ok(r#"[{
                "inferred_time_window": "immediate post-impact",
                "location_context": "dense urban center",
                "decision_context": "communications down, extent of collapse unclear",
                "uncertainties": ["casualty count unclear"],
                "risks_perceived": ["aftershocks"],
                "actions_considered": ["staged evacuation"],
                "action_taken_narrative": "deployed urban search and rescue to the densest block"
            }]"#
            .to_string());
        }
        Ok("In similar cases, early coordination of rescue and evacuation was \
            associated with better outcomes. Historical patterns suggest elevated \
            aftershock risk in the first day; casualty figures remain uncertain."
            .to_string())
    }
}

/// Deterministic pseudo-embedder with a fixed dimension.
#[derive(Debug, Clone, Copy)]
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        Ok((0..self.dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
    }
}
