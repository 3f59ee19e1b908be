//! Narrative snapshot pipeline
//!
//! The live advisory path: raw case text is decomposed into decision
//! snapshots by the LLM, embedded, and stored; a query narrative retrieves
//! the closest snapshots, whose perceived risks and actions are aggregated
//! into the structured reply alongside an LLM-written comparison paragraph.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::DEFAULT_TOP_K;
use crate::error::{EngineError, EngineResult};
use crate::llm::{advisory, extraction, Embedder, TextGenerator};
use crate::memory::SnapshotMemory;
use crate::types::DecisionSnapshot;

use super::EvidencePipeline;

/// Maximum deduplicated risks/actions surfaced per reply.
const MAX_LISTED: usize = 5;

/// Fallbacks when the retrieved snapshots carry no usable risks/actions.
const FALLBACK_RISK: &str = "Risk assessment requires more data.";
const FALLBACK_ACTION: &str = "Evaluate situation further.";

// ============================================================================
// Output shape
// ============================================================================

/// One retrieved snapshot referenced as evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBasis {
    pub case_study_id: String,
    pub inferred_time_window: String,
    pub excerpt: String,
    pub similarity_score: f64,
}

/// Structured decision-support reply for the HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSupport {
    pub top_risks: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub explanation: String,
    pub historical_basis: Vec<HistoricalBasis>,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Narrative pipeline over the snapshot memory.
pub struct NarrativePipeline {
    text: Arc<dyn TextGenerator>,
    embedder: Arc<dyn Embedder>,
    memory: SnapshotMemory,
}

impl NarrativePipeline {
    pub fn new(
        text: Arc<dyn TextGenerator>,
        embedder: Arc<dyn Embedder>,
        memory: SnapshotMemory,
    ) -> Self {
        Self {
            text,
            embedder,
            memory,
        }
    }

    /// Extract snapshots from raw case text, embed, and store them.
    /// A malformed extraction reply stores nothing and returns zero.
    pub async fn ingest_raw_text(
        &self,
        case_id: &str,
        source_id: &str,
        raw_text: &str,
    ) -> EngineResult<usize> {
        let prompt = extraction::build_extraction_prompt(raw_text);
        let reply = self
            .text
            .generate(&prompt, extraction::EXTRACTION_SYSTEM_PROMPT)
            .await?;

        let snapshots = extraction::parse_snapshots(&reply, case_id, source_id);
        if snapshots.is_empty() {
            return Ok(0);
        }

        let embeddings = futures::future::try_join_all(snapshots.iter().map(|snap| {
            let embedder = self.embedder.clone();
            let text = snap.narrative_text();
            async move { embedder.embed(&text).await }
        }))
        .await?;

        let stored = self.memory.store_snapshots(&snapshots, embeddings).await?;
        info!(case_id, stored, "Stored narrative snapshots");
        Ok(stored)
    }

    /// Retrieve the snapshots closest to a free-text query.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
    ) -> EngineResult<Vec<(DecisionSnapshot, f64)>> {
        let vector = self.embedder.embed(query_text).await?;
        self.memory.retrieve_relevant(&vector, top_k).await
    }

    /// Full decision support: retrieval, aggregation, and the LLM
    /// comparison paragraph.
    pub async fn decision_support(&self, current_narrative: &str) -> EngineResult<DecisionSupport> {
        let retrieved = self.retrieve(current_narrative, DEFAULT_TOP_K).await?;
        let snapshots: Vec<DecisionSnapshot> =
            retrieved.iter().map(|(snap, _)| snap.clone()).collect();

        let prompt = advisory::build_support_prompt(current_narrative, &snapshots);
        let explanation = self.text.generate(&prompt, "").await?;

        // Aggregate risks and actions from the retrieved snapshots,
        // deduplicated case-insensitively in retrieval order.
        let mut top_risks = Vec::new();
        let mut recommended_actions = Vec::new();
        let mut seen_risks = HashSet::new();
        let mut seen_actions = HashSet::new();
        let mut historical_basis = Vec::new();

        for (snap, score) in &retrieved {
            historical_basis.push(HistoricalBasis {
                case_study_id: snap.case_study_id.clone(),
                inferred_time_window: snap.inferred_time_window.clone(),
                excerpt: snap.decision_context.clone(),
                similarity_score: *score,
            });

            for risk in &snap.risks_perceived {
                let cleaned = risk.trim();
                if !cleaned.is_empty() && seen_risks.insert(cleaned.to_lowercase()) {
                    top_risks.push(cleaned.to_string());
                }
            }

            let action = snap.action_taken_narrative.trim();
            if !action.is_empty() && seen_actions.insert(action.to_lowercase()) {
                recommended_actions.push(action.to_string());
            }
        }

        if top_risks.is_empty() {
            top_risks.push(FALLBACK_RISK.to_string());
        }
        if recommended_actions.is_empty() {
            recommended_actions.push(FALLBACK_ACTION.to_string());
        }
        top_risks.truncate(MAX_LISTED);
        recommended_actions.truncate(MAX_LISTED);

        Ok(DecisionSupport {
            top_risks,
            recommended_actions,
            explanation,
            historical_basis,
        })
    }
}

#[async_trait]
impl EvidencePipeline for NarrativePipeline {
    fn name(&self) -> &'static str {
        "narrative"
    }

    async fn ingest_case(
        &self,
        case_id: &str,
        source_id: &str,
        document: &Value,
    ) -> EngineResult<usize> {
        let raw_text = document.as_str().ok_or_else(|| {
            EngineError::InvalidInput("narrative ingestion expects raw text".to_string())
        })?;
        self.ingest_raw_text(case_id, source_id, raw_text).await
    }
}
