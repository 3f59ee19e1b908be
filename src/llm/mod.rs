//! External language-model and embedding interfaces
//!
//! The engine treats both providers as pluggable seams:
//!
//! - [`TextGenerator`]: two uses only, narrative snapshot extraction from
//!   raw case text and the advisory paragraph for decision support.
//! - [`Embedder`]: text to fixed-dimension vector, deterministic for
//!   identical inputs within one provider revision.
//!
//! Providers are selected from configuration at startup and threaded through
//! component constructors; nothing holds a process-wide client.

pub mod advisory;
pub mod extraction;
mod mock;
mod providers;

pub use mock::{MockEmbedder, MockTextGenerator};
pub use providers::{GroqClient, HfEmbeddingClient, OpenAiEmbeddingClient, OpenAiTextClient};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{EmbeddingProvider, EngineConfig, TextProvider};
use crate::error::EngineResult;

/// Text generation contract.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> EngineResult<String>;
}

/// Embedding contract: text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;
}

/// Assemble the text and embedding providers selected by configuration.
///
/// Configuration validation (unknown provider, missing credentials) happens
/// in [`EngineConfig::from_env`]; this factory only wires clients.
pub fn build_providers(
    config: &EngineConfig,
) -> EngineResult<(Arc<dyn TextGenerator>, Arc<dyn Embedder>)> {
    let text: Arc<dyn TextGenerator> = match config.text_provider {
        TextProvider::Groq => Arc::new(GroqClient::new(config)?),
        TextProvider::OpenAi => Arc::new(OpenAiTextClient::new(config)?),
        TextProvider::Mock => Arc::new(MockTextGenerator::new()),
    };

    let embedder: Arc<dyn Embedder> = match config.embedding_provider {
        EmbeddingProvider::HuggingFace => Arc::new(HfEmbeddingClient::new(config)?),
        EmbeddingProvider::OpenAi => Arc::new(OpenAiEmbeddingClient::new(config)?),
        EmbeddingProvider::Mock => Arc::new(MockEmbedder::new(config.embedding_dim)),
    };

    Ok((text, embedder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_config_builds_mock_providers() {
        let config = EngineConfig::mock();
        let (text, embedder) = build_providers(&config).unwrap();

        assert_eq!(embedder.dim(), 384);
        let vector = embedder.embed("collapsed viaduct, dense district").await.unwrap();
        assert_eq!(vector.len(), 384);

        let out = text.generate("summarize", "").await.unwrap();
        assert!(!out.is_empty());
    }
}
