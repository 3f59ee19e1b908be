//! Engine configuration
//!
//! All runtime configuration is injected through environment variables,
//! captured once at startup. Provider selection errors are fatal: the
//! process refuses to start rather than run with a half-wired stack.
//!
//! Recognized variables:
//! - `TEXT_LLM_PROVIDER`: groq | openai | mock (default: groq)
//! - `EMBEDDING_PROVIDER`: huggingface | openai | mock (default: huggingface)
//! - `MOCK_MODE=true`: force mock clients and the in-memory store end-to-end
//! - `LLM_MODEL`: text model identifier override
//! - `VECTOR_STORE_URL`, `VECTOR_STORE_API_KEY`: remote store
//! - `VECTOR_STORE_HOST`, `VECTOR_STORE_PORT`: local store endpoint
//! - `GROQ_API_KEY`, `OPENAI_API_KEY`, `HF_API_TOKEN`: provider credentials
//! - `SEREN_SERVER_ADDR`: HTTP bind address (default: 0.0.0.0:8080)

mod defaults;

pub use defaults::*;

use crate::error::EngineError;

// ============================================================================
// Provider selection
// ============================================================================

/// Text generation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProvider {
    Groq,
    OpenAi,
    Mock,
}

/// Embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    HuggingFace,
    OpenAi,
    Mock,
}

/// Vector store endpoint: managed remote deployment or local instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorStoreEndpoint {
    Remote { url: String, api_key: Option<String> },
    Local { host: String, port: u16 },
    InMemory,
}

impl VectorStoreEndpoint {
    /// Base URL for the store's REST API. The in-memory store has none.
    pub fn base_url(&self) -> Option<String> {
        match self {
            VectorStoreEndpoint::Remote { url, .. } => Some(url.trim_end_matches('/').to_string()),
            VectorStoreEndpoint::Local { host, port } => Some(format!("http://{host}:{port}")),
            VectorStoreEndpoint::InMemory => None,
        }
    }
}

// ============================================================================
// Engine configuration
// ============================================================================

/// Full engine configuration, read-only after startup.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub text_provider: TextProvider,
    pub embedding_provider: EmbeddingProvider,
    pub mock_mode: bool,
    pub llm_model: Option<String>,
    pub vector_store: VectorStoreEndpoint,
    pub embedding_dim: usize,
    pub request_timeout_secs: u64,
    pub server_addr: String,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub hf_api_token: Option<String>,
}

impl EngineConfig {
    /// Build configuration from the environment.
    ///
    /// Unknown provider names and missing credentials for a selected real
    /// provider are configuration errors and abort startup.
    pub fn from_env() -> Result<Self, EngineError> {
        let mock_mode = env_flag("MOCK_MODE");

        let groq_api_key = non_empty_env("GROQ_API_KEY");
        let openai_api_key = non_empty_env("OPENAI_API_KEY");
        let hf_api_token = non_empty_env("HF_API_TOKEN");

        let text_provider = if mock_mode {
            TextProvider::Mock
        } else {
            match env_lower("TEXT_LLM_PROVIDER", "groq").as_str() {
                "groq" => TextProvider::Groq,
                "openai" => TextProvider::OpenAi,
                "mock" => TextProvider::Mock,
                other => {
                    return Err(EngineError::Config(format!(
                        "Unknown TEXT_LLM_PROVIDER: {other}"
                    )))
                }
            }
        };

        let embedding_provider = if mock_mode || text_provider == TextProvider::Mock {
            // A mock text provider short-circuits the whole client, matching
            // the end-to-end mock contract.
            EmbeddingProvider::Mock
        } else {
            match env_lower("EMBEDDING_PROVIDER", "huggingface").as_str() {
                "huggingface" => EmbeddingProvider::HuggingFace,
                "openai" => EmbeddingProvider::OpenAi,
                "mock" => EmbeddingProvider::Mock,
                other => {
                    return Err(EngineError::Config(format!(
                        "Unknown EMBEDDING_PROVIDER: {other}"
                    )))
                }
            }
        };

        // Fail fast on missing credentials for the selected providers.
        match text_provider {
            TextProvider::Groq if groq_api_key.is_none() => {
                return Err(EngineError::Config(
                    "GROQ_API_KEY required for TEXT_LLM_PROVIDER=groq".to_string(),
                ));
            }
            TextProvider::OpenAi if openai_api_key.is_none() => {
                return Err(EngineError::Config(
                    "OPENAI_API_KEY required for TEXT_LLM_PROVIDER=openai".to_string(),
                ));
            }
            _ => {}
        }
        match embedding_provider {
            EmbeddingProvider::HuggingFace if hf_api_token.is_none() => {
                return Err(EngineError::Config(
                    "HF_API_TOKEN required for EMBEDDING_PROVIDER=huggingface".to_string(),
                ));
            }
            EmbeddingProvider::OpenAi if openai_api_key.is_none() => {
                return Err(EngineError::Config(
                    "OPENAI_API_KEY required for EMBEDDING_PROVIDER=openai".to_string(),
                ));
            }
            _ => {}
        }

        let vector_store = if mock_mode {
            VectorStoreEndpoint::InMemory
        } else if let Some(url) = non_empty_env("VECTOR_STORE_URL") {
            VectorStoreEndpoint::Remote {
                url,
                api_key: non_empty_env("VECTOR_STORE_API_KEY"),
            }
        } else {
            let host = non_empty_env("VECTOR_STORE_HOST")
                .unwrap_or_else(|| DEFAULT_VECTOR_STORE_HOST.to_string());
            let port = match non_empty_env("VECTOR_STORE_PORT") {
                Some(raw) => raw.parse::<u16>().map_err(|_| {
                    EngineError::Config(format!("Invalid VECTOR_STORE_PORT: {raw}"))
                })?,
                None => DEFAULT_VECTOR_STORE_PORT,
            };
            VectorStoreEndpoint::Local { host, port }
        };

        Ok(Self {
            text_provider,
            embedding_provider,
            mock_mode,
            llm_model: non_empty_env("LLM_MODEL"),
            vector_store,
            embedding_dim: EMBEDDING_DIM,
            request_timeout_secs: EXTERNAL_CALL_TIMEOUT_SECS,
            server_addr: non_empty_env("SEREN_SERVER_ADDR")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            groq_api_key,
            openai_api_key,
            hf_api_token,
        })
    }

    /// Fully mocked configuration for tests and offline runs.
    pub fn mock() -> Self {
        Self {
            text_provider: TextProvider::Mock,
            embedding_provider: EmbeddingProvider::Mock,
            mock_mode: true,
            llm_model: None,
            vector_store: VectorStoreEndpoint::InMemory,
            embedding_dim: EMBEDDING_DIM,
            request_timeout_secs: EXTERNAL_CALL_TIMEOUT_SECS,
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            groq_api_key: None,
            openai_api_key: None,
            hf_api_token: None,
        }
    }
}

fn env_lower(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .to_lowercase()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str) -> bool {
    matches!(
        std::env::var(key).unwrap_or_default().to_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_config_uses_in_memory_store() {
        let cfg = EngineConfig::mock();
        assert_eq!(cfg.text_provider, TextProvider::Mock);
        assert_eq!(cfg.embedding_provider, EmbeddingProvider::Mock);
        assert_eq!(cfg.vector_store, VectorStoreEndpoint::InMemory);
        assert_eq!(cfg.embedding_dim, 384);
    }

    #[test]
    fn local_endpoint_builds_base_url() {
        let ep = VectorStoreEndpoint::Local {
            host: "localhost".to_string(),
            port: 6333,
        };
        assert_eq!(ep.base_url().as_deref(), Some("http://localhost:6333"));
    }

    #[test]
    fn remote_endpoint_trims_trailing_slash() {
        let ep = VectorStoreEndpoint::Remote {
            url: "https://cluster.example.io:6333/".to_string(),
            api_key: Some("k".to_string()),
        };
        assert_eq!(
            ep.base_url().as_deref(),
            Some("https://cluster.example.io:6333")
        );
    }
}
