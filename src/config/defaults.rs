//! System-wide default constants.
//!
//! Centralises the fixed parameters of the evidence pipeline. Grouped by
//! subsystem for easy discovery.

// ============================================================================
// Embedding
// ============================================================================

/// Embedding vector dimension (BAAI/bge-small-en-v1.5).
pub const EMBEDDING_DIM: usize = 384;

/// Hugging Face inference endpoint for the default embedding model.
pub const HF_EMBEDDING_URL: &str =
    "https://router.huggingface.co/hf-inference/models/BAAI/bge-small-en-v1.5";

/// OpenAI embedding model.
pub const OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-small";

// ============================================================================
// Text LLM
// ============================================================================

/// Default Groq chat model.
pub const GROQ_DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default OpenAI chat model.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Characters of raw case text handed to the extraction prompt.
pub const EXTRACTION_TEXT_LIMIT: usize = 4_000;

// ============================================================================
// Memory store
// ============================================================================

/// Collection holding phased experience units.
pub const EXPERIENCE_COLLECTION: &str = "earthquake_experiences";

/// Collection holding narrative decision snapshots.
pub const SNAPSHOT_COLLECTION: &str = "decision_snapshots";

/// Default local vector store endpoint.
pub const DEFAULT_VECTOR_STORE_HOST: &str = "localhost";
pub const DEFAULT_VECTOR_STORE_PORT: u16 = 6333;

// ============================================================================
// Retrieval
// ============================================================================

/// Default cohort size for retrieval and reranking.
pub const DEFAULT_TOP_K: usize = 5;

// ============================================================================
// External calls
// ============================================================================

/// HTTP timeout for embedder, LLM, and vector store calls (seconds).
pub const EXTERNAL_CALL_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:8080";
