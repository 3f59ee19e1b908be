//! Error taxonomy for the decision-support engine
//!
//! Core functions report failure through [`EngineError`]; the API layer maps
//! variants to HTTP status codes. Only two recovery points swallow errors by
//! design: malformed snapshot JSON from the LLM (returns an empty list) and a
//! malformed stored payload (the candidate is skipped). Both log diagnostics.

use thiserror::Error;

/// Typed failure channel for every core component.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Missing or invalid provider/credentials at startup. Fatal: the
    /// process refuses to start.
    #[error("configuration error: {0}")]
    Config(String),

    /// Embedder / LLM / vector store network or rate-limit failure.
    /// Surfaced as 5xx; the caller may retry. The core never retries.
    #[error("external service failure: {0}")]
    Transient(String),

    /// Structurally invalid response from an external service.
    #[error("external protocol error: {0}")]
    Protocol(String),

    /// Missing or invalid request fields. Surfaced as 400.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A stored payload is missing mandatory keys. The candidate is
    /// skipped; retrieval continues.
    #[error("malformed stored payload: {0}")]
    DataShape(String),

    /// Programmer error. Fails the request, never the process.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Transient failure from a reqwest call, preserving the upstream detail.
    pub fn transient(context: &str, err: impl std::fmt::Display) -> Self {
        EngineError::Transient(format!("{context}: {err}"))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_variant_context() {
        let err = EngineError::InvalidInput("Missing current_narrative".to_string());
        assert_eq!(err.to_string(), "invalid input: Missing current_narrative");

        let err = EngineError::transient("embedding request", "timed out");
        assert!(err.to_string().contains("embedding request: timed out"));
    }
}
