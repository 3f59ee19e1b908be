//! HTTP-backed provider clients
//!
//! All providers go through reqwest with a per-call timeout from
//! configuration. Failures map onto the engine taxonomy: network and status
//! errors are transient, unparseable bodies are protocol errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::{
    EngineConfig, GROQ_DEFAULT_MODEL, HF_EMBEDDING_URL, OPENAI_DEFAULT_MODEL,
    OPENAI_EMBEDDING_MODEL,
};
use crate::error::{EngineError, EngineResult};

use super::{Embedder, TextGenerator};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

fn http_client(config: &EngineConfig) -> EngineResult<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| EngineError::Config(format!("http client: {e}")))
}

// ============================================================================
// Chat completion response shape (OpenAI-compatible, also used by Groq)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

async fn chat_completion(
    http: &Client,
    url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
    system_prompt: &str,
) -> EngineResult<String> {
    let resp = http
        .post(url)
        .bearer_auth(api_key)
        .json(&json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": prompt }
            ]
        }))
        .send()
        .await
        .map_err(|e| EngineError::transient("chat completion", e))?;

    if !resp.status().is_success() {
        return Err(EngineError::Transient(format!(
            "chat completion returned {}",
            resp.status()
        )));
    }

    let parsed: ChatResponse = resp
        .json()
        .await
        .map_err(|e| EngineError::Protocol(format!("chat response: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.trim().to_string())
        .ok_or_else(|| EngineError::Protocol("chat response had no choices".to_string()))
}

// ============================================================================
// Groq (text)
// ============================================================================

/// Groq chat client (OpenAI-compatible wire format).
pub struct GroqClient {
    http: Client,
    api_key: String,
    model: String,
}

impl GroqClient {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let api_key = config
            .groq_api_key
            .clone()
            .ok_or_else(|| EngineError::Config("GROQ_API_KEY missing".to_string()))?;
        Ok(Self {
            http: http_client(config)?,
            api_key,
            model: config
                .llm_model
                .clone()
                .unwrap_or_else(|| GROQ_DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for GroqClient {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> EngineResult<String> {
        chat_completion(
            &self.http,
            GROQ_CHAT_URL,
            &self.api_key,
            &self.model,
            prompt,
            system_prompt,
        )
        .await
    }
}

// ============================================================================
// OpenAI (text)
// ============================================================================

pub struct OpenAiTextClient {
    http: Client,
    api_key: String,
    model: String,
}

impl OpenAiTextClient {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| EngineError::Config("OPENAI_API_KEY missing".to_string()))?;
        Ok(Self {
            http: http_client(config)?,
            api_key,
            model: config
                .llm_model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextClient {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> EngineResult<String> {
        chat_completion(
            &self.http,
            OPENAI_CHAT_URL,
            &self.api_key,
            &self.model,
            prompt,
            system_prompt,
        )
        .await
    }
}

// ============================================================================
// Hugging Face (embeddings)
// ============================================================================

/// Hugging Face inference endpoint for BAAI/bge-small-en-v1.5 (384-dim).
pub struct HfEmbeddingClient {
    http: Client,
    api_token: String,
    dim: usize,
}

impl HfEmbeddingClient {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let api_token = config
            .hf_api_token
            .clone()
            .ok_or_else(|| EngineError::Config("HF_API_TOKEN missing".to_string()))?;
        Ok(Self {
            http: http_client(config)?,
            api_token,
            dim: config.embedding_dim,
        })
    }
}

/// The endpoint returns either a flat vector or a single-row matrix
/// depending on the pipeline; accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HfEmbeddingResponse {
    Flat(Vec<f32>),
    Nested(Vec<Vec<f32>>),
}

#[async_trait]
impl Embedder for HfEmbeddingClient {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let resp = self
            .http
            .post(HF_EMBEDDING_URL)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| EngineError::transient("embedding request", e))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transient(format!(
                "embedding request returned {}",
                resp.status()
            )));
        }

        let parsed: HfEmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("embedding response: {e}")))?;

        let vector = match parsed {
            HfEmbeddingResponse::Flat(v) => v,
            HfEmbeddingResponse::Nested(rows) => rows
                .into_iter()
                .next()
                .ok_or_else(|| EngineError::Protocol("empty embedding matrix".to_string()))?,
        };

        if vector.len() != self.dim {
            return Err(EngineError::Protocol(format!(
                "embedding dimension {} does not match expected {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(vector)
    }
}

// ============================================================================
// OpenAI (embeddings)
// ============================================================================

pub struct OpenAiEmbeddingClient {
    http: Client,
    api_key: String,
    dim: usize,
}

impl OpenAiEmbeddingClient {
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or_else(|| EngineError::Config("OPENAI_API_KEY missing".to_string()))?;
        Ok(Self {
            http: http_client(config)?,
            api_key,
            dim: config.embedding_dim,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingRow {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OpenAiEmbeddingClient {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let resp = self
            .http
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "input": text,
                "model": OPENAI_EMBEDDING_MODEL,
                "dimensions": self.dim,
            }))
            .send()
            .await
            .map_err(|e| EngineError::transient("embedding request", e))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transient(format!(
                "embedding request returned {}",
                resp.status()
            )));
        }

        let parsed: OpenAiEmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("embedding response: {e}")))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| EngineError::Protocol("embedding response had no rows".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hf_response_accepts_flat_and_nested_shapes() {
        let flat: HfEmbeddingResponse = serde_json::from_str("[0.1, 0.2]").unwrap();
        assert!(matches!(flat, HfEmbeddingResponse::Flat(v) if v.len() == 2));

        let nested: HfEmbeddingResponse = serde_json::from_str("[[0.1, 0.2, 0.3]]").unwrap();
        assert!(matches!(nested, HfEmbeddingResponse::Nested(rows) if rows[0].len() == 3));
    }

    #[test]
    fn chat_response_extracts_first_choice() {
        let raw = r#"{"choices": [{"message": {"role": "assistant", "content": "analysis"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "analysis");
    }
}
