//! Remote vector store client (Qdrant REST protocol)
//!
//! Thin reqwest wrapper over the collection and point endpoints. Network and
//! rate-limit failures surface as transient errors; structurally invalid
//! responses as protocol errors. The core performs no retries.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::VectorStoreEndpoint;
use crate::error::{EngineError, EngineResult};

use super::{Point, ScoredPoint, VectorStore};

/// REST client for a remote cosine-distance vector store.
#[derive(Debug)]
pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl QdrantStore {
    /// Connect to the endpoint described by the configuration.
    pub fn connect(endpoint: &VectorStoreEndpoint, timeout_secs: u64) -> EngineResult<Self> {
        let base_url = endpoint.base_url().ok_or_else(|| {
            EngineError::Config("remote vector store requested without an endpoint".to_string())
        })?;
        let api_key = match endpoint {
            VectorStoreEndpoint::Remote { api_key, .. } => api_key.clone(),
            _ => None,
        };

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("http client: {e}")))?;

        info!(url = %base_url, "Vector store client configured");
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, format!("{}{path}", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }
        req
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f64,
    #[serde(default)]
    payload: Option<serde_json::Value>,
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, collection: &str, dim: usize) -> EngineResult<()> {
        if self.collection_exists(collection).await? {
            return Ok(());
        }
        info!(collection, dim, "Creating vector store collection");
        let resp = self
            .request(reqwest::Method::PUT, &format!("/collections/{collection}"))
            .json(&json!({
                "vectors": { "size": dim, "distance": "Cosine" }
            }))
            .send()
            .await
            .map_err(|e| EngineError::transient("create collection", e))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transient(format!(
                "create collection '{collection}' returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> EngineResult<bool> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/collections/{collection}"))
            .send()
            .await
            .map_err(|e| EngineError::transient("collection lookup", e))?;

        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            s => Err(EngineError::Transient(format!(
                "collection lookup returned {s}"
            ))),
        }
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()> {
        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({
                    "id": p.id.to_string(),
                    "vector": p.vector,
                    "payload": p.payload,
                }))
                .collect::<Vec<_>>()
        });

        let resp = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::transient("point upsert", e))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transient(format!(
                "point upsert returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> EngineResult<Vec<ScoredPoint>> {
        let resp = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/search"),
            )
            .json(&json!({
                "vector": vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await
            .map_err(|e| EngineError::transient("point search", e))?;

        if !resp.status().is_success() {
            return Err(EngineError::Transient(format!(
                "point search returned {}",
                resp.status()
            )));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::Protocol(format!("search response: {e}")))?;

        Ok(parsed
            .result
            .into_iter()
            .filter_map(|hit| {
                hit.payload.map(|payload| ScoredPoint {
                    payload,
                    score: hit.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_in_memory_endpoint() {
        let err = QdrantStore::connect(&VectorStoreEndpoint::InMemory, 5).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn search_response_tolerates_missing_payloads() {
        let raw = r#"{"result": [
            {"score": 0.9, "payload": {"k": 1}},
            {"score": 0.5}
        ]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.result.len(), 2);
        assert!(parsed.result[1].payload.is_none());
    }
}
