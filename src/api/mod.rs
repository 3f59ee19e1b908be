//! REST API module using Axum
//!
//! Thin HTTP surface over the evidence pipelines:
//! - POST /api/ingest/case-study - extract, embed, and store one case
//! - POST /api/reasoning/decision-support - retrieve analogs and advise
//! - POST /api/memory/retrieve - raw snapshot retrieval
//! - GET / and /api/ - service manifest

pub mod handlers;
mod routes;

pub use handlers::ServiceState;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{
    EngineConfig, VectorStoreEndpoint, EXPERIENCE_COLLECTION, SNAPSHOT_COLLECTION,
};
use crate::error::{EngineError, EngineResult};
use crate::llm::build_providers;
use crate::memory::{ExperienceMemory, InMemoryVectorStore, QdrantStore, SnapshotMemory, VectorStore};
use crate::pipeline::{NarrativePipeline, PhasedPipeline};

/// Create the complete application router.
pub fn create_app(state: ServiceState) -> Router {
    // CORS is permissive: the engine fronts an internal dashboard.
    routes::api_routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Wire providers, store, memories, and both pipelines from configuration.
pub async fn build_service_state(config: &EngineConfig) -> EngineResult<ServiceState> {
    let (text, embedder) = build_providers(config)?;

    let store: Arc<dyn VectorStore> = match &config.vector_store {
        VectorStoreEndpoint::InMemory => Arc::new(InMemoryVectorStore::new()),
        endpoint => Arc::new(QdrantStore::connect(endpoint, config.request_timeout_secs)?),
    };

    let snapshot_memory =
        SnapshotMemory::initialize(store.clone(), SNAPSHOT_COLLECTION, config.embedding_dim)
            .await?;
    let experience_memory =
        ExperienceMemory::initialize(store, EXPERIENCE_COLLECTION, config.embedding_dim).await?;

    Ok(ServiceState {
        narrative: Arc::new(NarrativePipeline::new(
            text,
            embedder.clone(),
            snapshot_memory,
        )),
        phased: Arc::new(PhasedPipeline::new(embedder, experience_memory)),
    })
}

/// Map the engine taxonomy onto HTTP statuses.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match &self {
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::Transient(_) | EngineError::Protocol(_) => StatusCode::BAD_GATEWAY,
            EngineError::Config(_) | EngineError::DataShape(_) | EngineError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_input_maps_to_400_with_error_envelope() {
        let resp = EngineError::InvalidInput("Missing current_narrative".to_string())
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["status"], "error");
        assert!(v["message"].as_str().unwrap().contains("Missing current_narrative"));
    }

    #[tokio::test]
    async fn transient_failures_map_to_502() {
        let resp = EngineError::Transient("store unreachable".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
