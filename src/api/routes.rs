//! API route definitions
//!
//! Organizes endpoints for the decision-support service:
//! - / and /api/ - service manifest
//! - /api/ingest/case-study - case ingestion
//! - /api/reasoning/decision-support - advisory generation
//! - /api/memory/retrieve - raw snapshot retrieval

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ServiceState};

/// Create all routes for the decision-support API.
pub fn api_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(handlers::get_manifest))
        .route("/api/", get(handlers::get_manifest))
        .route("/api/ingest/case-study", post(handlers::ingest_case_study))
        .route(
            "/api/reasoning/decision-support",
            post(handlers::decision_support),
        )
        .route("/api/memory/retrieve", post(handlers::memory_retrieve))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_service_state;
    use crate::config::EngineConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn test_app() -> Router {
        let state = build_service_state(&EngineConfig::mock()).await.unwrap();
        api_routes(state)
    }

    #[tokio::test]
    async fn manifest_is_served_at_root_and_api() {
        for uri in ["/", "/api/"] {
            let app = test_app().await;
            let resp = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");

            let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(v["status"], "ok");
            assert!(v["endpoints"].is_array());
        }
    }

    #[tokio::test]
    async fn ingest_requires_case_id_and_text() {
        let app = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ingest/case-study")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"raw_text": "only text"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["status"], "error");
    }
}
