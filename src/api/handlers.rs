//! HTTP handlers for the decision-support endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::DEFAULT_TOP_K;
use crate::error::EngineError;
use crate::pipeline::{DecisionSupport, EvidencePipeline, NarrativePipeline, PhasedPipeline};

/// Shared handler state: both evidence pipelines, selected per request.
#[derive(Clone)]
pub struct ServiceState {
    pub narrative: Arc<NarrativePipeline>,
    pub phased: Arc<PhasedPipeline>,
}

// ============================================================================
// Service manifest
// ============================================================================

/// GET / and GET /api/ - service manifest
pub async fn get_manifest() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "SEREN Decision Support Engine",
        "endpoints": [
            "/api/ingest/case-study [POST]",
            "/api/reasoning/decision-support [POST]",
            "/api/memory/retrieve [POST]"
        ]
    }))
}

// ============================================================================
// Ingestion
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    case_study_id: Option<String>,
    case_id: Option<String>,
    raw_text: Option<String>,
    text: Option<String>,
    source_id: Option<String>,
    /// Structured case object; routes to the phased pipeline instead of
    /// narrative snapshot extraction.
    case: Option<Value>,
}

/// POST /api/ingest/case-study
pub async fn ingest_case_study(
    State(state): State<ServiceState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<Value>, EngineError> {
    let case_id = req.case_study_id.or(req.case_id).ok_or_else(|| {
        EngineError::InvalidInput("Missing required fields: raw_text, case_study_id".to_string())
    })?;
    let source_id = req.source_id.unwrap_or_else(|| "manual_input".to_string());

    // Per-request pipeline selection: a structured case object goes through
    // the phased path, raw text through narrative extraction.
    let (pipeline, document): (&dyn EvidencePipeline, Value) = match (req.case, req.raw_text.or(req.text)) {
        (Some(case), _) => (state.phased.as_ref(), case),
        (None, Some(raw_text)) => (state.narrative.as_ref(), Value::String(raw_text)),
        (None, None) => {
            return Err(EngineError::InvalidInput(
                "Missing required fields: raw_text, case_study_id".to_string(),
            ))
        }
    };

    let stored = pipeline.ingest_case(&case_id, &source_id, &document).await?;
    info!(case_id, pipeline = pipeline.name(), stored, "Case ingested");

    Ok(Json(json!({
        "status": "success",
        "snapshots_created": stored
    })))
}

// ============================================================================
// Decision support
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DecisionSupportRequest {
    current_narrative: Option<String>,
    narrative: Option<String>,
}

/// POST /api/reasoning/decision-support
pub async fn decision_support(
    State(state): State<ServiceState>,
    Json(req): Json<DecisionSupportRequest>,
) -> Result<Json<DecisionSupport>, EngineError> {
    let narrative = req
        .current_narrative
        .or(req.narrative)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| EngineError::InvalidInput("Missing current_narrative".to_string()))?;

    let support = state.narrative.decision_support(&narrative).await?;
    Ok(Json(support))
}

// ============================================================================
// Raw retrieval
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    query_text: Option<String>,
    query: Option<String>,
    top_k: Option<usize>,
}

/// POST /api/memory/retrieve - snapshots augmented with similarity scores
pub async fn memory_retrieve(
    State(state): State<ServiceState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<Value>, EngineError> {
    let Some(query) = req.query_text.or(req.query).filter(|q| !q.trim().is_empty()) else {
        return Ok(Json(json!([])));
    };
    let top_k = req.top_k.unwrap_or(DEFAULT_TOP_K);

    let results = state.narrative.retrieve(&query, top_k).await?;

    let mut items = Vec::with_capacity(results.len());
    for (snap, score) in results {
        let mut item = serde_json::to_value(&snap)
            .map_err(|e| EngineError::Internal(format!("snapshot serialization: {e}")))?;
        item["similarity_score"] = json!(score);
        items.push(item);
    }
    Ok(Json(Value::Array(items)))
}
