//! Phased experience pipeline
//!
//! The deterministic core path: rerank a candidate cohort, project the
//! timeline, reason over interventions, calibrate confidence, and assemble
//! the structured response. [`EvidenceEngine`] is the pure (non-I/O)
//! composition used by both the stored pipeline and the replay evaluator;
//! [`PhasedPipeline`] adds the embedder and memory store around it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::ingest::CaseStudyIngestor;
use crate::llm::Embedder;
use crate::memory::ExperienceMemory;
use crate::output::{CohortMeta, ResponseFormatter};
use crate::projection::TimelineProjector;
use crate::reasoning::InterventionReasoner;
use crate::retrieval::{SimilarityEngine, SimilarityResult};
use crate::types::{EarthquakeSituation, ExperienceUnit, SystemResponse, TimePhase};
use crate::uncertainty::ConfidenceIntegrator;

use super::EvidencePipeline;

// ============================================================================
// Pure advisory composition
// ============================================================================

/// Stateless composition of the rerank → project → reason → calibrate →
/// format stages. Deterministic given a fixed candidate list.
#[derive(Debug, Clone, Default)]
pub struct EvidenceEngine {
    similarity: SimilarityEngine,
    projector: TimelineProjector,
    reasoner: InterventionReasoner,
    integrator: ConfidenceIntegrator,
    formatter: ResponseFormatter,
}

impl EvidenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rerank the candidates and keep the top of the cohort.
    pub fn rerank(
        &self,
        query: &EarthquakeSituation,
        candidates: &[ExperienceUnit],
        top_k: usize,
    ) -> Vec<SimilarityResult> {
        let mut ranked = self.similarity.rank(query, candidates);
        ranked.truncate(top_k);
        ranked
    }

    /// Run the full downstream pipeline over an already-selected cohort.
    pub fn advise(
        &self,
        query: &EarthquakeSituation,
        query_phase: TimePhase,
        candidates: &[ExperienceUnit],
        top_k: usize,
        patterns: Option<String>,
    ) -> SystemResponse {
        let cohort = self.rerank(query, candidates, top_k);

        let projections = self.projector.project(query_phase, &cohort);
        let recommendations = self.reasoner.recommend(query_phase, &cohort);

        let projection_conf = self.integrator.calibrate_projections(&projections);
        let interventions = self
            .integrator
            .calibrate_interventions(&recommendations, &projection_conf);

        self.formatter.format(
            query,
            &projections,
            &projection_conf,
            &interventions,
            &CohortMeta {
                cohort_size: cohort.len(),
                dominant_patterns: patterns,
                divergences: None,
            },
        )
    }
}

// ============================================================================
// Stored pipeline
// ============================================================================

/// Phased pipeline bound to the embedder and the experience memory.
pub struct PhasedPipeline {
    ingestor: CaseStudyIngestor,
    engine: EvidenceEngine,
    embedder: Arc<dyn Embedder>,
    memory: ExperienceMemory,
}

impl PhasedPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, memory: ExperienceMemory) -> Self {
        Self {
            ingestor: CaseStudyIngestor::new(),
            engine: EvidenceEngine::new(),
            embedder,
            memory,
        }
    }

    /// Embed the query situation, pull the nearest stored experiences, and
    /// run the advisory stages over them.
    pub async fn decision_advisory(
        &self,
        query: &EarthquakeSituation,
        query_phase: TimePhase,
        top_k: usize,
    ) -> EngineResult<SystemResponse> {
        let vector = self.embedder.embed(&query.situation_text()).await?;
        let candidates: Vec<ExperienceUnit> = self
            .memory
            .retrieve_candidates(&vector, top_k)
            .await?
            .into_iter()
            .map(|(unit, _)| unit)
            .collect();

        Ok(self.engine.advise(query, query_phase, &candidates, top_k, None))
    }
}

#[async_trait]
impl EvidencePipeline for PhasedPipeline {
    fn name(&self) -> &'static str {
        "phased"
    }

    async fn ingest_case(
        &self,
        case_id: &str,
        _source_id: &str,
        document: &Value,
    ) -> EngineResult<usize> {
        if !document.is_object() {
            return Err(EngineError::InvalidInput(
                "phased ingestion expects a structured case object".to_string(),
            ));
        }

        let units = self.ingestor.experience_units(document, case_id);
        for unit in &units {
            let vector = self.embedder.embed(&unit.situation.situation_text()).await?;
            self.memory.store_experience(unit, vector).await?;
        }

        info!(case_id, units = units.len(), "Stored phased experience units");
        Ok(units.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryVectorStore;
    use crate::llm::MockEmbedder;
    use serde_json::json;

    fn case(event_id: &str, magnitude: f64, casualties: i64, evacuation: Option<&str>) -> Value {
        let mut actions = json!({ "rescue": "deployed" });
        if let Some(evac) = evacuation {
            actions["evacuation"] = json!(evac);
        }
        json!({
            "identity": { "event_id": event_id, "magnitude": magnitude },
            "spatial": { "region_type": "urban" },
            "damage": { "building_collapse": "widespread" },
            "actions": actions,
            "outcomes": { "casualties": casualties }
        })
    }

    async fn pipeline() -> PhasedPipeline {
        let store = Arc::new(InMemoryVectorStore::new());
        let memory = ExperienceMemory::initialize(store, "exp_pipeline_test", 32)
            .await
            .unwrap();
        PhasedPipeline::new(Arc::new(MockEmbedder::new(32)), memory)
    }

    #[tokio::test]
    async fn ingest_stores_one_unit_per_phase() {
        let p = pipeline().await;
        let stored = p
            .ingest_case("kobe", "manual", &case("kobe", 6.9, 6434, Some("partial")))
            .await
            .unwrap();
        assert_eq!(stored, 4);
    }

    #[tokio::test]
    async fn ingest_rejects_non_object_documents() {
        let p = pipeline().await;
        let err = p
            .ingest_case("kobe", "manual", &json!("free text"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn advisory_runs_end_to_end_over_stored_memory() {
        let p = pipeline().await;
        p.ingest_case("a", "m", &case("a", 7.0, 120, Some("completed")))
            .await
            .unwrap();
        p.ingest_case("b", "m", &case("b", 7.2, 9000, None)).await.unwrap();

        let mut query = EarthquakeSituation::default();
        query.event_identity.event_id = Some("now".to_string());
        query.event_identity.phase = Some("immediate_impact".to_string());
        query.event_identity.magnitude =
            Some(crate::types::UncertainProperty::observed(7.1, "field_report"));

        let response = p
            .decision_advisory(&query, TimePhase::T0Impact, 5)
            .await
            .unwrap();

        assert_eq!(response.situation_summary.event_id, "now");
        assert_eq!(response.baseline_projections.len(), 3);
        assert!(response.evidence_context.cohort_size > 0);
    }
}
