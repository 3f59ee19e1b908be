//! Evidence pipelines
//!
//! Two data paths share the memory-store and embedder contracts and diverge
//! above them:
//!
//! - **Narrative** ([`NarrativePipeline`]): decision snapshots extracted by
//!   the LLM, retrieved by narrative analogy. Drives the live HTTP advisory
//!   endpoints.
//! - **Phased** ([`PhasedPipeline`]): canonical time-sliced experience
//!   units, deterministically reranked and aggregated into the structured
//!   [`crate::types::SystemResponse`]. Drives the replay evaluator.
//!
//! Both implement [`EvidencePipeline`] so a caller can select per request.

mod narrative;
mod phased;

pub use narrative::{DecisionSupport, HistoricalBasis, NarrativePipeline};
pub use phased::{EvidenceEngine, PhasedPipeline};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::EngineResult;

/// Common face of the two evidence pipelines: turn one case document into
/// stored memory. The narrative path expects a raw-text string document;
/// the phased path expects a structured case object.
#[async_trait]
pub trait EvidencePipeline: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ingest one case document. Returns the number of stored points.
    async fn ingest_case(
        &self,
        case_id: &str,
        source_id: &str,
        document: &Value,
    ) -> EngineResult<usize>;
}
