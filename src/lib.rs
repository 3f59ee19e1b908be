//! SEREN: Seismic Emergency Response ENgine
//!
//! Case-based decision support for earthquake response. Given a free-text
//! description of an unfolding situation, SEREN retrieves analogous moments
//! from a corpus of historical case studies and produces a structured
//! advisory: situation summary, timeline projections, candidate
//! interventions with comparative effect, and a calibrated confidence
//! overview.
//!
//! ## Architecture
//!
//! - **Ingest**: phase-bounded time slicing with structural leakage prevention
//! - **Memory**: vector-indexed experience store behind an opaque ANN seam
//! - **Retrieval**: deterministic multi-dimensional similarity ranking
//! - **Projection**: horizon binning and cohort outcome aggregation
//! - **Reasoning**: treated-vs-untreated comparative intervention analysis
//! - **Uncertainty**: monotone confidence calibration
//! - **Output**: structured, non-prescriptive response assembly
//!
//! The system surfaces patterns from past experience. It never claims
//! causality and never predicts outcomes by model inference.

pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod ingest;
pub mod llm;
pub mod memory;
pub mod output;
pub mod pipeline;
pub mod projection;
pub mod reasoning;
pub mod retrieval;
pub mod types;
pub mod uncertainty;

// Re-export configuration
pub use config::EngineConfig;

// Re-export the error channel
pub use error::{EngineError, EngineResult};

// Re-export commonly used types
pub use types::{
    ConfidenceAssessment, DecisionSnapshot, EarthquakeSituation, ExperienceUnit,
    InterventionRecommendation, ProjectionResult, SystemResponse, TimePhase, TimeSlice,
    UncertainProperty,
};

// Re-export the pipeline faces
pub use pipeline::{EvidenceEngine, EvidencePipeline, NarrativePipeline, PhasedPipeline};

// Re-export the evaluator
pub use evaluation::RetrospectiveReplayEvaluator;
