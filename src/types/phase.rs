//! Time phases, time slices, and experience units

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EarthquakeSituation, Outcomes};

// ============================================================================
// Time phases
// ============================================================================

/// Ordered phase of an earthquake event.
///
/// The ordering is load-bearing: ingestion emits slices in phase order and the
/// timeline projector bins candidates by their offset from the query phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimePhase {
    #[serde(rename = "T0_IMPACT")]
    T0Impact,
    #[serde(rename = "T1_EARLY_RESPONSE")]
    T1EarlyResponse,
    #[serde(rename = "T2_STABILIZATION")]
    T2Stabilization,
    #[serde(rename = "T3_OUTCOME")]
    T3Outcome,
}

impl TimePhase {
    pub const ALL: [TimePhase; 4] = [
        TimePhase::T0Impact,
        TimePhase::T1EarlyResponse,
        TimePhase::T2Stabilization,
        TimePhase::T3Outcome,
    ];

    /// Canonical wire name, identical to the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            TimePhase::T0Impact => "T0_IMPACT",
            TimePhase::T1EarlyResponse => "T1_EARLY_RESPONSE",
            TimePhase::T2Stabilization => "T2_STABILIZATION",
            TimePhase::T3Outcome => "T3_OUTCOME",
        }
    }

    /// Representative hours since the event for this phase.
    pub fn anchor_hours(self) -> f64 {
        match self {
            TimePhase::T0Impact => 0.0,
            TimePhase::T1EarlyResponse => 12.0,
            TimePhase::T2Stabilization => 24.0,
            TimePhase::T3Outcome => 72.0,
        }
    }

    /// Free-text phase label written into the situation's event identity.
    pub fn situation_label(self) -> &'static str {
        match self {
            TimePhase::T0Impact => "immediate_impact",
            TimePhase::T1EarlyResponse => "early_response",
            TimePhase::T2Stabilization => "stabilization",
            TimePhase::T3Outcome => "outcome",
        }
    }

    /// Human-readable window label attached to emitted time slices.
    pub fn relative_time_label(self) -> &'static str {
        match self {
            TimePhase::T0Impact => "0-6 hours",
            TimePhase::T1EarlyResponse => "12-24 hours",
            TimePhase::T2Stabilization => "24-48 hours",
            TimePhase::T3Outcome => "post-event",
        }
    }
}

impl std::fmt::Display for TimePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Time slices
// ============================================================================

/// A specific time-window of the earthquake event: one phase-bounded view
/// of the situation, produced by the ingestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlice {
    pub phase: TimePhase,
    pub situation: EarthquakeSituation,
    pub relative_time_label: String,
}

// ============================================================================
// Experience units
// ============================================================================

/// A single atomic unit of earthquake experience: "when the situation looked
/// like X at phase P, this is what happened afterwards".
///
/// Immutable by design; the unit exclusively owns its situation. The
/// `subsequent_outcomes` field holds ground truth observed *after* the
/// situation state and is only populated for stored memory, never for a
/// query-side slice at T0/T1/T2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceUnit {
    pub situation: EarthquakeSituation,
    pub phase: TimePhase,
    pub source_case_id: String,
    #[serde(default)]
    pub subsequent_outcomes: Option<Outcomes>,
}

impl ExperienceUnit {
    /// Build a unit from an ingested time slice.
    pub fn from_slice(slice: TimeSlice, source_case_id: &str, outcomes: Option<Outcomes>) -> Self {
        Self {
            situation: slice.situation,
            phase: slice.phase,
            source_case_id: source_case_id.to_string(),
            subsequent_outcomes: outcomes,
        }
    }

    /// Deterministic point id: the same case and phase always map to the
    /// same id, making store upserts idempotent.
    pub fn point_id(&self) -> Uuid {
        let name = format!("{}_{}", self.source_case_id, self.phase.as_str());
        Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
    }
}
