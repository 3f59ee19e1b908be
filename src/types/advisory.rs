//! Advisory types: Horizon, ProjectionResult, InterventionRecommendation,
//! ConfidenceAssessment, SystemResponse

use serde::{Deserialize, Serialize};

// ============================================================================
// Horizons
// ============================================================================

/// Fixed forward window for baseline projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "0-12h")]
    H0To12,
    #[serde(rename = "12-24h")]
    H12To24,
    #[serde(rename = "24-48h")]
    H24To48,
}

impl Horizon {
    /// Chronological order, also the presentation order.
    pub const ALL: [Horizon; 3] = [Horizon::H0To12, Horizon::H12To24, Horizon::H24To48];

    pub fn label(self) -> &'static str {
        match self {
            Horizon::H0To12 => "0-12h",
            Horizon::H12To24 => "12-24h",
            Horizon::H24To48 => "24-48h",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Timeline projection
// ============================================================================

/// Projected state for a specific time horizon, aggregated from the cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub horizon: Horizon,

    // Human impact
    /// "increasing", "stabilizing", "uncertain", or "unknown" for an empty bin.
    pub casualty_trend: String,
    /// e.g. "100 - 500"
    pub casualty_range: String,
    pub injury_range: String,

    // Infrastructure impact
    pub collapse_progression: String,
    pub access_disruption: String,
    pub utility_degradation: String,

    // Secondary risks
    pub secondary_risks: Vec<String>,

    // Meta
    pub confidence_score: f64,
    pub supporting_experience_count: usize,
}

impl ProjectionResult {
    /// Empty projection for a horizon with no supporting experiences.
    pub fn empty(horizon: Horizon) -> Self {
        Self {
            horizon,
            casualty_trend: "unknown".to_string(),
            casualty_range: "unknown".to_string(),
            injury_range: "unknown".to_string(),
            collapse_progression: "unknown".to_string(),
            access_disruption: "unknown".to_string(),
            utility_degradation: "unknown".to_string(),
            secondary_risks: Vec::new(),
            confidence_score: 0.0,
            supporting_experience_count: 0,
        }
    }
}

// ============================================================================
// Intervention reasoning
// ============================================================================

/// Proposed intervention based on historical evidence.
///
/// The effect text is strictly comparative ("associated with"); the reasoner
/// never emits causal claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRecommendation {
    pub action_name: String,
    /// e.g. "0-12h"
    pub suggested_time_window: String,
    /// e.g. "Associated with 20% lower casualties in similar cases (10 vs 100)"
    pub comparative_effect: String,
    pub confidence_score: f64,
    pub supporting_experience_count: usize,
    pub notes: String,
}

// ============================================================================
// Calibrated confidence
// ============================================================================

/// Calibrated confidence metadata attached to projections and interventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    /// 0.0 - 1.0, rounded to two decimals.
    pub score: f64,
    /// "Low", "Medium", "High"
    pub label: String,
    pub explanation: String,
    /// Specific factors, e.g. "Sparse data (<3 cases)".
    pub drivers: Vec<String>,
}

/// Label band shared by every calibration site.
pub fn confidence_label(score: f64) -> &'static str {
    if score >= 0.8 {
        "High"
    } else if score >= 0.5 {
        "Medium"
    } else {
        "Low"
    }
}

// ============================================================================
// Structured system response
// ============================================================================

/// What is known and what is explicitly unknown about the query situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationSummary {
    pub event_id: String,
    pub phase: String,
    pub known_facts: Vec<String>,
    pub explicit_unknowns: Vec<String>,
}

/// One baseline projection rendered for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedProjection {
    pub horizon: String,
    pub trend: String,
    pub range_desc: String,
    pub confidence_label: String,
    pub confidence_score: f64,
}

/// One intervention option rendered for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedIntervention {
    pub action: String,
    pub window: String,
    pub effect_desc: String,
    pub confidence_label: String,
    pub confidence_score: f64,
    pub evidence_count: usize,
}

/// Provenance of the evidence behind the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceContext {
    pub cohort_size: usize,
    pub dominant_patterns: String,
    pub divergences: String,
}

/// System-level confidence rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceOverview {
    /// "High", "Medium", "Low"
    pub overall_level: String,
    pub drivers: Vec<String>,
    pub risks_gaps: Vec<String>,
}

/// Final structured output contract of the evidence pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemResponse {
    pub situation_summary: SituationSummary,
    pub baseline_projections: Vec<FormattedProjection>,
    pub intervention_options: Vec<FormattedIntervention>,
    pub evidence_context: EvidenceContext,
    pub confidence_overview: ConfidenceOverview,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_labels_are_chronological() {
        let labels: Vec<&str> = Horizon::ALL.iter().map(|h| h.label()).collect();
        assert_eq!(labels, vec!["0-12h", "12-24h", "24-48h"]);
    }

    #[test]
    fn horizon_serializes_as_label() {
        let json = serde_json::to_string(&Horizon::H12To24).unwrap();
        assert_eq!(json, "\"12-24h\"");
    }

    #[test]
    fn confidence_label_bands() {
        assert_eq!(confidence_label(0.85), "High");
        assert_eq!(confidence_label(0.8), "High");
        assert_eq!(confidence_label(0.79), "Medium");
        assert_eq!(confidence_label(0.5), "Medium");
        assert_eq!(confidence_label(0.49), "Low");
        assert_eq!(confidence_label(0.0), "Low");
    }

    #[test]
    fn empty_projection_has_zero_confidence() {
        let proj = ProjectionResult::empty(Horizon::H0To12);
        assert_eq!(proj.confidence_score, 0.0);
        assert_eq!(proj.casualty_trend, "unknown");
        assert_eq!(proj.supporting_experience_count, 0);
    }
}
