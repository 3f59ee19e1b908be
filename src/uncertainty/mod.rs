//! Uncertainty propagation and confidence calibration
//!
//! Central choke point for confidence: raw per-stage scores come in, a
//! calibrated assessment with label, explanation, and drivers comes out.
//! Confidence never increases downstream: intervention confidence is
//! ceilinged by the best baseline projection.

use std::collections::BTreeMap;

use crate::types::{
    confidence_label, ConfidenceAssessment, Horizon, InterventionRecommendation, ProjectionResult,
};

/// Support below this is sparse and caps projection confidence.
const SPARSE_SUPPORT_COUNT: usize = 3;
const SPARSE_CONFIDENCE_CAP: f64 = 0.6;

/// Raw scores below this read as weak similarity.
const WEAK_MATCH_THRESHOLD: f64 = 0.4;

/// Discount for a consensus traced to a single data point.
const SINGLE_SOURCE_FACTOR: f64 = 0.8;

/// Interventions backed by fewer than this many treated cases.
const LOW_ACTION_SUPPORT: usize = 2;
const LOW_ACTION_SUPPORT_CAP: f64 = 0.4;

/// Calibrates raw pipeline scores into bounded, explained assessments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceIntegrator;

impl ConfidenceIntegrator {
    pub fn new() -> Self {
        Self
    }

    /// Calibrate confidence for the baseline timeline projections.
    pub fn calibrate_projections(
        &self,
        projections: &BTreeMap<Horizon, ProjectionResult>,
    ) -> BTreeMap<Horizon, ConfidenceAssessment> {
        projections
            .iter()
            .map(|(&horizon, proj)| (horizon, assess_projection(proj)))
            .collect()
    }

    /// Calibrate confidence for interventions, strictly capped by the best
    /// baseline assessment.
    pub fn calibrate_interventions(
        &self,
        recommendations: &[InterventionRecommendation],
        baseline: &BTreeMap<Horizon, ConfidenceAssessment>,
    ) -> Vec<(InterventionRecommendation, ConfidenceAssessment)> {
        recommendations
            .iter()
            .map(|rec| (rec.clone(), assess_intervention(rec, baseline)))
            .collect()
    }
}

fn assess_projection(proj: &ProjectionResult) -> ConfidenceAssessment {
    let mut raw = proj.confidence_score;
    let mut drivers = Vec::new();

    // Data density: the raw score already discounts density, the cap makes
    // the sparse case explicit.
    if proj.supporting_experience_count < SPARSE_SUPPORT_COUNT {
        drivers.push("Sparse data (<3 cases)".to_string());
        raw = raw.min(SPARSE_CONFIDENCE_CAP);
    }

    if raw < WEAK_MATCH_THRESHOLD {
        drivers.push("Weak similarity matches".to_string());
    }

    // A degenerate range with near-zero support means one case is posing
    // as a consensus.
    if degenerate_range(&proj.casualty_range)
        && proj.supporting_experience_count < LOW_ACTION_SUPPORT
    {
        drivers.push("Single data point source".to_string());
        raw *= SINGLE_SOURCE_FACTOR;
    }

    let label = confidence_label(raw);
    let explanation = format!(
        "Confidence is {label} ({raw:.2}). Driven by: {}.",
        if drivers.is_empty() {
            "adequate evidence".to_string()
        } else {
            drivers.join(", ")
        }
    );

    ConfidenceAssessment {
        score: round2(raw),
        label: label.to_string(),
        explanation,
        drivers,
    }
}

fn assess_intervention(
    rec: &InterventionRecommendation,
    baseline: &BTreeMap<Horizon, ConfidenceAssessment>,
) -> ConfidenceAssessment {
    let mut raw = rec.confidence_score;
    let mut drivers = Vec::new();

    // The intervention signal can never be more trustworthy than the
    // projection evidence it rides on.
    let ceiling = if baseline.is_empty() {
        drivers.push("No baseline projection".to_string());
        0.0
    } else {
        baseline.values().map(|a| a.score).fold(0.0, f64::max)
    };

    if raw > ceiling {
        raw = ceiling;
        drivers.push("Capped by baseline uncertainty".to_string());
    }

    if rec.supporting_experience_count < LOW_ACTION_SUPPORT {
        drivers.push("Very low support for action".to_string());
        raw = raw.min(LOW_ACTION_SUPPORT_CAP);
    }

    let label = confidence_label(raw);
    let explanation = format!("Confidence is {label} ({raw:.2}). {}.", drivers.join("; "));

    ConfidenceAssessment {
        score: round2(raw),
        label: label.to_string(),
        explanation,
        drivers,
    }
}

/// "500 - 500": both endpoints equal.
fn degenerate_range(range: &str) -> bool {
    if range == "unknown" {
        return false;
    }
    match range.split_once('-') {
        Some((lo, hi)) => lo.trim() == hi.trim(),
        None => false,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
