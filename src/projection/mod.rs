//! Baseline timeline projection
//!
//! Bins the retrieved cohort into fixed forward horizons by the offset of
//! each candidate's phase from the query phase, then aggregates outcomes per
//! horizon. Projections are descriptive aggregates of past cases, never
//! model inference.

use std::collections::{BTreeMap, BTreeSet};

use crate::retrieval::SimilarityResult;
use crate::types::{Horizon, ProjectionResult, TimePhase};

/// Casualty ceiling above which the aggregate trend reads "increasing".
const INCREASING_CASUALTY_THRESHOLD: i64 = 100;

/// Horizon support at which density no longer discounts confidence.
const FULL_SUPPORT_COUNT: f64 = 3.0;

/// Projects the baseline timeline from similar past experiences.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineProjector;

impl TimelineProjector {
    pub fn new() -> Self {
        Self
    }

    /// Bin the cohort into horizons relative to the query phase and
    /// aggregate each bin. Every horizon is present in the output; empty
    /// bins project as unknown with zero confidence.
    pub fn project(
        &self,
        query_phase: TimePhase,
        cohort: &[SimilarityResult],
    ) -> BTreeMap<Horizon, ProjectionResult> {
        let mut bins: BTreeMap<Horizon, Vec<&SimilarityResult>> =
            Horizon::ALL.iter().map(|&h| (h, Vec::new())).collect();

        for res in cohort {
            if let Some(horizon) = bin_for(query_phase, res.experience_unit.phase) {
                if let Some(group) = bins.get_mut(&horizon) {
                    group.push(res);
                }
            }
        }

        bins.into_iter()
            .map(|(horizon, group)| (horizon, aggregate_horizon(horizon, &group)))
            .collect()
    }
}

/// Forward-looking horizon assignment.
///
/// A T3 candidate counts toward 24-48h for early queries: it carries
/// final-outcome information. Candidates at or before the query phase's past
/// (and all candidates for late-phase queries) are not binned.
fn bin_for(query: TimePhase, candidate: TimePhase) -> Option<Horizon> {
    use TimePhase::*;
    match (query, candidate) {
        (T0Impact, T0Impact) => Some(Horizon::H0To12),
        (T0Impact, T1EarlyResponse) => Some(Horizon::H12To24),
        (T0Impact, T2Stabilization | T3Outcome) => Some(Horizon::H24To48),
        (T1EarlyResponse, T1EarlyResponse) => Some(Horizon::H12To24),
        (T1EarlyResponse, T2Stabilization | T3Outcome) => Some(Horizon::H24To48),
        _ => None,
    }
}

fn aggregate_horizon(horizon: Horizon, group: &[&SimilarityResult]) -> ProjectionResult {
    if group.is_empty() {
        return ProjectionResult::empty(horizon);
    }

    let mut collapse_vals: Vec<&str> = Vec::new();
    let mut access_vals: Vec<&str> = Vec::new();
    let mut risks: BTreeSet<&str> = BTreeSet::new();
    let mut casualty_vals: Vec<i64> = Vec::new();
    let mut injury_vals: Vec<i64> = Vec::new();
    let mut total_weight = 0.0;

    for res in group {
        total_weight += res.score;
        let sit = &res.experience_unit.situation;

        if let Some(v) = sit
            .damage_indicators
            .building_collapse_severity
            .as_ref()
            .and_then(|p| p.value.as_deref())
        {
            collapse_vals.push(v);
        }
        if let Some(v) = sit
            .damage_indicators
            .access_disruption
            .as_ref()
            .and_then(|p| p.value.as_deref())
        {
            access_vals.push(v);
        }

        for hazard in &sit.spatial_context.secondary_hazards {
            if let Some(v) = hazard.value.as_deref() {
                risks.insert(v);
            }
        }
        for hazard in &sit.damage_indicators.visible_hazards {
            if let Some(v) = hazard.value.as_deref() {
                risks.insert(v);
            }
        }

        // Ground truth comes from the unit's subsequent outcomes; missing
        // attributes simply do not contribute.
        if let Some(out) = &res.experience_unit.subsequent_outcomes {
            if let Some(c) = out.casualties.as_ref().and_then(|p| p.value) {
                casualty_vals.push(c);
            }
            if let Some(i) = out.injuries.as_ref().and_then(|p| p.value) {
                injury_vals.push(i);
            }
        }
    }

    let (casualty_range, casualty_trend) = range_and_trend(&casualty_vals);
    let injury_range = match (injury_vals.iter().min(), injury_vals.iter().max()) {
        (Some(min), Some(max)) => format!("{min} - {max}"),
        _ => "unknown".to_string(),
    };

    let avg_similarity = total_weight / group.len() as f64;
    let density_factor = (group.len() as f64 / FULL_SUPPORT_COUNT).min(1.0);
    let confidence = round2(avg_similarity * density_factor);

    ProjectionResult {
        horizon,
        casualty_trend,
        casualty_range,
        injury_range,
        collapse_progression: mode(&collapse_vals),
        access_disruption: mode(&access_vals),
        utility_degradation: "unknown".to_string(),
        secondary_risks: risks.into_iter().map(str::to_string).collect(),
        confidence_score: confidence,
        supporting_experience_count: group.len(),
    }
}

fn range_and_trend(casualties: &[i64]) -> (String, String) {
    match (casualties.iter().min(), casualties.iter().max()) {
        (Some(min), Some(max)) => {
            let trend = if *max > INCREASING_CASUALTY_THRESHOLD {
                "increasing"
            } else {
                "stabilizing"
            };
            (format!("{min} - {max}"), trend.to_string())
        }
        _ => ("unknown".to_string(), "uncertain".to_string()),
    }
}

/// Most frequent value; ties resolve to the lexicographically smallest so
/// the consensus is invariant under cohort permutation.
fn mode(vals: &[&str]) -> String {
    if vals.is_empty() {
        return "unknown".to_string();
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in vals {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, _)| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
