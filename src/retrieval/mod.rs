//! Deterministic multi-dimensional similarity ranking
//!
//! Compares a query situation against candidate experience units across four
//! weighted dimensions, applies a phase-compatibility penalty, and returns
//! explainable, reproducible scores. No learning, no black box: two calls
//! with identical inputs produce identical output.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{DensityValue, EarthquakeSituation, ExperienceUnit, UncertainProperty};

// ============================================================================
// Results
// ============================================================================

/// Structured output of one similarity comparison. Explains *why* an
/// experience is considered similar.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    pub experience_unit: ExperienceUnit,
    /// Aggregate score in [0, 1], rounded to 4 decimals.
    pub score: f64,
    /// Per-dimension scores, rounded to 4 decimals.
    pub dimension_scores: BTreeMap<String, f64>,
    /// Applied penalties, e.g. a phase mismatch.
    pub penalties: Vec<String>,
}

// ============================================================================
// Weights
// ============================================================================

/// Published, fixed dimension weights. Normalized to sum to 1 at engine
/// construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub scale: f64,
    pub spatial: f64,
    pub human: f64,
    pub built: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            scale: 0.30,
            spatial: 0.25,
            human: 0.20,
            built: 0.25,
        }
    }
}

impl SimilarityWeights {
    fn normalized(self) -> Self {
        let total = self.scale + self.spatial + self.human + self.built;
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            scale: self.scale / total,
            spatial: self.spatial / total,
            human: self.human / total,
            built: self.built / total,
        }
    }
}

/// Multiplier applied to the aggregate score on a phase mismatch.
const PHASE_MISMATCH_FACTOR: f64 = 0.8;

/// Magnitude delta treated as fully dissimilar (e.g. 6.0 vs 9.0).
const MAX_MAGNITUDE_DELTA: f64 = 3.0;

// ============================================================================
// Engine
// ============================================================================

/// Deterministic, explainable similarity engine.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(SimilarityWeights::default())
    }
}

impl SimilarityEngine {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self {
            weights: weights.normalized(),
        }
    }

    /// Score and rank candidates against the query, descending by score.
    /// Ties keep candidate insertion order (the sort is stable).
    pub fn rank(
        &self,
        query: &EarthquakeSituation,
        candidates: &[ExperienceUnit],
    ) -> Vec<SimilarityResult> {
        let mut results: Vec<SimilarityResult> = candidates
            .iter()
            .map(|cand| self.compute_similarity(query, cand))
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    /// Compute the similarity between a query situation and one candidate.
    pub fn compute_similarity(
        &self,
        query: &EarthquakeSituation,
        candidate: &ExperienceUnit,
    ) -> SimilarityResult {
        let cand_sit = &candidate.situation;

        let mut dims = BTreeMap::new();
        dims.insert("scale".to_string(), scale_similarity(query, cand_sit));
        dims.insert("spatial".to_string(), spatial_similarity(query, cand_sit));
        dims.insert("human".to_string(), human_similarity(query, cand_sit));
        dims.insert("built".to_string(), built_similarity(query, cand_sit));

        let mut raw = dims["scale"] * self.weights.scale
            + dims["spatial"] * self.weights.spatial
            + dims["human"] * self.weights.human
            + dims["built"] * self.weights.built;

        let mut penalties = Vec::new();
        if let Some(query_phase) = query.event_identity.phase.as_deref() {
            if !phase_compatible(query_phase, candidate.phase.as_str()) {
                raw *= PHASE_MISMATCH_FACTOR;
                penalties.push(format!(
                    "Phase mismatch: query '{}' vs candidate '{}'",
                    query_phase,
                    candidate.phase.as_str()
                ));
            }
        }

        SimilarityResult {
            experience_unit: candidate.clone(),
            score: round4(raw),
            dimension_scores: dims.into_iter().map(|(k, v)| (k, round4(v))).collect(),
            penalties,
        }
    }
}

// ============================================================================
// Dimension scorers
// ============================================================================

/// Magnitude proximity: `max(0, 1 - |delta| / 3)`. One side missing scores
/// a cautious 0.4, both missing a neutral 0.5.
fn scale_similarity(q: &EarthquakeSituation, c: &EarthquakeSituation) -> f64 {
    let q_mag = q.event_identity.magnitude.as_ref().and_then(|p| p.value);
    let c_mag = c.event_identity.magnitude.as_ref().and_then(|p| p.value);

    match (q_mag, c_mag) {
        (Some(a), Some(b)) => (1.0 - (a - b).abs() / MAX_MAGNITUDE_DELTA).max(0.0),
        (Some(_), None) | (None, Some(_)) => 0.4,
        (None, None) => 0.5,
    }
}

/// Categorical region-type match.
fn spatial_similarity(q: &EarthquakeSituation, c: &EarthquakeSituation) -> f64 {
    let q_reg = q.spatial_context.region_type.as_ref().and_then(|p| p.value.as_ref());
    let c_reg = c.spatial_context.region_type.as_ref().and_then(|p| p.value.as_ref());

    match (q_reg, c_reg) {
        (Some(a), Some(b)) => {
            if a == b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.5,
    }
}

/// Population density equality: numeric against numeric, label against label.
fn human_similarity(q: &EarthquakeSituation, c: &EarthquakeSituation) -> f64 {
    let q_pop = q.human_exposure.population_density.as_ref().and_then(|p| p.value.as_ref());
    let c_pop = c.human_exposure.population_density.as_ref().and_then(|p| p.value.as_ref());

    match (q_pop, c_pop) {
        (Some(a), Some(b)) => match (a, b) {
            (DensityValue::Count(x), DensityValue::Count(y)) => {
                if x == y {
                    1.0
                } else {
                    0.0
                }
            }
            (DensityValue::Label(x), DensityValue::Label(y)) => {
                if x == y {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        },
        _ => 0.5,
    }
}

/// Jaccard index over dominant building types. Both empty is neutral 0.5,
/// exactly one empty is a weak 0.3.
fn built_similarity(q: &EarthquakeSituation, c: &EarthquakeSituation) -> f64 {
    let q_types = value_set(&q.built_environment.dominant_building_types);
    let c_types = value_set(&c.built_environment.dominant_building_types);

    if q_types.is_empty() && c_types.is_empty() {
        return 0.5;
    }
    if q_types.is_empty() || c_types.is_empty() {
        return 0.3;
    }

    let intersection = q_types.intersection(&c_types).count();
    let union = q_types.union(&c_types).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn value_set(props: &[UncertainProperty<String>]) -> BTreeSet<&str> {
    props.iter().filter_map(|p| p.value.as_deref()).collect()
}

// ============================================================================
// Phase compatibility
// ============================================================================

/// Coarse compatibility between a free-text query phase and the candidate's
/// strict phase, via ASCII-uppercase substring classes.
fn phase_compatible(query_phase: &str, candidate_phase: &str) -> bool {
    let qp = query_phase.to_ascii_uppercase();
    let cp = candidate_phase.to_ascii_uppercase();

    (qp.contains("IMPACT") && cp.contains("IMPACT"))
        || (qp.contains("RESPONSE") && cp.contains("RESPONSE"))
        || (qp.contains("STABIL") && cp.contains("STABIL"))
        || (qp.contains("OUTCOME") && cp.contains("OUTCOME"))
        || (qp.contains("RECOVER") && cp.contains("OUTCOME"))
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimePhase;

    fn situation(magnitude: Option<f64>, region: Option<&str>, phase: Option<&str>) -> EarthquakeSituation {
        let mut sit = EarthquakeSituation::default();
        sit.event_identity.magnitude =
            magnitude.map(|m| UncertainProperty::observed(m, "case_report"));
        sit.spatial_context.region_type =
            region.map(|r| UncertainProperty::observed(r.to_string(), "case_report"));
        sit.event_identity.phase = phase.map(str::to_string);
        sit
    }

    fn unit(sit: EarthquakeSituation, phase: TimePhase, case: &str) -> ExperienceUnit {
        ExperienceUnit {
            situation: sit,
            phase,
            source_case_id: case.to_string(),
            subsequent_outcomes: None,
        }
    }

    #[test]
    fn identical_situations_score_high_without_penalty() {
        let query = situation(Some(7.5), Some("urban"), Some("immediate_impact"));
        let cand = unit(query.clone(), TimePhase::T0Impact, "c1");

        let engine = SimilarityEngine::default();
        let result = engine.compute_similarity(&query, &cand);

        assert!(result.score >= 0.8, "score was {}", result.score);
        assert!(result.penalties.is_empty());
        assert_eq!(result.dimension_scores["scale"], 1.0);
        assert_eq!(result.dimension_scores["spatial"], 1.0);
    }

    #[test]
    fn phase_mismatch_applies_penalty_factor() {
        let query = situation(Some(7.0), None, Some("immediate_impact"));
        let cand = unit(
            situation(Some(5.0), None, None),
            TimePhase::T3Outcome,
            "c1",
        );

        let engine = SimilarityEngine::default();
        let result = engine.compute_similarity(&query, &cand);

        // scale = 1 - 2/3, other dims neutral
        let scale = result.dimension_scores["scale"];
        assert!((scale - 0.3333).abs() < 1e-9, "scale was {scale}");
        assert_eq!(result.penalties.len(), 1);
        assert!(result.penalties[0].contains("Phase mismatch"));

        let unpenalized = 0.3 * (1.0 - 2.0 / 3.0) + 0.25 * 0.5 + 0.2 * 0.5 + 0.25 * 0.5;
        assert!((result.score - round4(unpenalized * 0.8)).abs() < 1e-9);
    }

    #[test]
    fn recovery_phase_matches_outcome_candidates() {
        assert!(phase_compatible("recovery", "T3_OUTCOME"));
        assert!(phase_compatible("immediate_impact", "T0_IMPACT"));
        assert!(phase_compatible("early_response", "T1_EARLY_RESPONSE"));
        assert!(!phase_compatible("immediate_impact", "T3_OUTCOME"));
    }

    #[test]
    fn missing_magnitude_scores_defaults() {
        let engine = SimilarityEngine::default();
        let one_missing = engine.compute_similarity(
            &situation(Some(7.0), None, None),
            &unit(situation(None, None, None), TimePhase::T0Impact, "c"),
        );
        assert_eq!(one_missing.dimension_scores["scale"], 0.4);

        let both_missing = engine.compute_similarity(
            &situation(None, None, None),
            &unit(situation(None, None, None), TimePhase::T0Impact, "c"),
        );
        assert_eq!(both_missing.dimension_scores["scale"], 0.5);
    }

    #[test]
    fn built_dimension_uses_jaccard() {
        let mut q = EarthquakeSituation::default();
        q.built_environment.dominant_building_types = vec![
            UncertainProperty::observed("masonry".to_string(), "case_report"),
            UncertainProperty::observed("concrete".to_string(), "case_report"),
        ];
        let mut c = EarthquakeSituation::default();
        c.built_environment.dominant_building_types = vec![
            UncertainProperty::observed("concrete".to_string(), "case_report"),
            UncertainProperty::observed("timber".to_string(), "case_report"),
        ];

        let engine = SimilarityEngine::default();
        let result =
            engine.compute_similarity(&q, &unit(c, TimePhase::T0Impact, "c"));
        // |{concrete}| / |{masonry, concrete, timber}|
        assert!((result.dimension_scores["built"] - 0.3333).abs() < 1e-9);

        let one_empty = engine.compute_similarity(
            &q,
            &unit(EarthquakeSituation::default(), TimePhase::T0Impact, "c"),
        );
        assert_eq!(one_empty.dimension_scores["built"], 0.3);
    }

    #[test]
    fn scoring_is_deterministic_byte_for_byte() {
        let query = situation(Some(6.8), Some("rural"), Some("early_response"));
        let cand = unit(
            situation(Some(7.1), Some("urban"), None),
            TimePhase::T1EarlyResponse,
            "c9",
        );

        let engine = SimilarityEngine::default();
        let a = serde_json::to_vec(&engine.compute_similarity(&query, &cand)).unwrap();
        let b = serde_json::to_vec(&engine.compute_similarity(&query, &cand)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rank_sorts_descending_with_stable_ties() {
        let query = situation(Some(7.0), Some("urban"), None);
        let strong = unit(query.clone(), TimePhase::T0Impact, "strong");
        let weak = unit(
            situation(Some(4.0), Some("rural"), None),
            TimePhase::T0Impact,
            "weak",
        );
        let tie_a = unit(situation(None, None, None), TimePhase::T0Impact, "tie_a");
        let tie_b = unit(situation(None, None, None), TimePhase::T0Impact, "tie_b");

        let engine = SimilarityEngine::default();
        let ranked = engine.rank(&query, &[weak, tie_a, strong, tie_b]);

        assert_eq!(ranked[0].experience_unit.source_case_id, "strong");
        // Ties keep insertion order
        let tie_positions: Vec<&str> = ranked
            .iter()
            .filter(|r| r.experience_unit.source_case_id.starts_with("tie"))
            .map(|r| r.experience_unit.source_case_id.as_str())
            .collect();
        assert_eq!(tie_positions, vec!["tie_a", "tie_b"]);
    }

    #[test]
    fn scores_stay_within_unit_interval() {
        let engine = SimilarityEngine::default();
        let query = situation(Some(9.9), Some("urban"), Some("immediate_impact"));
        let far = unit(
            situation(Some(1.0), Some("rural"), None),
            TimePhase::T3Outcome,
            "far",
        );
        let result = engine.compute_similarity(&query, &far);
        assert!(result.score >= 0.0 && result.score <= 1.0);
    }
}
