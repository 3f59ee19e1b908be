//! Counterfactual intervention reasoning
//!
//! Discovers candidate interventions by comparing outcomes between cohort
//! members that took an action and those that did not. The comparison is
//! strictly observational: every emitted effect is phrased as an
//! association, never a causal claim.

use statrs::statistics::Statistics;

use crate::retrieval::SimilarityResult;
use crate::types::{ActionsTaken, InterventionRecommendation, TimePhase, UncertainProperty};

/// Values that mean "no action actually happened".
const INACTIVE_VALUES: [&str; 3] = ["none", "pending", "unknown"];

/// Evidence count at which confidence saturates: n / 10 capped at 0.9.
const CONFIDENCE_CEILING: f64 = 0.9;
const CONFIDENCE_EVIDENCE_SCALE: f64 = 10.0;

// ============================================================================
// Action kinds
// ============================================================================

/// The discrete action kinds tracked in `ActionsTaken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Rescue,
    Evacuation,
    Medical,
    Logistics,
}

impl ActionKind {
    /// Fixed evaluation order keeps the output deterministic.
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Rescue,
        ActionKind::Evacuation,
        ActionKind::Medical,
        ActionKind::Logistics,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Rescue => "rescue_operations",
            ActionKind::Evacuation => "evacuation",
            ActionKind::Medical => "medical_deployment",
            ActionKind::Logistics => "logistics_coordination",
        }
    }

    fn property(self, actions: &ActionsTaken) -> Option<&UncertainProperty<String>> {
        match self {
            ActionKind::Rescue => actions.rescue_operations.as_ref(),
            ActionKind::Evacuation => actions.evacuation_status.as_ref(),
            ActionKind::Medical => actions.medical_deployment.as_ref(),
            ActionKind::Logistics => actions.logistics_coordination.as_ref(),
        }
    }
}

// ============================================================================
// Reasoner
// ============================================================================

/// Compares "treated" vs "untreated" similar past experiences per action.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterventionReasoner;

impl InterventionReasoner {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every action observed in the cohort and return the
    /// beneficial ones, sorted by confidence descending.
    ///
    /// The suggested window is currently a fixed early-phase heuristic
    /// independent of the query phase; the parameter is kept for contract
    /// stability.
    pub fn recommend(
        &self,
        _query_phase: TimePhase,
        cohort: &[SimilarityResult],
    ) -> Vec<InterventionRecommendation> {
        let mut recommendations: Vec<InterventionRecommendation> = ActionKind::ALL
            .iter()
            .filter(|kind| {
                cohort
                    .iter()
                    .any(|res| has_action(kind.property(&res.experience_unit.situation.actions_taken)))
            })
            .filter_map(|&kind| evaluate_action(kind, cohort))
            .collect();

        recommendations.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }
}

/// True when the property carries a value that indicates the action was
/// actually underway.
fn has_action(prop: Option<&UncertainProperty<String>>) -> bool {
    prop.and_then(|p| p.value.as_deref())
        .is_some_and(|v| !INACTIVE_VALUES.contains(&v))
}

/// Compare casualties between the partition with the action and the one
/// without. Returns a recommendation only when both partitions exist, both
/// carry outcome data, and the treated side fared better.
fn evaluate_action(
    kind: ActionKind,
    cohort: &[SimilarityResult],
) -> Option<InterventionRecommendation> {
    let (with_action, without_action): (Vec<&SimilarityResult>, Vec<&SimilarityResult>) =
        cohort.iter().partition(|res| {
            has_action(kind.property(&res.experience_unit.situation.actions_taken))
        });

    if with_action.is_empty() || without_action.is_empty() {
        return None;
    }

    let mean_with = mean_casualties(&with_action)?;
    let mean_without = mean_casualties(&without_action)?;

    if mean_with >= mean_without {
        return None;
    }

    let pct = if mean_without > 0.0 {
        (mean_without - mean_with) / mean_without * 100.0
    } else {
        0.0
    };

    let evidence = (with_action.len() + without_action.len()) as f64;
    let confidence = round2((evidence / CONFIDENCE_EVIDENCE_SCALE).min(CONFIDENCE_CEILING));

    Some(InterventionRecommendation {
        action_name: kind.name().to_string(),
        suggested_time_window: "0-12h".to_string(),
        comparative_effect: format!(
            "Associated with {}% lower casualties in similar cases ({} vs {})",
            pct as i64, mean_with as i64, mean_without as i64
        ),
        confidence_score: confidence,
        supporting_experience_count: with_action.len(),
        notes: "Observational correlation only.".to_string(),
    })
}

/// Mean casualty count over the group's ground-truth outcomes, or None when
/// no member carries one.
fn mean_casualties(group: &[&SimilarityResult]) -> Option<f64> {
    let vals: Vec<f64> = group
        .iter()
        .filter_map(|res| {
            res.experience_unit
                .subsequent_outcomes
                .as_ref()
                .and_then(|o| o.casualties.as_ref())
                .and_then(|p| p.value)
                .map(|c| c as f64)
        })
        .collect();

    if vals.is_empty() {
        return None;
    }
    Some((&vals).mean())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EarthquakeSituation, ExperienceUnit, Outcomes};

    fn member(evacuation: Option<&str>, casualties: Option<i64>, case: &str) -> SimilarityResult {
        let mut sit = EarthquakeSituation::default();
        sit.actions_taken.evacuation_status =
            evacuation.map(|v| UncertainProperty::observed(v.to_string(), "case_report"));
        SimilarityResult {
            experience_unit: ExperienceUnit {
                situation: sit,
                phase: TimePhase::T2Stabilization,
                source_case_id: case.to_string(),
                subsequent_outcomes: casualties.map(|c| Outcomes {
                    casualties: Some(UncertainProperty::observed(c, "case_report")),
                    ..Outcomes::default()
                }),
            },
            score: 0.8,
            dimension_scores: Default::default(),
            penalties: Vec::new(),
        }
    }

    #[test]
    fn beneficial_evacuation_is_recommended() {
        let cohort = vec![
            member(Some("completed"), Some(10), "w1"),
            member(Some("completed"), Some(10), "w2"),
            member(Some("completed"), Some(10), "w3"),
            member(None, Some(100), "o1"),
            member(None, Some(100), "o2"),
            member(None, Some(100), "o3"),
        ];

        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert_eq!(recs.len(), 1);

        let top = &recs[0];
        assert_eq!(top.action_name, "evacuation");
        assert!(top.comparative_effect.contains("90% lower casualties"));
        assert_eq!(top.supporting_experience_count, 3);
        assert!((top.confidence_score - 0.6).abs() < 1e-9);
        assert_eq!(top.suggested_time_window, "0-12h");
        assert_eq!(top.notes, "Observational correlation only.");
    }

    #[test]
    fn inactive_markers_do_not_count_as_action() {
        let cohort = vec![
            member(Some("none"), Some(50), "a"),
            member(Some("pending"), Some(60), "b"),
        ];
        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert!(recs.is_empty());
    }

    #[test]
    fn one_sided_partition_is_rejected() {
        let cohort = vec![
            member(Some("completed"), Some(10), "a"),
            member(Some("completed"), Some(20), "b"),
        ];
        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert!(recs.is_empty());
    }

    #[test]
    fn missing_outcome_data_is_rejected() {
        let cohort = vec![
            member(Some("completed"), None, "a"),
            member(None, Some(100), "b"),
        ];
        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert!(recs.is_empty());
    }

    #[test]
    fn harmful_association_is_not_recommended() {
        let cohort = vec![
            member(Some("completed"), Some(500), "a"),
            member(None, Some(50), "b"),
        ];
        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert!(recs.is_empty());
    }

    #[test]
    fn recommendations_avoid_causal_and_prescriptive_language() {
        let cohort = vec![
            member(Some("completed"), Some(10), "a"),
            member(None, Some(100), "b"),
        ];
        let recs = InterventionReasoner::new().recommend(TimePhase::T0Impact, &cohort);
        assert_eq!(recs.len(), 1);
        let text = format!("{} {}", recs[0].comparative_effect, recs[0].notes);
        let lower = text.to_lowercase();
        assert!(!lower.contains("caused"));
        assert!(!lower.contains("will"));
        assert!(lower.contains("associated with"));
    }

    #[test]
    fn output_is_invariant_under_cohort_permutation() {
        let cohort = vec![
            member(Some("completed"), Some(10), "a"),
            member(Some("completed"), Some(30), "b"),
            member(None, Some(100), "c"),
            member(None, Some(200), "d"),
        ];
        let mut reversed = cohort.clone();
        reversed.reverse();

        let reasoner = InterventionReasoner::new();
        let forward = reasoner.recommend(TimePhase::T0Impact, &cohort);
        let backward = reasoner.recommend(TimePhase::T0Impact, &reversed);
        assert_eq!(forward, backward);
    }
}
