//! Structured response assembly
//!
//! Formats the raw analysis components into a safe, structured
//! [`SystemResponse`]. Language is comparative and probabilistic throughout:
//! no "will", no imperatives, uncertainty always explicit.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    confidence_label, ConfidenceAssessment, ConfidenceOverview, EarthquakeSituation,
    EvidenceContext, FormattedIntervention, FormattedProjection, Horizon,
    InterventionRecommendation, ProjectionResult, SituationSummary, SystemResponse,
};

/// Cohort provenance surfaced in the evidence section.
#[derive(Debug, Clone, Default)]
pub struct CohortMeta {
    pub cohort_size: usize,
    pub dominant_patterns: Option<String>,
    pub divergences: Option<String>,
}

/// Assembles the five response sections from calibrated pipeline outputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseFormatter;

impl ResponseFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(
        &self,
        situation: &EarthquakeSituation,
        projections: &BTreeMap<Horizon, ProjectionResult>,
        projection_conf: &BTreeMap<Horizon, ConfidenceAssessment>,
        interventions: &[(InterventionRecommendation, ConfidenceAssessment)],
        cohort_meta: &CohortMeta,
    ) -> SystemResponse {
        let situation_summary = build_summary(situation);

        // Horizons render in fixed chronological order.
        let baseline_projections: Vec<FormattedProjection> = Horizon::ALL
            .iter()
            .filter_map(|h| {
                let proj = projections.get(h)?;
                let conf = projection_conf.get(h)?;
                Some(FormattedProjection {
                    horizon: h.label().to_string(),
                    trend: format!("{} casualty trend observed", proj.casualty_trend),
                    range_desc: format!("{} casualties (est)", proj.casualty_range),
                    confidence_label: conf.label.clone(),
                    confidence_score: conf.score,
                })
            })
            .collect();

        let intervention_options: Vec<FormattedIntervention> = interventions
            .iter()
            .map(|(rec, conf)| FormattedIntervention {
                action: rec.action_name.clone(),
                window: rec.suggested_time_window.clone(),
                effect_desc: rec.comparative_effect.clone(),
                confidence_label: conf.label.clone(),
                confidence_score: conf.score,
                evidence_count: rec.supporting_experience_count,
            })
            .collect();

        let evidence_context = EvidenceContext {
            cohort_size: cohort_meta.cohort_size,
            dominant_patterns: cohort_meta
                .dominant_patterns
                .clone()
                .unwrap_or_else(|| "Historical patterns from similar events.".to_string()),
            divergences: cohort_meta
                .divergences
                .clone()
                .unwrap_or_else(|| "No major divergences inferred.".to_string()),
        };

        // Safety priority: the overall level reports the weakest horizon.
        let min_score = projection_conf
            .values()
            .map(|c| c.score)
            .fold(f64::INFINITY, f64::min);
        let min_score = if min_score.is_finite() { min_score } else { 0.0 };

        let mut drivers: BTreeSet<String> = BTreeSet::new();
        for conf in projection_conf.values() {
            drivers.extend(conf.drivers.iter().cloned());
        }
        for (_, conf) in interventions {
            drivers.extend(conf.drivers.iter().cloned());
        }

        let confidence_overview = ConfidenceOverview {
            overall_level: confidence_label(min_score).to_string(),
            drivers: drivers.into_iter().collect(),
            risks_gaps: vec![if min_score < 0.5 {
                "Sparse data".to_string()
            } else {
                "None specific".to_string()
            }],
        };

        SystemResponse {
            situation_summary,
            baseline_projections,
            intervention_options,
            evidence_context,
            confidence_overview,
        }
    }
}

fn build_summary(sit: &EarthquakeSituation) -> SituationSummary {
    let mut knowns = Vec::new();
    let mut unknowns = Vec::new();

    match sit.event_identity.magnitude.as_ref().and_then(|p| p.value) {
        Some(mag) => knowns.push(format!("Magnitude {mag}")),
        None => unknowns.push("Magnitude".to_string()),
    }

    match sit
        .spatial_context
        .region_type
        .as_ref()
        .and_then(|p| p.value.as_ref())
    {
        Some(region) => knowns.push(format!("Region: {region}")),
        None => unknowns.push("Region type".to_string()),
    }

    if let Some(density) = sit
        .human_exposure
        .population_density
        .as_ref()
        .and_then(|p| p.value.as_ref())
    {
        knowns.push(format!("Population density: {density}"));
    }

    if let Some(collapse) = sit
        .damage_indicators
        .building_collapse_severity
        .as_ref()
        .and_then(|p| p.value.as_ref())
    {
        knowns.push(format!("Collapse severity: {collapse}"));
    }

    SituationSummary {
        event_id: sit
            .event_identity
            .event_id
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        phase: sit
            .event_identity
            .phase
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        known_facts: knowns,
        explicit_unknowns: unknowns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UncertainProperty;

    fn assessment(score: f64, drivers: &[&str]) -> ConfidenceAssessment {
        ConfidenceAssessment {
            score,
            label: confidence_label(score).to_string(),
            explanation: String::new(),
            drivers: drivers.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn projection(horizon: Horizon, trend: &str, range: &str) -> ProjectionResult {
        ProjectionResult {
            casualty_trend: trend.to_string(),
            casualty_range: range.to_string(),
            ..ProjectionResult::empty(horizon)
        }
    }

    fn sample_inputs() -> (
        EarthquakeSituation,
        BTreeMap<Horizon, ProjectionResult>,
        BTreeMap<Horizon, ConfidenceAssessment>,
    ) {
        let mut sit = EarthquakeSituation::default();
        sit.event_identity.event_id = Some("eq-42".to_string());
        sit.event_identity.phase = Some("immediate_impact".to_string());
        sit.event_identity.magnitude = Some(UncertainProperty::observed(7.2, "case_report"));

        let mut projections = BTreeMap::new();
        projections.insert(Horizon::H24To48, projection(Horizon::H24To48, "increasing", "100 - 900"));
        projections.insert(Horizon::H0To12, projection(Horizon::H0To12, "stabilizing", "10 - 60"));

        let mut conf = BTreeMap::new();
        conf.insert(Horizon::H0To12, assessment(0.7, &[]));
        conf.insert(Horizon::H24To48, assessment(0.4, &["Sparse data (<3 cases)"]));

        (sit, projections, conf)
    }

    #[test]
    fn projections_render_in_chronological_order() {
        let (sit, projections, conf) = sample_inputs();
        let response = ResponseFormatter::new().format(
            &sit,
            &projections,
            &conf,
            &[],
            &CohortMeta { cohort_size: 4, ..CohortMeta::default() },
        );

        let horizons: Vec<&str> = response
            .baseline_projections
            .iter()
            .map(|p| p.horizon.as_str())
            .collect();
        assert_eq!(horizons, vec!["0-12h", "24-48h"]);
        assert_eq!(
            response.baseline_projections[0].trend,
            "stabilizing casualty trend observed"
        );
        assert_eq!(
            response.baseline_projections[1].range_desc,
            "100 - 900 casualties (est)"
        );
    }

    #[test]
    fn summary_separates_knowns_from_unknowns() {
        let (sit, projections, conf) = sample_inputs();
        let response =
            ResponseFormatter::new().format(&sit, &projections, &conf, &[], &CohortMeta::default());

        let summary = &response.situation_summary;
        assert_eq!(summary.event_id, "eq-42");
        assert!(summary.known_facts.contains(&"Magnitude 7.2".to_string()));
        assert!(summary.explicit_unknowns.contains(&"Region type".to_string()));
    }

    #[test]
    fn overall_level_reports_the_weakest_horizon() {
        let (sit, projections, conf) = sample_inputs();
        let response =
            ResponseFormatter::new().format(&sit, &projections, &conf, &[], &CohortMeta::default());

        // min score is 0.4 -> Low, and the sparse-data gap is surfaced
        assert_eq!(response.confidence_overview.overall_level, "Low");
        assert_eq!(response.confidence_overview.risks_gaps, vec!["Sparse data"]);
        assert!(response
            .confidence_overview
            .drivers
            .contains(&"Sparse data (<3 cases)".to_string()));
    }

    #[test]
    fn no_projections_yields_low_overall() {
        let sit = EarthquakeSituation::default();
        let response = ResponseFormatter::new().format(
            &sit,
            &BTreeMap::new(),
            &BTreeMap::new(),
            &[],
            &CohortMeta::default(),
        );
        assert_eq!(response.confidence_overview.overall_level, "Low");
        assert!(response.baseline_projections.is_empty());
    }

    #[test]
    fn rendered_language_avoids_prescriptive_phrasing() {
        let (sit, projections, conf) = sample_inputs();
        let interventions = vec![(
            InterventionRecommendation {
                action_name: "evacuation".to_string(),
                suggested_time_window: "0-12h".to_string(),
                comparative_effect:
                    "Associated with 40% lower casualties in similar cases (30 vs 50)".to_string(),
                confidence_score: 0.5,
                supporting_experience_count: 3,
                notes: "Observational correlation only.".to_string(),
            },
            assessment(0.4, &[]),
        )];

        let response = ResponseFormatter::new().format(
            &sit,
            &projections,
            &conf,
            &interventions,
            &CohortMeta::default(),
        );

        let rendered = serde_json::to_string(&response).unwrap().to_lowercase();
        assert!(!rendered.contains("will "));
        assert!(!rendered.contains("must "));
        assert!(rendered.contains("associated with"));
    }
}
