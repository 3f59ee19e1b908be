//! Time-phased case ingestion
//!
//! Decomposes a raw case-study document into phase-bounded time slices.
//! Leakage prevention is structural: each phase builder only reads the
//! sub-aggregates that phase is allowed to carry, regardless of what the raw
//! document contains.
//!
//! Phase-content policy:
//! - T0: identity, spatial, human, built, damage. No actions, no outcomes.
//! - T1: T0 content plus rescue and evacuation.
//! - T2: T1 content plus medical and logistics.
//! - T3: T2 content plus outcomes.

use serde_json::Value;
use tracing::warn;

use crate::types::{
    ActionsTaken, BuiltEnvironment, DamageIndicators, DensityValue, EarthquakeSituation,
    EventIdentity, ExperienceUnit, HumanExposure, Outcomes, SpatialContext, TimePhase, TimeSlice,
    UncertainProperty,
};

/// Provenance label stamped on every extracted property.
const SOURCE: &str = "case_report";

/// Raw document sections the ingestor recognizes.
const SECTIONS: [&str; 7] = [
    "identity", "spatial", "human", "built", "damage", "actions", "outcomes",
];

/// Decomposes a raw case study into time-sliced situations, one per phase,
/// in phase order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseStudyIngestor;

impl CaseStudyIngestor {
    pub fn new() -> Self {
        Self
    }

    /// Main entry point. A document containing none of the recognized
    /// sections yields an empty slice list.
    pub fn ingest(&self, raw: &Value) -> Vec<TimeSlice> {
        if !SECTIONS.iter().any(|s| raw.get(s).is_some()) {
            return Vec::new();
        }

        TimePhase::ALL
            .iter()
            .map(|&phase| self.create_slice(raw, phase))
            .collect()
    }

    /// Ingest a case and promote its slices to storable experience units.
    ///
    /// The final outcomes observed at T3 are attached to every unit as
    /// `subsequent_outcomes`: stored memory may know how a case ended, a
    /// query never does.
    pub fn experience_units(&self, raw: &Value, source_case_id: &str) -> Vec<ExperienceUnit> {
        let slices = self.ingest(raw);
        let final_outcomes = slices
            .iter()
            .rev()
            .map(|s| s.situation.outcomes.clone())
            .find(|o| !o.is_empty());

        slices
            .into_iter()
            .map(|slice| ExperienceUnit::from_slice(slice, source_case_id, final_outcomes.clone()))
            .collect()
    }

    fn create_slice(&self, raw: &Value, phase: TimePhase) -> TimeSlice {
        let mut sit = self.base_situation(raw);
        sit.event_identity.phase = Some(phase.situation_label().to_string());
        sit.event_identity.time_since_event_hours = Some(phase.anchor_hours());

        // Damage indicators are observable from T0 onward.
        sit.damage_indicators = self.extract_damage(raw);

        // Actions accrete across phases; outcomes appear only at T3.
        let actions = section(raw, "actions");
        match phase {
            TimePhase::T0Impact => {}
            TimePhase::T1EarlyResponse => {
                sit.actions_taken = ActionsTaken {
                    rescue_operations: extract_string(actions, "rescue"),
                    evacuation_status: extract_string(actions, "evacuation"),
                    ..ActionsTaken::default()
                };
            }
            TimePhase::T2Stabilization => {
                sit.actions_taken = self.extract_all_actions(actions);
            }
            TimePhase::T3Outcome => {
                sit.actions_taken = self.extract_all_actions(actions);
                let outcomes = section(raw, "outcomes");
                sit.outcomes = Outcomes {
                    casualties: extract_count(outcomes, "casualties"),
                    injuries: extract_count(outcomes, "injuries"),
                    displacement: extract_count(outcomes, "displacement"),
                    economic_loss: extract_string(outcomes, "economic_loss"),
                };
            }
        }

        TimeSlice {
            phase,
            situation: sit,
            relative_time_label: phase.relative_time_label().to_string(),
        }
    }

    /// Static context shared by all phases: identity, spatial, human, built.
    fn base_situation(&self, raw: &Value) -> EarthquakeSituation {
        let mut sit = EarthquakeSituation::default();

        let identity = section(raw, "identity");
        sit.event_identity = EventIdentity {
            event_id: identity
                .and_then(|s| s.get("event_id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            magnitude: extract_f64(identity, "magnitude"),
            intensity: extract_string(identity, "intensity"),
            ..EventIdentity::default()
        };

        let spatial = section(raw, "spatial");
        sit.spatial_context = SpatialContext {
            region_type: extract_string(spatial, "region_type"),
            terrain: extract_string(spatial, "terrain"),
            secondary_hazards: extract_string_list(spatial, "secondary_hazards"),
            location_description: spatial
                .and_then(|s| s.get("location_description"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let human = section(raw, "human");
        sit.human_exposure = HumanExposure {
            population_density: extract_density(human, "population_density"),
            vulnerable_groups: extract_string_list(human, "vulnerable_groups"),
            time_of_day_context: human
                .and_then(|s| s.get("time_of_day"))
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let built = section(raw, "built");
        sit.built_environment = BuiltEnvironment {
            dominant_building_types: extract_string_list(built, "building_types"),
            construction_quality: extract_string(built, "construction_quality"),
            critical_infrastructure_status: extract_infrastructure(built),
        };

        sit
    }

    fn extract_damage(&self, raw: &Value) -> DamageIndicators {
        let damage = section(raw, "damage");
        DamageIndicators {
            building_collapse_severity: extract_string(damage, "building_collapse"),
            access_disruption: extract_string(damage, "access_disruption"),
            utility_failures: extract_string_list(damage, "utility_failures"),
            visible_hazards: extract_string_list(damage, "visible_hazards"),
        }
    }

    fn extract_all_actions(&self, actions: Option<&Value>) -> ActionsTaken {
        ActionsTaken {
            rescue_operations: extract_string(actions, "rescue"),
            evacuation_status: extract_string(actions, "evacuation"),
            medical_deployment: extract_string(actions, "medical"),
            logistics_coordination: extract_string(actions, "logistics"),
        }
    }
}

// ============================================================================
// Extraction helpers
// ============================================================================
//
// Malformed values (wrong JSON type) are dropped with a warning, never fatal.

fn section<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| v.is_object())
}

fn extract_f64(section: Option<&Value>, key: &str) -> Option<UncertainProperty<f64>> {
    let value = section?.get(key)?;
    if value.is_null() {
        return None;
    }
    match value.as_f64() {
        Some(n) => Some(UncertainProperty::observed(n, SOURCE)),
        None => {
            warn!(key, ?value, "Dropping malformed numeric value");
            None
        }
    }
}

fn extract_count(section: Option<&Value>, key: &str) -> Option<UncertainProperty<i64>> {
    let value = section?.get(key)?;
    if value.is_null() {
        return None;
    }
    match value.as_i64() {
        Some(n) => Some(UncertainProperty::observed(n, SOURCE)),
        None => {
            warn!(key, ?value, "Dropping malformed count value");
            None
        }
    }
}

fn extract_string(section: Option<&Value>, key: &str) -> Option<UncertainProperty<String>> {
    let value = section?.get(key)?;
    if value.is_null() {
        return None;
    }
    match value.as_str() {
        Some(s) => Some(UncertainProperty::observed(s.to_string(), SOURCE)),
        None => {
            warn!(key, ?value, "Dropping malformed string value");
            None
        }
    }
}

fn extract_density(section: Option<&Value>, key: &str) -> Option<UncertainProperty<DensityValue>> {
    let value = section?.get(key)?;
    if value.is_null() {
        return None;
    }
    if let Some(n) = value.as_f64() {
        return Some(UncertainProperty::observed(DensityValue::Count(n), SOURCE));
    }
    if let Some(s) = value.as_str() {
        return Some(UncertainProperty::observed(
            DensityValue::Label(s.to_string()),
            SOURCE,
        ));
    }
    warn!(key, ?value, "Dropping malformed density value");
    None
}

fn extract_string_list(section: Option<&Value>, key: &str) -> Vec<UncertainProperty<String>> {
    let Some(items) = section.and_then(|s| s.get(key)).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.as_str() {
            Some(s) => Some(UncertainProperty::observed(s.to_string(), SOURCE)),
            None => {
                warn!(key, ?item, "Dropping malformed list entry");
                None
            }
        })
        .collect()
}

fn extract_infrastructure(
    section: Option<&Value>,
) -> std::collections::BTreeMap<String, UncertainProperty<String>> {
    let Some(map) = section
        .and_then(|s| s.get("critical_infrastructure"))
        .and_then(Value::as_object)
    else {
        return std::collections::BTreeMap::new();
    };
    map.iter()
        .filter_map(|(system, status)| match status.as_str() {
            Some(s) => Some((
                system.clone(),
                UncertainProperty::observed(s.to_string(), SOURCE),
            )),
            None => {
                warn!(system = %system, ?status, "Dropping malformed infrastructure status");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_case() -> Value {
        json!({
            "identity": {"event_id": "e1", "magnitude": 9.0},
            "damage": {"building_collapse": "severe"},
            "actions": {"rescue": "deployed", "medical": "triage"},
            "outcomes": {"casualties": 15000, "economic_loss": "catastrophic"}
        })
    }

    #[test]
    fn full_case_yields_four_slices_in_phase_order() {
        let slices = CaseStudyIngestor::new().ingest(&full_case());
        assert_eq!(slices.len(), 4);
        let phases: Vec<TimePhase> = slices.iter().map(|s| s.phase).collect();
        assert_eq!(phases, TimePhase::ALL.to_vec());
    }

    #[test]
    fn t0_carries_no_actions_and_no_outcomes() {
        let slices = CaseStudyIngestor::new().ingest(&full_case());
        let t0 = &slices[0];
        assert!(t0.situation.actions_taken.is_empty());
        assert!(t0.situation.outcomes.is_empty());
        assert_eq!(
            t0.situation.event_identity.phase.as_deref(),
            Some("immediate_impact")
        );
        assert_eq!(t0.situation.event_identity.time_since_event_hours, Some(0.0));
    }

    #[test]
    fn t1_has_rescue_but_no_medical_and_no_casualties() {
        let slices = CaseStudyIngestor::new().ingest(&full_case());
        let t1 = &slices[1];
        assert!(t1.situation.actions_taken.rescue_operations.is_some());
        assert!(t1.situation.actions_taken.medical_deployment.is_none());
        assert!(t1.situation.outcomes.is_empty());
    }

    #[test]
    fn t2_adds_medical_but_still_no_outcomes() {
        let slices = CaseStudyIngestor::new().ingest(&full_case());
        let t2 = &slices[2];
        assert!(t2.situation.actions_taken.medical_deployment.is_some());
        assert!(t2.situation.outcomes.is_empty());
    }

    #[test]
    fn t3_carries_the_outcomes() {
        let slices = CaseStudyIngestor::new().ingest(&full_case());
        let t3 = &slices[3];
        let casualties = t3
            .situation
            .outcomes
            .casualties
            .as_ref()
            .and_then(|p| p.value);
        assert_eq!(casualties, Some(15000));
        assert_eq!(t3.situation.event_identity.time_since_event_hours, Some(72.0));
    }

    #[test]
    fn empty_input_yields_no_slices() {
        let slices = CaseStudyIngestor::new().ingest(&json!({}));
        assert!(slices.is_empty());

        let slices = CaseStudyIngestor::new().ingest(&json!({"unrelated": 1}));
        assert!(slices.is_empty());
    }

    #[test]
    fn malformed_values_are_dropped_not_fatal() {
        let raw = json!({
            "identity": {"event_id": "e2", "magnitude": "not-a-number"},
            "damage": {"building_collapse": 42},
            "spatial": {"secondary_hazards": ["landslide", 7]}
        });
        let slices = CaseStudyIngestor::new().ingest(&raw);
        assert_eq!(slices.len(), 4);

        let t0 = &slices[0];
        assert!(t0.situation.event_identity.magnitude.is_none());
        assert!(t0
            .situation
            .damage_indicators
            .building_collapse_severity
            .is_none());
        assert_eq!(t0.situation.spatial_context.secondary_hazards.len(), 1);
    }

    #[test]
    fn experience_units_attach_final_outcomes_to_every_phase() {
        let units = CaseStudyIngestor::new().experience_units(&full_case(), "case-1");
        assert_eq!(units.len(), 4);
        for unit in &units {
            let outcomes = unit.subsequent_outcomes.as_ref().unwrap();
            assert_eq!(outcomes.casualties.as_ref().and_then(|p| p.value), Some(15000));
            assert_eq!(unit.source_case_id, "case-1");
        }
        // The indexed situation at early phases still carries no outcomes.
        assert!(units[0].situation.outcomes.is_empty());
    }

    #[test]
    fn infrastructure_map_is_parsed_when_present() {
        let raw = json!({
            "identity": {"event_id": "e3"},
            "built": {
                "building_types": ["masonry"],
                "critical_infrastructure": {"hospitals": "overwhelmed", "power": "down"}
            }
        });
        let slices = CaseStudyIngestor::new().ingest(&raw);
        let infra = &slices[0].situation.built_environment.critical_infrastructure_status;
        assert_eq!(infra.len(), 2);
        assert_eq!(
            infra.get("hospitals").and_then(|p| p.value.as_deref()),
            Some("overwhelmed")
        );
    }
}
