//! Canonical situation model: UncertainProperty, sub-aggregates, EarthquakeSituation
//!
//! Every observed attribute is wrapped in an [`UncertainProperty`] envelope so
//! that a missing value, its provenance, and its confidence are first-class.
//! Serialization is total: unknown fields are ignored on input and missing
//! fields fall back to empty defaults.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Uncertainty envelope
// ============================================================================

/// Ordinal confidence bucket for observations without a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    Unknown,
}

/// Confidence attached to an observation: numeric score in [0, 1] or ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Ordinal(ConfidenceLevel),
}

impl Default for Confidence {
    fn default() -> Self {
        Confidence::Ordinal(ConfidenceLevel::Unknown)
    }
}

/// A value that may be uncertain, originating from a specific source
/// (e.g. "text_report", "satellite_image") with a degree of confidence.
///
/// A missing value is a valid state: the envelope records that the attribute
/// was considered but not observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertainProperty<T> {
    pub value: Option<T>,
    pub source: String,
    pub confidence: Confidence,
}

impl<T> Default for UncertainProperty<T> {
    fn default() -> Self {
        Self {
            value: None,
            source: "unknown".to_string(),
            confidence: Confidence::default(),
        }
    }
}

impl<T> UncertainProperty<T> {
    /// Observation reported by a named source with medium confidence.
    ///
    /// This is the default envelope the ingestor applies to case-report data.
    pub fn observed(value: T, source: &str) -> Self {
        Self {
            value: Some(value),
            source: source.to_string(),
            confidence: Confidence::Ordinal(ConfidenceLevel::Medium),
        }
    }

    /// Whether the property carries an actual value.
    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }
}

/// Population density observed either as a count-like number or a
/// categorical label ("sparse", "dense").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DensityValue {
    Count(f64),
    Label(String),
}

impl std::fmt::Display for DensityValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DensityValue::Count(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            DensityValue::Count(n) => write!(f, "{n}"),
            DensityValue::Label(s) => write!(f, "{s}"),
        }
    }
}

// ============================================================================
// Sub-aggregates
// ============================================================================

/// Core identity and timing of the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventIdentity {
    pub event_id: Option<String>,
    pub event_type: String,
    pub magnitude: Option<UncertainProperty<f64>>,
    /// Intensity on a macroseismic scale (e.g. MMI).
    pub intensity: Option<UncertainProperty<String>>,
    /// Free-text phase label, e.g. "immediate_impact", "early_response".
    pub phase: Option<String>,
    /// Absolute time of this situation report.
    pub timestamp: Option<DateTime<Utc>>,
    /// Relative time; drives the timeline binning logic.
    pub time_since_event_hours: Option<f64>,
}

impl Default for EventIdentity {
    fn default() -> Self {
        Self {
            event_id: None,
            event_type: "earthquake".to_string(),
            magnitude: None,
            intensity: None,
            phase: None,
            timestamp: None,
            time_since_event_hours: None,
        }
    }
}

/// Geographic and environmental setting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpatialContext {
    /// "urban", "rural", "mixed"
    pub region_type: Option<UncertainProperty<String>>,
    pub terrain: Option<UncertainProperty<String>>,
    /// Landslides, fires, tsunami warnings, ...
    pub secondary_hazards: Vec<UncertainProperty<String>>,
    pub location_description: Option<String>,
}

/// Population and vulnerability context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanExposure {
    pub population_density: Option<UncertainProperty<DensityValue>>,
    pub vulnerable_groups: Vec<UncertainProperty<String>>,
    /// e.g. "night", "rush_hour" - affects exposure
    pub time_of_day_context: Option<String>,
}

/// Infrastructure and building context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuiltEnvironment {
    pub dominant_building_types: Vec<UncertainProperty<String>>,
    pub construction_quality: Option<UncertainProperty<String>>,
    /// Status per system, e.g. {"hospitals": ..., "power": ...}
    pub critical_infrastructure_status: BTreeMap<String, UncertainProperty<String>>,
}

/// Observed physical damage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageIndicators {
    /// "none", "minor", "widespread"
    pub building_collapse_severity: Option<UncertainProperty<String>>,
    /// "clear", "blocked"
    pub access_disruption: Option<UncertainProperty<String>>,
    pub utility_failures: Vec<UncertainProperty<String>>,
    pub visible_hazards: Vec<UncertainProperty<String>>,
}

/// Interventions already underway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsTaken {
    pub rescue_operations: Option<UncertainProperty<String>>,
    pub evacuation_status: Option<UncertainProperty<String>>,
    pub medical_deployment: Option<UncertainProperty<String>>,
    pub logistics_coordination: Option<UncertainProperty<String>>,
}

impl ActionsTaken {
    pub fn is_empty(&self) -> bool {
        self.rescue_operations.is_none()
            && self.evacuation_status.is_none()
            && self.medical_deployment.is_none()
            && self.logistics_coordination.is_none()
    }
}

/// Known impacts, human and economic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outcomes {
    pub casualties: Option<UncertainProperty<i64>>,
    pub injuries: Option<UncertainProperty<i64>>,
    /// Number of displaced people.
    pub displacement: Option<UncertainProperty<i64>>,
    /// Qualitative or quantitative.
    pub economic_loss: Option<UncertainProperty<String>>,
}

impl Outcomes {
    pub fn is_empty(&self) -> bool {
        self.casualties.is_none()
            && self.injuries.is_none()
            && self.displacement.is_none()
            && self.economic_loss.is_none()
    }
}

// ============================================================================
// Canonical situation
// ============================================================================

/// Canonical representation of an earthquake situation at a specific time.
///
/// Acts as a semantic container for heterogeneous, uncertain, and partial
/// information. Built once by the ingestor and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthquakeSituation {
    pub record_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub event_identity: EventIdentity,
    pub spatial_context: SpatialContext,
    pub human_exposure: HumanExposure,
    pub built_environment: BuiltEnvironment,
    pub damage_indicators: DamageIndicators,
    pub actions_taken: ActionsTaken,
    pub outcomes: Outcomes,
}

impl Default for EarthquakeSituation {
    fn default() -> Self {
        Self {
            record_id: None,
            created_at: Utc::now(),
            event_identity: EventIdentity::default(),
            spatial_context: SpatialContext::default(),
            human_exposure: HumanExposure::default(),
            built_environment: BuiltEnvironment::default(),
            damage_indicators: DamageIndicators::default(),
            actions_taken: ActionsTaken::default(),
            outcomes: Outcomes::default(),
        }
    }
}

impl EarthquakeSituation {
    /// Render the outcome-free portion of the situation as text.
    ///
    /// This is the embedding input for stored experiences: the indexed vector
    /// must be derived solely from the situation, never from its outcomes.
    pub fn situation_text(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        let id = &self.event_identity;
        if let Some(mag) = id.magnitude.as_ref().and_then(|p| p.value) {
            lines.push(format!("Magnitude {mag}"));
        }
        if let Some(intensity) = id.intensity.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Intensity {intensity}"));
        }
        if let Some(phase) = &id.phase {
            lines.push(format!("Phase: {phase}"));
        }

        let sp = &self.spatial_context;
        if let Some(region) = sp.region_type.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Region: {region}"));
        }
        if let Some(terrain) = sp.terrain.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Terrain: {terrain}"));
        }
        let hazards = list_values(&sp.secondary_hazards);
        if !hazards.is_empty() {
            lines.push(format!("Secondary hazards: {}", hazards.join(", ")));
        }
        if let Some(loc) = &sp.location_description {
            lines.push(format!("Location: {loc}"));
        }

        let he = &self.human_exposure;
        if let Some(density) = he.population_density.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Population density: {density}"));
        }
        let groups = list_values(&he.vulnerable_groups);
        if !groups.is_empty() {
            lines.push(format!("Vulnerable groups: {}", groups.join(", ")));
        }

        let be = &self.built_environment;
        let buildings = list_values(&be.dominant_building_types);
        if !buildings.is_empty() {
            lines.push(format!("Building types: {}", buildings.join(", ")));
        }
        if let Some(quality) = be.construction_quality.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Construction quality: {quality}"));
        }

        let di = &self.damage_indicators;
        if let Some(collapse) = di
            .building_collapse_severity
            .as_ref()
            .and_then(|p| p.value.as_ref())
        {
            lines.push(format!("Collapse severity: {collapse}"));
        }
        if let Some(access) = di.access_disruption.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Access: {access}"));
        }
        let utilities = list_values(&di.utility_failures);
        if !utilities.is_empty() {
            lines.push(format!("Utility failures: {}", utilities.join(", ")));
        }
        let visible = list_values(&di.visible_hazards);
        if !visible.is_empty() {
            lines.push(format!("Visible hazards: {}", visible.join(", ")));
        }

        let at = &self.actions_taken;
        if let Some(rescue) = at.rescue_operations.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Rescue: {rescue}"));
        }
        if let Some(evac) = at.evacuation_status.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Evacuation: {evac}"));
        }
        if let Some(medical) = at.medical_deployment.as_ref().and_then(|p| p.value.as_ref()) {
            lines.push(format!("Medical: {medical}"));
        }
        if let Some(logistics) = at
            .logistics_coordination
            .as_ref()
            .and_then(|p| p.value.as_ref())
        {
            lines.push(format!("Logistics: {logistics}"));
        }

        lines.join("\n")
    }
}

fn list_values(props: &[UncertainProperty<String>]) -> Vec<&str> {
    props
        .iter()
        .filter_map(|p| p.value.as_deref())
        .collect()
}
