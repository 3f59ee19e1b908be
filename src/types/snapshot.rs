//! Narrative decision snapshots for the live advisory path
//!
//! A [`DecisionSnapshot`] is a linguistic flattening of one decision moment
//! inside a case study, extracted by the LLM. It deliberately carries no
//! numeric state: the live HTTP pipeline reasons by narrative analogy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A probabilistic, analogy-driven narrative snapshot of a decision moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionSnapshot {
    pub snapshot_id: String,
    pub case_study_id: String,
    pub source_id: String,

    /// Inferred linguistic time context, e.g. "immediate post-impact".
    pub inferred_time_window: String,
    /// e.g. "dense urban center, liquefaction prone"
    pub location_context: String,

    /// What was known / what was perceived at the moment of decision.
    pub decision_context: String,
    /// e.g. "casualty count unclear", "utility status unknown"
    pub uncertainties: Vec<String>,
    /// e.g. "aftershocks", "looting"
    pub risks_perceived: Vec<String>,

    pub actions_considered: Vec<String>,
    pub action_taken_narrative: String,
}

impl Default for DecisionSnapshot {
    fn default() -> Self {
        Self {
            snapshot_id: Uuid::new_v4().to_string(),
            case_study_id: "unknown".to_string(),
            source_id: "unknown".to_string(),
            inferred_time_window: "unknown".to_string(),
            location_context: String::new(),
            decision_context: String::new(),
            uncertainties: Vec::new(),
            risks_perceived: Vec::new(),
            actions_considered: Vec::new(),
            action_taken_narrative: String::new(),
        }
    }
}

impl DecisionSnapshot {
    /// The text to be embedded: context + uncertainty + decision dilemma.
    pub fn narrative_text(&self) -> String {
        format!(
            "Time: {}\nLocation: {}\nContext: {}\nUncertainties: {}\nRisks: {}\nAction Narrative: {}",
            self.inferred_time_window,
            self.location_context,
            self.decision_context,
            self.uncertainties.join(", "),
            self.risks_perceived.join(", "),
            self.action_taken_narrative,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrative_text_concatenates_fields() {
        let snap = DecisionSnapshot {
            inferred_time_window: "day 2 night".to_string(),
            location_context: "coastal town".to_string(),
            decision_context: "aftershock reports incoming".to_string(),
            uncertainties: vec!["casualty count unclear".to_string()],
            risks_perceived: vec!["aftershocks".to_string(), "looting".to_string()],
            action_taken_narrative: "staged evacuation of the waterfront".to_string(),
            ..DecisionSnapshot::default()
        };

        let text = snap.narrative_text();
        assert!(text.contains("Time: day 2 night"));
        assert!(text.contains("Risks: aftershocks, looting"));
        assert!(text.contains("Action Narrative: staged evacuation"));
    }

    #[test]
    fn default_generates_fresh_snapshot_ids() {
        let a = DecisionSnapshot::default();
        let b = DecisionSnapshot::default();
        assert_ne!(a.snapshot_id, b.snapshot_id);
        assert_eq!(a.case_study_id, "unknown");
    }
}
