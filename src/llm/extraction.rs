//! Narrative snapshot extraction
//!
//! Builds the extraction prompt for raw case text and parses the model's
//! JSON reply into decision snapshots. A malformed reply recovers to an
//! empty list with a diagnostic log; nothing is stored in that case.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error};

use crate::config::EXTRACTION_TEXT_LIMIT;
use crate::types::DecisionSnapshot;

pub const EXTRACTION_SYSTEM_PROMPT: &str =
    "You are an expert disaster analyst. Output valid JSON only.";

/// Prompt asking the model for discrete decision snapshots, explicitly
/// excluding future knowledge and outcomes.
pub fn build_extraction_prompt(case_text: &str) -> String {
    let truncated: String = case_text.chars().take(EXTRACTION_TEXT_LIMIT).collect();
    format!(
        "Analyze the following disaster case study text.\n\
         Extract discrete 'Decision Snapshots' - moments where key decisions were made or considered.\n\
         Capture the uncertainty and context of that specific moment.\n\
         Do NOT include future knowledge or outcomes.\n\
         \n\
         Text:\n{truncated}\n\
         \n\
         RETURN JSON ONLY. Do not write introductory text.\n\
         Return a JSON list of objects with fields:\n\
         inferred_time_window, location_context, decision_context, uncertainties, \
         risks_perceived, actions_considered, action_taken_narrative."
    )
}

/// Partial snapshot shape as produced by the model; identity fields are
/// filled in from the ingest request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSnapshot {
    inferred_time_window: Option<String>,
    location_context: Option<String>,
    decision_context: Option<String>,
    uncertainties: Vec<String>,
    risks_perceived: Vec<String>,
    actions_considered: Vec<String>,
    action_taken_narrative: Option<String>,
}

/// Parse the model reply into snapshots, tolerating markdown fences.
///
/// Unparseable JSON is the one sanctioned recovery point of this path:
/// it returns an empty list and logs the raw reply.
pub fn parse_snapshots(response: &str, case_id: &str, source_id: &str) -> Vec<DecisionSnapshot> {
    let cleaned = strip_fences(response);

    let raw: Vec<RawSnapshot> = match serde_json::from_str(&cleaned) {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "Failed to parse snapshot extraction reply");
            debug!(raw = response, "Raw extraction reply");
            return Vec::new();
        }
    };

    raw.into_iter()
        .map(|item| DecisionSnapshot {
            case_study_id: case_id.to_string(),
            source_id: source_id.to_string(),
            inferred_time_window: item
                .inferred_time_window
                .unwrap_or_else(|| "unknown".to_string()),
            location_context: item.location_context.unwrap_or_default(),
            decision_context: item.decision_context.unwrap_or_default(),
            uncertainties: item.uncertainties,
            risks_perceived: item.risks_perceived,
            actions_considered: item.actions_considered,
            action_taken_narrative: item.action_taken_narrative.unwrap_or_default(),
            ..DecisionSnapshot::default()
        })
        .collect()
}

/// Models occasionally wrap JSON in ```json fences despite instructions.
fn strip_fences(response: &str) -> String {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)]
    let fence = FENCE.get_or_init(|| Regex::new(r"```(?:json)?").unwrap());
    fence.replace_all(response, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_json_array() {
        let reply = r#"[{"inferred_time_window": "day 2", "risks_perceived": ["fire"]}]"#;
        let snaps = parse_snapshots(reply, "case-1", "report.pdf");
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].case_study_id, "case-1");
        assert_eq!(snaps[0].source_id, "report.pdf");
        assert_eq!(snaps[0].inferred_time_window, "day 2");
        assert_eq!(snaps[0].risks_perceived, vec!["fire"]);
    }

    #[test]
    fn strips_markdown_fences() {
        let reply = "```json\n[{\"decision_context\": \"bridge out\"}]\n```";
        let snaps = parse_snapshots(reply, "c", "s");
        assert_eq!(snaps.len(), 1);
        assert_eq!(snaps[0].decision_context, "bridge out");
    }

    #[test]
    fn malformed_reply_recovers_to_empty_list() {
        let snaps = parse_snapshots("Sure! Here are the snapshots you asked for:", "c", "s");
        assert!(snaps.is_empty());

        let snaps = parse_snapshots("{\"not\": \"an array\"}", "c", "s");
        assert!(snaps.is_empty());
    }

    #[test]
    fn prompt_truncates_long_case_text() {
        let long_text = "x".repeat(EXTRACTION_TEXT_LIMIT * 2);
        let prompt = build_extraction_prompt(&long_text);
        assert!(prompt.len() < EXTRACTION_TEXT_LIMIT + 600);
        assert!(prompt.contains("Do NOT include future knowledge"));
    }
}
