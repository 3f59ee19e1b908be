//! Advisory paragraph generation
//!
//! Builds the decision-support prompt from the current narrative and the
//! retrieved snapshots. The instructions pin the model to comparative,
//! non-causal phrasing.

use crate::types::DecisionSnapshot;

/// Prompt comparing the current narrative with retrieved decision moments.
pub fn build_support_prompt(current_narrative: &str, snapshots: &[DecisionSnapshot]) -> String {
    let mut snapshots_text = String::new();
    for snap in snapshots {
        snapshots_text.push_str(&format!(
            "---\nCase: {} (Window: {})\nContext: {}\nAction Taken: {}\nRisks: {}\n---\n",
            snap.case_study_id,
            snap.inferred_time_window,
            snap.decision_context,
            snap.action_taken_narrative,
            snap.risks_perceived.join(", "),
        ));
    }

    format!(
        "You are an intelligent decision support assistant.\n\
         \n\
         Current Situation:\n{current_narrative}\n\
         \n\
         Relevant Historical Decision Snapshots:\n{snapshots_text}\n\
         Task:\n\
         1. Compare the current situation to these historical moments.\n\
         2. Identify common risk patterns.\n\
         3. Surface historically effective interventions mentioned in these snapshots.\n\
         4. Explicitly state uncertainty.\n\
         \n\
         Do NOT predict the future. Do NOT claim causality. Use phrases like \
         \"In similar cases...\", \"Historical patterns suggest...\".\n\
         Provide a cohesive narrative analysis in plain text."
    )
}
