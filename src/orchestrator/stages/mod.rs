// src/orchestrator/stages/mod.rs
// The stage functions of the pipeline, one module each. All of them are
// pure over a shared StageContext plus the mutable RunState owned by the
// main loop.

pub(crate) mod analysis;
pub(crate) mod evaluation;
pub(crate) mod execution;
pub(crate) mod planning;
pub(crate) mod synthesis;
pub(crate) mod validation;

use super::types::{InternalConversation, StepLog, ToolExecution};

/// Mutable state accumulated over one orchestration call: the step log, the
/// tool log, and the internal working memory.
pub(crate) struct RunState {
    pub steps: StepLog,
    pub tool_calls: Vec<ToolExecution>,
    pub memory: InternalConversation,
    /// Verbatim analysis-stage output, grounding for later prompts.
    pub analysis: String,
}

impl RunState {
    pub fn new(user_message: &str) -> Self {
        let mut memory = InternalConversation::new();
        memory.push_user(user_message);
        Self {
            steps: StepLog::new(),
            tool_calls: Vec::new(),
            memory,
            analysis: String::new(),
        }
    }

    /// Digest of prior tool calls for planning prompts: name, outcome,
    /// duration. Never the full payload.
    pub fn tool_digest(&self) -> String {
        if self.tool_calls.is_empty() {
            return "(no tools executed yet)".to_string();
        }
        self.tool_calls
            .iter()
            .map(|exec| {
                let status = if exec.result.success { "ok" } else { "failed" };
                format!("- {}: {} ({} ms)", exec.tool, status, exec.duration_ms)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutcome;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_run_state_seeds_memory_with_user_message() {
        let state = RunState::new("show my meetings");
        assert_eq!(state.memory.turns().len(), 1);
        assert!(state.memory.transcript().contains("show my meetings"));
    }

    #[test]
    fn test_tool_digest_lists_outcomes() {
        let mut state = RunState::new("q");
        assert!(state.tool_digest().contains("no tools executed"));

        let now = Utc::now();
        state.tool_calls.push(ToolExecution::new(
            "calendar_list_events".into(),
            json!({}),
            ToolOutcome::ok(json!([])),
            now,
            now,
        ));
        state.tool_calls.push(ToolExecution::new(
            "search_documents".into(),
            json!({"query": "acme"}),
            ToolOutcome::fail("backend down"),
            now,
            now,
        ));

        let digest = state.tool_digest();
        assert!(digest.contains("calendar_list_events: ok"));
        assert!(digest.contains("search_documents: failed"));
    }
}
