// src/orchestrator/types.rs
// Data model for one orchestration call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolOutcome;

pub use crate::llm::ChatMessage;

// ============================================================================
// Step log
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Analysis,
    ToolCall,
    Evaluation,
    Synthesis,
}

/// One atomic record in the append-only orchestration log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationStep {
    pub id: u64,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_execution: Option<ToolExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Append-only step log. Ids are strictly increasing and timestamps are
/// clamped to be non-decreasing even if the wall clock steps backwards.
#[derive(Debug, Default)]
pub struct StepLog {
    steps: Vec<OrchestrationStep>,
    next_id: u64,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        step_type: StepType,
        content: String,
        tool_execution: Option<ToolExecution>,
        reasoning: Option<String>,
    ) -> &OrchestrationStep {
        let mut timestamp = Utc::now();
        if let Some(last) = self.steps.last() {
            if last.timestamp > timestamp {
                timestamp = last.timestamp;
            }
        }

        self.next_id += 1;
        self.steps.push(OrchestrationStep {
            id: self.next_id,
            step_type,
            timestamp,
            content,
            tool_execution,
            reasoning,
        });
        self.steps.last().expect("just pushed")
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.steps.iter().map(|s| s.id).collect()
    }

    pub fn steps(&self) -> &[OrchestrationStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<OrchestrationStep> {
        self.steps
    }
}

// ============================================================================
// Tool executions
// ============================================================================

/// Immutable record of one tool invocation, success or failure alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecution {
    pub tool: String,
    pub parameters: Value,
    pub result: ToolOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ToolExecution {
    pub fn new(
        tool: String,
        parameters: Value,
        result: ToolOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let duration_ms = (finished_at - started_at).num_milliseconds();
        Self {
            tool,
            parameters,
            result,
            started_at,
            finished_at,
            duration_ms,
        }
    }
}

// ============================================================================
// Configuration and result
// ============================================================================

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Hard cap on steps recorded by the planning/execution/evaluation loop.
    pub max_steps: usize,
    /// Hard cap on tool executions across the whole call.
    pub max_tool_calls: usize,
    /// Retain the full step log in the result instead of synthesis steps only.
    pub development_mode: bool,
    /// Model used for the format-validation calls; `None` uses the
    /// orchestration model.
    pub validation_model: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_tool_calls: 5,
            development_mode: false,
            validation_model: None,
        }
    }
}

/// The one immutable object returned by `orchestrate()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub success: bool,
    pub final_answer: String,
    pub steps: Vec<OrchestrationStep>,
    pub tool_calls: Vec<ToolExecution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub file_processing_used: bool,
}

// ============================================================================
// Internal working memory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Compact working memory carried between stages. Distinct from the
/// caller-supplied chat history: it holds short reasoning notes, never full
/// tool payloads, so prompt growth stays bounded.
#[derive(Debug, Default)]
pub struct InternalConversation {
    turns: Vec<ConversationTurn>,
}

impl InternalConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: TurnRole::User,
            content: content.into(),
        });
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role: TurnRole::Assistant,
            content: content.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Render as a plain transcript for embedding into stage prompts.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_ids_strictly_increase() {
        let mut log = StepLog::new();
        log.record(StepType::Analysis, "a".into(), None, None);
        log.record(StepType::Evaluation, "b".into(), None, None);
        log.record(StepType::Synthesis, "c".into(), None, None);

        let ids = log.ids();
        assert_eq!(ids.len(), 3);
        assert!(ids.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_step_timestamps_non_decreasing() {
        let mut log = StepLog::new();
        for i in 0..20 {
            log.record(StepType::Evaluation, format!("step {}", i), None, None);
        }
        let steps = log.steps();
        assert!(steps.windows(2).all(|w| w[1].timestamp >= w[0].timestamp));
    }

    #[test]
    fn test_tool_execution_duration() {
        let started = Utc::now();
        let finished = started + chrono::Duration::milliseconds(125);
        let exec = ToolExecution::new(
            "calendar_list_events".into(),
            json!({}),
            ToolOutcome::ok(json!([])),
            started,
            finished,
        );
        assert_eq!(exec.duration_ms, 125);
    }

    #[test]
    fn test_config_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.max_tool_calls, 5);
        assert!(!config.development_mode);
        assert!(config.validation_model.is_none());
    }

    #[test]
    fn test_internal_conversation_transcript() {
        let mut memory = InternalConversation::new();
        memory.push_user("show my meetings");
        memory.push_assistant("calendar_list_events succeeded");

        let transcript = memory.transcript();
        assert!(transcript.starts_with("user: show my meetings"));
        assert!(transcript.contains("assistant: calendar_list_events succeeded"));
    }

    #[test]
    fn test_step_type_serializes_snake_case() {
        let v = serde_json::to_value(StepType::ToolCall).unwrap();
        assert_eq!(v, json!("tool_call"));
    }
}
