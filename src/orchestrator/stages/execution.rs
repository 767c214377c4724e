// src/orchestrator/stages/execution.rs
// Sequential tool execution against the shared budget

use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::orchestrator::context::StageContext;
use crate::orchestrator::parser::PlannedCall;
use crate::orchestrator::progress::{ProgressEvent, ProgressSink};
use crate::orchestrator::types::{OrchestratorConfig, StepType, ToolExecution};
use crate::utils::truncate;

use super::RunState;

/// Execute planned calls one at a time, in proposal order. Each execution is
/// recorded whether it succeeded or failed; only an error escaping the
/// registry itself aborts the orchestration.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    calls: Vec<PlannedCall>,
    state: &mut RunState,
    config: &OrchestratorConfig,
    progress: &ProgressSink,
) -> Result<()> {
    for call in calls {
        if state.tool_calls.len() >= config.max_tool_calls {
            warn!(
                "Tool budget ({}) exhausted, dropping remaining planned calls",
                config.max_tool_calls
            );
            break;
        }
        if state.steps.len() >= config.max_steps {
            warn!("Step budget ({}) exhausted, dropping remaining planned calls", config.max_steps);
            break;
        }
        ctx.ensure_live()?;

        let parameters = inject_context_parameters(ctx, &call);
        info!("Executing tool: {}", call.name);
        progress.emit(ProgressEvent::ToolStarted {
            tool: call.name.clone(),
        });

        let started_at = Utc::now();
        let outcome = ctx.registry.execute_tool(&call.name, parameters.clone()).await?;
        let finished_at = Utc::now();

        let execution = ToolExecution::new(
            call.name.clone(),
            parameters,
            outcome,
            started_at,
            finished_at,
        );

        // Short note only; full payloads never enter working memory
        let note = match (execution.result.success, &execution.result.error) {
            (true, _) => format!("{} succeeded ({} ms)", execution.tool, execution.duration_ms),
            (false, Some(error)) => {
                format!("{} failed: {}", execution.tool, truncate(error, 200))
            }
            (false, None) => format!("{} failed", execution.tool),
        };
        state.memory.push_assistant(note.clone());
        state
            .steps
            .record(StepType::ToolCall, note, Some(execution.clone()), None);
        state.tool_calls.push(execution);
    }
    Ok(())
}

/// Auto-inject contextual parameters the model is not expected to know.
/// Today that is the knowledge-store identifier list for search tools; the
/// model-supplied value wins if one is already present.
fn inject_context_parameters(ctx: &StageContext<'_>, call: &PlannedCall) -> Value {
    let mut parameters = call.parameters.clone();

    if is_knowledge_search(call) {
        if let Value::Object(map) = &mut parameters {
            map.entry("vector_store_ids".to_string())
                .or_insert_with(|| serde_json::json!(ctx.knowledge.vector_store_ids));
        }
    }
    parameters
}

fn is_knowledge_search(call: &PlannedCall) -> bool {
    call.name.contains("search") || call.name.contains("knowledge")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_knowledge_search() {
        assert!(is_knowledge_search(&PlannedCall::new("search_documents", json!({}))));
        assert!(is_knowledge_search(&PlannedCall::new("knowledge_lookup", json!({}))));
        assert!(!is_knowledge_search(&PlannedCall::new("calendar_list_events", json!({}))));
    }
}
