// src/orchestrator/stages/planning.rs
// Tool planning: one model call, one forced retry, then the deterministic
// fallback. Guarantees forward progress without unbounded LLM retries.

use anyhow::Result;
use serde_json::json;
use tracing::{info, warn};

use crate::orchestrator::context::StageContext;
use crate::orchestrator::parser::{PlannedCall, NO_TOOLS_SENTINEL, TOOL_BLOCK_LABEL};
use crate::orchestrator::progress::{ProgressEvent, ProgressSink};
use crate::orchestrator::prompts;
use crate::tools::ToolRegistry;
use crate::utils::truncate;

use super::RunState;

/// Tool name used when nothing better can be derived. Deliberately usable
/// even when no such tool is registered; the registry reports unknown tools
/// gracefully and the loop moves on.
pub(crate) const FALLBACK_CALENDAR_TOOL: &str = "calendar_list_events";

const CALENDAR_KEYWORDS: &[&str] = &[
    "meeting",
    "meetings",
    "schedule",
    "calendar",
    "event",
    "events",
    "appointment",
    "agenda",
    "availability",
    "tomorrow",
    "next week",
];

const RETRY_DIRECTIVE: &str = "Your previous answer proposed no tools. You MUST choose at least \
                               one tool from the catalog this time and emit the fenced tool_calls \
                               block.";

pub(crate) struct PlanningOutcome {
    pub calls: Vec<PlannedCall>,
    pub used_fallback: bool,
}

pub(crate) async fn run(
    ctx: &StageContext<'_>,
    state: &RunState,
    progress: &ProgressSink,
) -> Result<PlanningOutcome> {
    let text = ctx.generate(build_prompt(ctx, state, None)).await?;
    let mut calls = ctx.parser.parse_tool_calls(&text);

    if calls.is_empty() {
        warn!("Planning produced no tool calls, forcing one retry");
        progress.emit(ProgressEvent::PlanningRetry);
        let retry_text = ctx
            .generate(build_prompt(ctx, state, Some(RETRY_DIRECTIVE)))
            .await?;
        calls = ctx.parser.parse_tool_calls(&retry_text);
    }

    if calls.is_empty() {
        let call = fallback_call(ctx.user_message, ctx.registry);
        info!("Planning fallback selected tool: {}", call.name);
        progress.emit(ProgressEvent::FallbackSelected {
            tool: call.name.clone(),
        });
        return Ok(PlanningOutcome {
            calls: vec![call],
            used_fallback: true,
        });
    }

    Ok(PlanningOutcome {
        calls,
        used_fallback: false,
    })
}

fn build_prompt(ctx: &StageContext<'_>, state: &RunState, directive: Option<&str>) -> String {
    let mut prompt = String::from(
        "## TOOL PLANNING\n\nDecide which tools to call next to make progress on the request.\n\n",
    );

    prompt.push_str(&format!("User request:\n{}\n", ctx.user_message));
    if !state.analysis.is_empty() {
        prompt.push_str(&format!("\nAnalysis so far:\n{}\n", truncate(&state.analysis, 600)));
    }
    prompt.push_str(&format!("\nTool calls so far:\n{}\n", state.tool_digest()));
    prompt.push_str(&format!(
        "\nCompleted step ids: {:?}\n",
        state.steps.ids()
    ));
    if !ctx.attached_files.is_empty() {
        prompt.push_str(&format!(
            "Attached files: {}\n",
            ctx.attached_files.join(", ")
        ));
    }
    if !state.memory.is_empty() {
        prompt.push_str(&format!(
            "\nWorking notes:\n{}\n",
            truncate(&state.memory.transcript(), 800)
        ));
    }

    prompt.push('\n');
    prompt.push_str(&prompts::tool_catalog(ctx.registry));

    prompt.push_str(&format!(
        "\nAnswer with a fenced block labeled `{label}` containing a JSON array of \
         {{\"name\", \"parameters\"}} objects, for example:\n\
         ```{label}\n\
         [{{\"name\": \"calendar_list_events\", \"parameters\": {{\"range\": \"next_week\"}}}}]\n\
         ```\n\
         If no further tools are needed, answer with exactly {sentinel}.\n",
        label = TOOL_BLOCK_LABEL,
        sentinel = NO_TOOLS_SENTINEL,
    ));

    if let Some(directive) = directive {
        prompt.push_str(&format!("\nIMPORTANT: {}\n", directive));
    }
    prompt
}

// ============================================================================
// Deterministic fallback
// ============================================================================

fn is_calendar_request(message: &str) -> bool {
    let lower = message.to_lowercase();
    CALENDAR_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Best registered calendar-listing tool, or the well-known default name if
/// the category is empty.
fn calendar_listing_call(registry: &dyn ToolRegistry) -> PlannedCall {
    let calendar_tools = registry.tools_by_category("calendar");
    let name = calendar_tools
        .iter()
        .find(|t| t.name.contains("list"))
        .or_else(|| calendar_tools.first())
        .map(|t| t.name.clone())
        .unwrap_or_else(|| FALLBACK_CALENDAR_TOOL.to_string());
    PlannedCall::new(name, json!({}))
}

/// A registered knowledge/document-search tool, queried with the raw user
/// message.
fn knowledge_search_call(registry: &dyn ToolRegistry, message: &str) -> Option<PlannedCall> {
    registry
        .available_tools()
        .into_iter()
        .find(|t| {
            t.category == "knowledge" || t.category == "documents" || t.name.contains("search")
        })
        .map(|t| PlannedCall::new(t.name, json!({ "query": message })))
}

pub(crate) fn fallback_call(message: &str, registry: &dyn ToolRegistry) -> PlannedCall {
    if is_calendar_request(message) {
        return calendar_listing_call(registry);
    }
    if let Some(call) = knowledge_search_call(registry, message) {
        return call;
    }
    calendar_listing_call(registry)
}
