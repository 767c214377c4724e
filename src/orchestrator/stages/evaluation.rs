// src/orchestrator/stages/evaluation.rs
// Continue-or-complete judgment after each execution round

use anyhow::Result;
use tracing::debug;

use crate::orchestrator::context::StageContext;
use crate::orchestrator::parser::CONTINUATION_MARKER;
use crate::utils::truncate;

use super::RunState;

const RESULT_PREVIEW_CHARS: usize = 300;

pub(crate) struct EvalDecision {
    pub continue_loop: bool,
    /// Verbatim evaluation text, logged as the step content.
    pub content: String,
}

pub(crate) async fn run(ctx: &StageContext<'_>, state: &RunState) -> Result<EvalDecision> {
    let text = ctx.generate(build_prompt(ctx, state)).await?;
    let continue_loop = ctx.parser.wants_continuation(&text);
    debug!(
        "Evaluation decided: {}",
        if continue_loop { "continue" } else { "complete" }
    );
    Ok(EvalDecision {
        continue_loop,
        content: text,
    })
}

fn build_prompt(ctx: &StageContext<'_>, state: &RunState) -> String {
    let mut prompt = String::from(
        "## PROGRESS EVALUATION\n\nJudge whether enough information has been gathered to \
         answer the user, or whether more tool calls are needed.\n\n",
    );
    prompt.push_str(&format!("User request:\n{}\n", ctx.user_message));
    prompt.push_str(&format!("\nSteps recorded so far: {}\n", state.steps.len()));

    prompt.push_str("\nTool results so far:\n");
    if state.tool_calls.is_empty() {
        prompt.push_str("(none)\n");
    }
    for exec in &state.tool_calls {
        let summary = match (&exec.result.data, &exec.result.error) {
            (Some(data), _) => truncate(&data.to_string(), RESULT_PREVIEW_CHARS),
            (None, Some(error)) => format!("error: {}", truncate(error, RESULT_PREVIEW_CHARS)),
            (None, None) => "(empty)".to_string(),
        };
        prompt.push_str(&format!("- {}: {}\n", exec.tool, summary));
    }

    if !state.memory.is_empty() {
        prompt.push_str(&format!(
            "\nWorking notes:\n{}\n",
            truncate(&state.memory.transcript(), 800)
        ));
    }

    prompt.push_str(&format!(
        "\nReply with {marker} plus your reasoning if more information is genuinely needed, \
         or COMPLETE plus your reasoning if the request can be answered now.\n",
        marker = CONTINUATION_MARKER,
    ));
    prompt
}
