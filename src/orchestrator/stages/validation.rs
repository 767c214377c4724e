// src/orchestrator/stages/validation.rs
// Format validation and answer refinement

use anyhow::Result;
use tracing::info;

use crate::orchestrator::context::StageContext;
use crate::orchestrator::parser::{ValidationVerdict, ACCEPTANCE_MARKER, REFINEMENT_MARKER};
use crate::utils::truncate;

use super::RunState;

const RESULT_CHARS: usize = 400;

/// Ask whether the candidate answer matches the user's intent and requested
/// format. Runs on the configured validation model.
pub(crate) async fn validate(
    ctx: &StageContext<'_>,
    candidate: &str,
) -> Result<ValidationVerdict> {
    let prompt = format!(
        "## FORMAT VALIDATION\n\nUser request:\n{request}\n\nCandidate answer:\n{candidate}\n\n\
         Does the candidate answer the request in the format the user asked for? Reply with \
         {accept} if it does, or {refine}: <short reason> if it does not.\n",
        request = ctx.user_message,
        candidate = candidate,
        accept = ACCEPTANCE_MARKER,
        refine = REFINEMENT_MARKER,
    );
    let text = ctx
        .generate_with(ctx.validation_model, prompt, None)
        .await?;
    Ok(ctx.parser.parse_validation(&text))
}

/// Rewrite the candidate using the rejection reason as a directive. Never
/// triggers new tool calls; only already-gathered data is available.
pub(crate) async fn refine(
    ctx: &StageContext<'_>,
    state: &RunState,
    candidate: &str,
    reason: &str,
) -> Result<String> {
    info!("Refinement stage: rewriting answer ({})", truncate(reason, 120));

    let mut prompt = format!(
        "## REFINEMENT\n\nThe previous answer was rejected: {reason}\n\n\
         User request:\n{request}\n\nPrevious answer:\n{candidate}\n",
        reason = reason,
        request = ctx.user_message,
        candidate = candidate,
    );

    prompt.push_str("\nAvailable data (no new tools may be called):\n");
    if state.tool_calls.is_empty() {
        prompt.push_str("(none)\n");
    }
    for exec in &state.tool_calls {
        match (&exec.result.data, &exec.result.error) {
            (Some(data), _) if exec.result.success => {
                prompt.push_str(&format!(
                    "- {}: {}\n",
                    exec.tool,
                    truncate(&data.to_string(), RESULT_CHARS)
                ));
            }
            (_, Some(error)) => {
                prompt.push_str(&format!("- {} FAILED: {}\n", exec.tool, truncate(error, RESULT_CHARS)));
            }
            _ => {}
        }
    }

    prompt.push_str("\nRewrite the answer so it addresses the rejection reason.\n");
    ctx.generate(prompt).await
}
