// src/orchestrator/stages/synthesis.rs
// Final answer composition from gathered tool results

use anyhow::Result;
use tracing::info;

use crate::orchestrator::context::StageContext;
use crate::utils::truncate;

use super::RunState;

const RESULT_CHARS: usize = 600;

/// One completion call. The caller-supplied chat history rides along for
/// tone only; the facts come from the tool results gathered this call.
pub(crate) async fn run(ctx: &StageContext<'_>, state: &RunState) -> Result<String> {
    info!(
        "Synthesis stage: composing answer from {} tool result(s)",
        state.tool_calls.len()
    );
    let prompt = build_prompt(ctx, state);
    let history = if ctx.chat_history.is_empty() {
        None
    } else {
        Some(ctx.chat_history.to_vec())
    };
    ctx.generate_with(ctx.model, prompt, history).await
}

fn build_prompt(ctx: &StageContext<'_>, state: &RunState) -> String {
    let mut prompt = String::from(
        "## FINAL RESPONSE\n\nCompose the answer to the user from the gathered information.\n\n",
    );
    prompt.push_str(&format!("User request:\n{}\n", ctx.user_message));

    prompt.push_str("\nGathered tool results:\n");
    if state.tool_calls.is_empty() {
        prompt.push_str("(no tool results are available)\n");
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
                prompt.push_str(&format!(
                    "- {} FAILED: {}\n",
                    exec.tool,
                    truncate(error, RESULT_CHARS)
                ));
            }
            _ => prompt.push_str(&format!("- {}: (no data)\n", exec.tool)),
        }
    }

    prompt.push_str(
        "\nAnswer the user directly and completely. Ground every claim in the tool results \
         above. If some data could not be retrieved, say so plainly and answer with what is \
         available instead of inventing facts.\n",
    );
    prompt
}
