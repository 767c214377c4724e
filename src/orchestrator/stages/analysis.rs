// src/orchestrator/stages/analysis.rs
// One-shot request analysis

use anyhow::Result;
use tracing::info;

use crate::orchestrator::context::StageContext;
use crate::orchestrator::prompts;
use crate::utils::truncate;

/// Single completion call producing the free-text plan. The result is used
/// verbatim as log content and as grounding for later stages; nothing is
/// parsed out of it.
pub(crate) async fn run(ctx: &StageContext<'_>) -> Result<String> {
    info!("Analysis stage: analyzing request");
    let prompt = build_prompt(ctx);
    ctx.generate(prompt).await
}

fn build_prompt(ctx: &StageContext<'_>) -> String {
    let catalog = prompts::tool_catalog(ctx.registry);
    let guidance = prompts::decision_guidance(ctx.registry);

    let mut prompt = String::from(
        "## TASK ANALYSIS\n\nYou are the analysis stage of a tool-using assistant. \
         Study the user request and plan how to fulfill it.\n\n",
    );
    prompt.push_str(&catalog);
    if !guidance.is_empty() {
        prompt.push('\n');
        prompt.push_str(&guidance);
    }

    if !ctx.chat_history.is_empty() {
        prompt.push_str("\nRecent conversation:\n");
        for msg in ctx.chat_history.iter().rev().take(6).rev() {
            prompt.push_str(&format!("{}: {}\n", msg.role, truncate(&msg.content, 200)));
        }
    }

    if !ctx.attached_files.is_empty() {
        prompt.push_str(&format!(
            "\nAttached files: {}\n",
            ctx.attached_files.join(", ")
        ));
    }

    prompt.push_str(&format!("\nUser request:\n{}\n", ctx.user_message));
    prompt.push_str(
        "\nWrite a concise analysis with exactly these five sections:\n\
         1. Request decomposition\n\
         2. Tool strategy\n\
         3. Information requirements\n\
         4. Approach plan\n\
         5. Complexity assessment\n",
    );
    prompt
}
