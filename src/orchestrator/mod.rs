// src/orchestrator/mod.rs
// Main orchestration loop
//
// INIT -> ANALYSIS -> {PLAN -> EXECUTE -> EVALUATE}* -> SYNTHESIZE ->
// {VALIDATE -> REFINE}* -> DONE, with FAILED reachable from any state via
// the single top-level handler. The step and tool budgets are hard circuit
// breakers independent of model behavior.

mod context;
pub mod parser;
pub mod progress;
pub mod prompts;
mod stages;
pub mod types;

pub use parser::{MarkerParser, OutputParser, PlannedCall, ValidationVerdict};
pub use progress::{ProgressCallback, ProgressEvent};
pub use types::{
    ChatMessage, OrchestrationResult, OrchestrationStep, OrchestratorConfig, StepType,
    ToolExecution,
};

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::KnowledgeConfig;
use crate::llm::CompletionProvider;
use crate::tools::ToolRegistry;
use crate::utils::truncate;

use context::StageContext;
use progress::ProgressSink;
use stages::RunState;
use types::StepLog;

/// Fixed user-facing apology on hard failure; the real error rides in
/// `OrchestrationResult.error` for diagnostics.
pub const FAILURE_MESSAGE: &str =
    "I'm sorry - I ran into a problem while working on your request. Please try again in a moment.";

const MAX_VALIDATION_ROUNDS: usize = 3;

pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    parser: Arc<dyn OutputParser>,
    knowledge: KnowledgeConfig,
    progress: ProgressSink,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn CompletionProvider>, knowledge: KnowledgeConfig) -> Self {
        Self {
            provider,
            parser: Arc::new(MarkerParser),
            knowledge,
            progress: ProgressSink::default(),
        }
    }

    /// Swap in a different output parser (e.g. a structured-output one).
    pub fn with_parser(mut self, parser: Arc<dyn OutputParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Install or clear the milestone callback. Scoped to this orchestrator
    /// instance; reset it between unrelated requests.
    pub fn set_progress_callback(&mut self, callback: Option<ProgressCallback>) {
        self.progress.set(callback);
    }

    /// Run one orchestration. Never rejects: every failure path resolves to
    /// a result with `success: false`.
    pub async fn orchestrate(
        &self,
        user_message: &str,
        chat_history: &[ChatMessage],
        registry: &dyn ToolRegistry,
        model: &str,
        config: &OrchestratorConfig,
        attached_files: &[String],
    ) -> OrchestrationResult {
        self.orchestrate_with_cancel(
            user_message,
            chat_history,
            registry,
            model,
            config,
            attached_files,
            CancellationToken::new(),
        )
        .await
    }

    /// Like `orchestrate`, with a caller-owned cancellation signal checked
    /// before every suspension point.
    #[allow(clippy::too_many_arguments)]
    pub async fn orchestrate_with_cancel(
        &self,
        user_message: &str,
        chat_history: &[ChatMessage],
        registry: &dyn ToolRegistry,
        model: &str,
        config: &OrchestratorConfig,
        attached_files: &[String],
        cancel: CancellationToken,
    ) -> OrchestrationResult {
        let validation_model = config.validation_model.as_deref().unwrap_or(model);
        let ctx = StageContext {
            user_message,
            chat_history,
            registry,
            model,
            validation_model,
            attached_files,
            knowledge: &self.knowledge,
            provider: self.provider.as_ref(),
            parser: self.parser.as_ref(),
            cancel: &cancel,
        };

        let mut state = RunState::new(user_message);
        match self.run(&ctx, config, &mut state).await {
            Ok(final_answer) => OrchestrationResult {
                success: true,
                final_answer,
                steps: retained_steps(config, state.steps),
                tool_calls: state.tool_calls,
                error: None,
                file_processing_used: !attached_files.is_empty(),
            },
            Err(e) => {
                error!("Orchestration failed: {:#}", e);
                self.progress.emit(ProgressEvent::Failed {
                    message: e.to_string(),
                });
                OrchestrationResult {
                    success: false,
                    final_answer: FAILURE_MESSAGE.to_string(),
                    steps: retained_steps(config, state.steps),
                    tool_calls: state.tool_calls,
                    error: Some(format!("{:#}", e)),
                    file_processing_used: !attached_files.is_empty(),
                }
            }
        }
    }

    async fn run(
        &self,
        ctx: &StageContext<'_>,
        config: &OrchestratorConfig,
        state: &mut RunState,
    ) -> Result<String> {
        // ANALYSIS: once, result used verbatim
        let analysis = stages::analysis::run(ctx).await?;
        state
            .steps
            .record(StepType::Analysis, analysis.clone(), None, None);
        state.memory.push_assistant(truncate(&analysis, 300));
        state.analysis = analysis;
        self.progress.emit(ProgressEvent::AnalysisCompleted);

        // {PLAN -> EXECUTE -> EVALUATE}* under both budgets
        let mut rounds = 0usize;
        while state.steps.len() < config.max_steps
            && state.tool_calls.len() < config.max_tool_calls
        {
            let plan = stages::planning::run(ctx, state, &self.progress).await?;
            if plan.used_fallback {
                info!("Planning fell back to deterministic tool selection");
            }
            stages::execution::run(ctx, plan.calls, state, config, &self.progress).await?;
            rounds += 1;

            if state.steps.len() >= config.max_steps {
                info!("Step budget reached after execution, moving to synthesis");
                break;
            }

            let decision = stages::evaluation::run(ctx, state).await?;
            let continue_loop = decision.continue_loop;
            state
                .steps
                .record(StepType::Evaluation, decision.content, None, None);
            if !continue_loop {
                break;
            }
        }
        self.progress.emit(ProgressEvent::RoundsCompleted {
            rounds,
            tool_calls: state.tool_calls.len(),
        });

        // SYNTHESIZE
        let mut answer = stages::synthesis::run(ctx, state).await?;
        state
            .steps
            .record(StepType::Synthesis, answer.clone(), None, None);
        self.progress.emit(ProgressEvent::SynthesisCompleted);

        // {VALIDATE -> REFINE}*, bounded; after the cap the last answer is
        // returned unconditionally
        for round in 1..=MAX_VALIDATION_ROUNDS {
            match stages::validation::validate(ctx, &answer).await? {
                ValidationVerdict::Accepted => {
                    self.progress.emit(ProgressEvent::ValidationRound {
                        round,
                        accepted: true,
                    });
                    break;
                }
                ValidationVerdict::NeedsRefinement(reason) => {
                    self.progress.emit(ProgressEvent::ValidationRound {
                        round,
                        accepted: false,
                    });
                    answer = stages::validation::refine(ctx, state, &answer, &reason).await?;
                    state.steps.record(
                        StepType::Synthesis,
                        answer.clone(),
                        None,
                        Some(reason),
                    );
                }
            }
        }

        Ok(answer)
    }
}

/// Development mode keeps the whole log; otherwise only synthesis steps are
/// retained in the result.
fn retained_steps(config: &OrchestratorConfig, steps: StepLog) -> Vec<OrchestrationStep> {
    let steps = steps.into_steps();
    if config.development_mode {
        steps
    } else {
        steps
            .into_iter()
            .filter(|s| s.step_type == StepType::Synthesis)
            .collect()
    }
}
