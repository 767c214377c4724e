// src/orchestrator/context.rs
// Shared read-only view handed to every stage function

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use crate::config::KnowledgeConfig;
use crate::llm::{ChatMessage, CompletionProvider, GenerateRequest};
use crate::tools::ToolRegistry;

use super::parser::OutputParser;

pub(crate) struct StageContext<'a> {
    pub user_message: &'a str,
    pub chat_history: &'a [ChatMessage],
    pub registry: &'a dyn ToolRegistry,
    pub model: &'a str,
    pub validation_model: &'a str,
    pub attached_files: &'a [String],
    pub knowledge: &'a KnowledgeConfig,
    pub provider: &'a dyn CompletionProvider,
    pub parser: &'a dyn OutputParser,
    pub cancel: &'a CancellationToken,
}

impl StageContext<'_> {
    /// Checked before every suspension point; cancellation surfaces as a
    /// stage error and reaches the single top-level handler.
    pub fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            bail!("orchestration cancelled by caller");
        }
        Ok(())
    }

    /// One completion call with the orchestration model.
    pub async fn generate(&self, prompt: String) -> Result<String> {
        self.generate_with(self.model, prompt, None).await
    }

    /// One completion call with an explicit model and optional prior turns.
    pub async fn generate_with(
        &self,
        model: &str,
        prompt: String,
        messages: Option<Vec<ChatMessage>>,
    ) -> Result<String> {
        self.ensure_live()?;
        let mut request = GenerateRequest::new(model, prompt);
        request.options.messages = messages;
        let generated = self.provider.generate_text(&request).await?;
        Ok(generated.text)
    }
}
