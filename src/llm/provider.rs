// src/llm/provider.rs
// Provider contract and credential routing

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CONFIG;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("missing {provider} credential: set {env_var}")]
    MissingCredential {
        provider: &'static str,
        env_var: &'static str,
    },
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} returned no text output")]
    EmptyOutput { provider: &'static str },
}

// ============================================================================
// Request / response types
// ============================================================================

/// One turn of caller-supplied chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Optional knobs for a generate-text call.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    /// Prior turns to send ahead of the prompt (the prompt is always the
    /// final user message).
    pub messages: Option<Vec<ChatMessage>>,
    /// Image URLs or data URIs attached to the final user message.
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            options: GenerateOptions::default(),
        }
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.options.messages = Some(messages);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
}

/// Uniform async text-generation contract. The orchestrator only ever sees
/// this trait; the HTTP implementation lives in `client.rs` and tests drive
/// the engine with scripted in-memory implementations.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn generate_text(&self, request: &GenerateRequest) -> Result<Generated>;
}

// ============================================================================
// Routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Primary,
    OpenRouter,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Primary => "openai",
            ProviderKind::OpenRouter => "openrouter",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
}

/// Chooses credentials and endpoint per requested model identifier.
///
/// Namespaced model ids ("vendor/model") route to the OpenRouter-style
/// alternate endpoint, everything else to the primary. Resolution happens
/// before any network call, so a missing credential fails fast.
#[derive(Debug, Clone)]
pub struct ProviderResolver {
    primary_base_url: String,
    primary_api_key: Option<String>,
    openrouter_base_url: String,
    openrouter_api_key: Option<String>,
}

impl ProviderResolver {
    pub fn from_env() -> Self {
        Self {
            primary_base_url: CONFIG.openai_base_url.clone(),
            primary_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openrouter_base_url: CONFIG.openrouter_base_url.clone(),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
        }
    }

    pub fn new(
        primary_base_url: String,
        primary_api_key: Option<String>,
        openrouter_base_url: String,
        openrouter_api_key: Option<String>,
    ) -> Self {
        Self {
            primary_base_url,
            primary_api_key,
            openrouter_base_url,
            openrouter_api_key,
        }
    }

    pub fn resolve(&self, model: &str) -> Result<ResolvedProvider, ProviderError> {
        if model.contains('/') {
            let api_key =
                self.openrouter_api_key
                    .clone()
                    .ok_or(ProviderError::MissingCredential {
                        provider: "openrouter",
                        env_var: "OPENROUTER_API_KEY",
                    })?;
            Ok(ResolvedProvider {
                kind: ProviderKind::OpenRouter,
                base_url: self.openrouter_base_url.clone(),
                api_key,
            })
        } else {
            let api_key = self
                .primary_api_key
                .clone()
                .ok_or(ProviderError::MissingCredential {
                    provider: "openai",
                    env_var: "OPENAI_API_KEY",
                })?;
            Ok(ResolvedProvider {
                kind: ProviderKind::Primary,
                base_url: self.primary_base_url.clone(),
                api_key,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(primary: Option<&str>, openrouter: Option<&str>) -> ProviderResolver {
        ProviderResolver::new(
            "https://api.openai.com".to_string(),
            primary.map(String::from),
            "https://openrouter.ai/api".to_string(),
            openrouter.map(String::from),
        )
    }

    #[test]
    fn test_plain_model_routes_to_primary() {
        let resolved = resolver(Some("sk-a"), None).resolve("gpt-4o").unwrap();
        assert_eq!(resolved.kind, ProviderKind::Primary);
        assert_eq!(resolved.api_key, "sk-a");
    }

    #[test]
    fn test_namespaced_model_routes_to_openrouter() {
        let resolved = resolver(Some("sk-a"), Some("or-b"))
            .resolve("anthropic/claude-3.5-sonnet")
            .unwrap();
        assert_eq!(resolved.kind, ProviderKind::OpenRouter);
        assert_eq!(resolved.api_key, "or-b");
    }

    #[test]
    fn test_missing_openrouter_credential_is_fatal() {
        let err = resolver(Some("sk-a"), None)
            .resolve("meta/llama-3")
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { provider: "openrouter", .. }));
    }

    #[test]
    fn test_missing_primary_credential_is_fatal() {
        let err = resolver(None, Some("or-b")).resolve("gpt-4o").unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential { provider: "openai", .. }));
    }
}
