// src/llm/client.rs
// HTTP completion client (Chat Completions wire format)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::CONFIG;

use super::provider::{
    CompletionProvider, Generated, GenerateRequest, ProviderError, ProviderResolver,
    ResolvedProvider,
};

pub struct HttpCompletionProvider {
    client: ReqwestClient,
    resolver: ProviderResolver,
    max_output_tokens: usize,
    max_retries: usize,
    retry_delay_ms: u64,
}

impl HttpCompletionProvider {
    pub fn new() -> Result<Arc<Self>> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(CONFIG.request_timeout))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Arc::new(Self {
            client,
            resolver: ProviderResolver::from_env(),
            max_output_tokens: CONFIG.max_output_tokens,
            max_retries: CONFIG.api_max_retries,
            retry_delay_ms: CONFIG.api_retry_delay_ms,
        }))
    }

    /// Construct with an explicit resolver (tests, custom deployments).
    pub fn with_resolver(resolver: ProviderResolver) -> Result<Arc<Self>> {
        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(CONFIG.request_timeout))
            .build()?;

        Ok(Arc::new(Self {
            client,
            resolver,
            max_output_tokens: CONFIG.max_output_tokens,
            max_retries: CONFIG.api_max_retries,
            retry_delay_ms: CONFIG.api_retry_delay_ms,
        }))
    }

    /// Chat Completions request body. The prompt is always the final user
    /// message; prior turns and image attachments come from the options.
    fn build_request_body(request: &GenerateRequest, max_output_tokens: usize) -> Value {
        let mut messages: Vec<Value> = Vec::new();

        if let Some(history) = &request.options.messages {
            for msg in history {
                messages.push(json!({
                    "role": msg.role,
                    "content": msg.content,
                }));
            }
        }

        let user_message = match &request.options.images {
            Some(images) if !images.is_empty() => {
                let mut parts = vec![json!({"type": "text", "text": request.prompt})];
                for url in images {
                    parts.push(json!({"type": "image_url", "image_url": {"url": url}}));
                }
                json!({"role": "user", "content": parts})
            }
            _ => json!({"role": "user", "content": request.prompt}),
        };
        messages.push(user_message);

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": max_output_tokens,
        });
        if let Some(temperature) = request.options.temperature {
            body["temperature"] = json!(temperature);
        }
        body
    }

    fn extract_text(response: &Value) -> Option<String> {
        response
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()
            .map(str::to_string)
    }

    async fn post_with_retry(&self, provider: &ResolvedProvider, body: &Value) -> Result<Value> {
        let mut retry_count = 0;
        let mut retry_delay = Duration::from_millis(self.retry_delay_ms);

        loop {
            match self.post_internal(provider, body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let error_str = e.to_string();

                    let is_retryable = error_str.contains("429")
                        || error_str.contains("500")
                        || error_str.contains("502")
                        || error_str.contains("503")
                        || error_str.contains("504");

                    if is_retryable && retry_count < self.max_retries {
                        retry_count += 1;
                        warn!(
                            "Completion request failed (attempt {}/{}), retrying in {:?}: {}",
                            retry_count, self.max_retries, retry_delay, error_str
                        );

                        tokio::time::sleep(retry_delay).await;

                        retry_delay = Duration::from_millis(
                            (retry_delay.as_millis() as u64 * 2).min(10000),
                        );
                    } else {
                        error!("Completion request failed after {} attempts: {}", retry_count, error_str);
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn post_internal(&self, provider: &ResolvedProvider, body: &Value) -> Result<Value> {
        let url = format!("{}/v1/chat/completions", provider.base_url);
        debug!("Making completion request to: {}", url);

        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, format!("Bearer {}", provider.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: provider.kind.name(),
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CompletionProvider for HttpCompletionProvider {
    async fn generate_text(&self, request: &GenerateRequest) -> Result<Generated> {
        // Credential resolution happens before any network I/O
        let provider = self.resolver.resolve(&request.model)?;

        let body = Self::build_request_body(request, self.max_output_tokens);
        let response = self.post_with_retry(&provider, &body).await?;

        let text = Self::extract_text(&response).ok_or(ProviderError::EmptyOutput {
            provider: provider.kind.name(),
        })?;

        Ok(Generated { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::ChatMessage;

    #[test]
    fn test_build_request_body_prompt_only() {
        let request = GenerateRequest::new("gpt-4o", "hello there");
        let body = HttpCompletionProvider::build_request_body(&request, 1024);

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 1024);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "hello there");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_build_request_body_with_history_and_temperature() {
        let request = GenerateRequest::new("gpt-4o", "and now?")
            .with_messages(vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello!"),
            ])
            .with_temperature(0.2);
        let body = HttpCompletionProvider::build_request_body(&request, 512);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["content"], "hi");
        assert_eq!(messages[2]["content"], "and now?");
        assert_eq!(body["temperature"], 0.2);
    }

    #[test]
    fn test_build_request_body_with_images() {
        let mut request = GenerateRequest::new("gpt-4o", "what is in this picture?");
        request.options.images = Some(vec!["https://example.com/cat.png".to_string()]);
        let body = HttpCompletionProvider::build_request_body(&request, 512);

        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
    }

    #[test]
    fn test_extract_text() {
        let response = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "answer"}}]
        });
        assert_eq!(
            HttpCompletionProvider::extract_text(&response).unwrap(),
            "answer"
        );

        let empty = serde_json::json!({"choices": []});
        assert!(HttpCompletionProvider::extract_text(&empty).is_none());
    }
}
