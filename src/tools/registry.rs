// src/tools/registry.rs
// In-process registry with closure-backed tools

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::Future;
use serde_json::Value;
use tracing::debug;

use super::{ToolInfo, ToolOutcome, ToolRegistry};

type ToolFuture = Pin<Box<dyn Future<Output = ToolOutcome> + Send>>;
type ToolHandler = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

struct RegisteredTool {
    info: ToolInfo,
    handler: ToolHandler,
}

/// Reference `ToolRegistry` implementation backed by registered closures.
/// Used by the binary's wiring and throughout the test-suite; production
/// deployments typically implement `ToolRegistry` over their own dispatch.
#[derive(Default)]
pub struct StaticToolRegistry {
    // BTreeMap keeps catalog ordering stable for prompts and tests
    tools: BTreeMap<String, RegisteredTool>,
}

impl StaticToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with an async handler. Re-registering a name replaces
    /// the previous tool.
    pub fn register<F, Fut>(&mut self, info: ToolInfo, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutcome> + Send + 'static,
    {
        let name = info.name.clone();
        self.tools.insert(
            name,
            RegisteredTool {
                info,
                handler: Arc::new(move |params| Box::pin(handler(params))),
            },
        );
    }

    /// Register a tool that always returns the same outcome (test scaffolding
    /// and smoke wiring).
    pub fn register_fixed(&mut self, info: ToolInfo, outcome: ToolOutcome) {
        self.register(info, move |_params| {
            let outcome = outcome.clone();
            async move { outcome }
        });
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolRegistry for StaticToolRegistry {
    fn available_categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .tools
            .values()
            .map(|t| t.info.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }

    fn tools_by_category(&self, category: &str) -> Vec<ToolInfo> {
        self.tools
            .values()
            .filter(|t| t.info.category == category)
            .map(|t| t.info.clone())
            .collect()
    }

    fn available_tools(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| t.info.clone()).collect()
    }

    async fn execute_tool(&self, name: &str, parameters: Value) -> Result<ToolOutcome> {
        match self.tools.get(name) {
            Some(tool) => {
                debug!("Executing tool: {}", name);
                Ok((tool.handler)(parameters).await)
            }
            None => Ok(ToolOutcome::fail(format!("unknown tool: {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn calendar_tool() -> ToolInfo {
        ToolInfo::new("calendar_list_events", "calendar", "List calendar events")
    }

    #[tokio::test]
    async fn test_execute_registered_tool() {
        let mut registry = StaticToolRegistry::new();
        registry.register(calendar_tool(), |params| async move {
            ToolOutcome::ok(json!({"echo": params}))
        });

        let outcome = registry
            .execute_tool("calendar_list_events", json!({"range": "next_week"}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.data.unwrap()["echo"]["range"], "next_week");
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_failure_not_error() {
        let registry = StaticToolRegistry::new();
        let outcome = registry.execute_tool("nope", json!({})).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("unknown tool"));
    }

    #[test]
    fn test_categories_deduplicated_and_sorted() {
        let mut registry = StaticToolRegistry::new();
        registry.register_fixed(
            ToolInfo::new("search_documents", "knowledge", "Search documents"),
            ToolOutcome::ok(json!([])),
        );
        registry.register_fixed(calendar_tool(), ToolOutcome::ok(json!([])));
        registry.register_fixed(
            ToolInfo::new("calendar_create_event", "calendar", "Create an event"),
            ToolOutcome::ok(json!({})),
        );

        assert_eq!(registry.available_categories(), vec!["calendar", "knowledge"]);
        assert_eq!(registry.tools_by_category("calendar").len(), 2);
        assert_eq!(registry.available_tools().len(), 3);
    }
}
