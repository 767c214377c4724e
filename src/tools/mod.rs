// src/tools/mod.rs
// Tool registry seam: discovery plus uniform invocation

pub mod registry;

pub use registry::StaticToolRegistry;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Capability types
// ============================================================================

/// A discoverable capability: name, category, human description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub category: String,
    pub description: String,
}

impl ToolInfo {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
        }
    }
}

/// Normalized result of one tool invocation. Registries are responsible for
/// turning tool-level exceptions into `success: false` outcomes; an error
/// escaping `execute_tool` aborts the whole orchestration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Registry contract
// ============================================================================

/// External collaborator providing tool discovery and execution. The
/// orchestrator only consumes this trait; concrete tool implementations
/// (calendar, knowledge search, files, messaging) live with the caller.
#[async_trait]
pub trait ToolRegistry: Send + Sync {
    /// Categories with at least one registered tool.
    fn available_categories(&self) -> Vec<String>;

    /// Tools registered under one category.
    fn tools_by_category(&self, category: &str) -> Vec<ToolInfo>;

    /// Every registered tool.
    fn available_tools(&self) -> Vec<ToolInfo>;

    /// Invoke a tool by name. Unknown names and tool failures are reported
    /// as a `ToolOutcome` with `success: false`, not as errors.
    async fn execute_tool(&self, name: &str, parameters: Value) -> Result<ToolOutcome>;
}
