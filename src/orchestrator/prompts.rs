// src/orchestrator/prompts.rs
// Category-aware prompt fragments
//
// Guidance is a declarative mapping from tool category to rules, priority
// and worked examples. Prompt text is composed by iterating the categories
// the registry actually exposes, so unregistered capability kinds contribute
// nothing.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::tools::ToolRegistry;

// ============================================================================
// Guidance records
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct CategoryGuidance {
    /// Decision rules for when tools of this category apply.
    pub rules: &'static [&'static str],
    /// Consultation order across categories; lower comes first.
    pub priority: u8,
    /// Worked examples: user request -> expected tool usage.
    pub examples: &'static [&'static str],
    /// Parameter hint appended to each tool of the category in the catalog.
    pub parameter_hint: &'static str,
}

static GUIDANCE: Lazy<HashMap<&'static str, CategoryGuidance>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        "calendar",
        CategoryGuidance {
            rules: &[
                "Use calendar tools whenever the request mentions meetings, events, scheduling or availability.",
                "List existing events before proposing or changing anything.",
                "Resolve relative dates (tomorrow, next week) into an explicit range parameter.",
            ],
            priority: 1,
            examples: &[
                "\"Show all meetings with Acme next week\" -> call the event-listing tool with the next-week range, then summarize matches.",
                "\"Am I free on Friday afternoon?\" -> list Friday's events and check for gaps.",
            ],
            parameter_hint: "expects an explicit date or range parameter where applicable",
        },
    );
    map.insert(
        "knowledge",
        CategoryGuidance {
            rules: &[
                "Use knowledge search when the answer depends on stored documents or notes.",
                "Query with the user's own wording first; refine only if results are empty.",
            ],
            priority: 2,
            examples: &[
                "\"What did the Q3 report say about churn?\" -> search documents for 'Q3 report churn' and cite the match.",
            ],
            parameter_hint: "expects a free-text `query`; store identifiers are injected automatically",
        },
    );
    map.insert(
        "files",
        CategoryGuidance {
            rules: &[
                "Use file tools only for content the user explicitly attached or named.",
            ],
            priority: 3,
            examples: &[
                "\"Summarize the attached notes\" -> read the attached file, then summarize.",
            ],
            parameter_hint: "expects a file name from the attached-files list",
        },
    );
    map.insert(
        "messaging",
        CategoryGuidance {
            rules: &[
                "Messaging tools send on the user's behalf; gather all other information first.",
                "Never send a message unless the request explicitly asks for one.",
            ],
            priority: 4,
            examples: &[
                "\"Email the summary to Dana\" -> finish gathering data, then call the send tool once.",
            ],
            parameter_hint: "expects recipient and body parameters",
        },
    );
    map
});

pub fn guidance_for(category: &str) -> Option<&'static CategoryGuidance> {
    GUIDANCE.get(category)
}

// ============================================================================
// Composition
// ============================================================================

/// Category-grouped tool catalog with per-tool parameter hints.
pub fn tool_catalog(registry: &dyn ToolRegistry) -> String {
    let categories = registry.available_categories();
    if categories.is_empty() {
        return "No tools are currently registered.".to_string();
    }

    let mut out = String::from("Available tools:\n");
    for category in &categories {
        out.push_str(&format!("\n[{}]\n", category));
        let hint = guidance_for(category).map(|g| g.parameter_hint);
        for tool in registry.tools_by_category(category) {
            match hint {
                Some(hint) => {
                    out.push_str(&format!("- {}: {} ({})\n", tool.name, tool.description, hint))
                }
                None => out.push_str(&format!("- {}: {}\n", tool.name, tool.description)),
            }
        }
    }
    out
}

/// Decision rules, priority ordering and worked examples for the categories
/// the registry actually exposes.
pub fn decision_guidance(registry: &dyn ToolRegistry) -> String {
    let mut known: Vec<(&'static str, &'static CategoryGuidance)> = registry
        .available_categories()
        .iter()
        .filter_map(|c| GUIDANCE.get_key_value(c.as_str()))
        .map(|(k, v)| (*k, v))
        .collect();

    if known.is_empty() {
        return String::new();
    }
    known.sort_by_key(|(_, g)| g.priority);

    let mut out = String::from("Decision rules:\n");
    for (category, guidance) in &known {
        for rule in guidance.rules {
            out.push_str(&format!("- [{}] {}\n", category, rule));
        }
    }

    out.push_str("\nPriority order when several categories apply: ");
    out.push_str(
        &known
            .iter()
            .map(|(c, _)| *c)
            .collect::<Vec<_>>()
            .join(" > "),
    );
    out.push('\n');

    out.push_str("\nWorked examples:\n");
    for (_, guidance) in &known {
        for example in guidance.examples {
            out.push_str(&format!("- {}\n", example));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{StaticToolRegistry, ToolInfo, ToolOutcome};
    use serde_json::json;

    fn registry_with(categories: &[(&str, &str)]) -> StaticToolRegistry {
        let mut registry = StaticToolRegistry::new();
        for (name, category) in categories {
            registry.register_fixed(
                ToolInfo::new(*name, *category, format!("{} tool", name)),
                ToolOutcome::ok(json!({})),
            );
        }
        registry
    }

    #[test]
    fn test_catalog_groups_by_category() {
        let registry = registry_with(&[
            ("calendar_list_events", "calendar"),
            ("search_documents", "knowledge"),
        ]);
        let catalog = tool_catalog(&registry);

        assert!(catalog.contains("[calendar]"));
        assert!(catalog.contains("[knowledge]"));
        assert!(catalog.contains("calendar_list_events"));
        assert!(catalog.contains("expects a free-text `query`"));
    }

    #[test]
    fn test_empty_registry_catalog() {
        let registry = StaticToolRegistry::new();
        assert_eq!(tool_catalog(&registry), "No tools are currently registered.");
    }

    #[test]
    fn test_guidance_only_covers_registered_categories() {
        let registry = registry_with(&[("calendar_list_events", "calendar")]);
        let guidance = decision_guidance(&registry);

        assert!(guidance.contains("[calendar]"));
        // Unregistered capability kinds contribute nothing
        assert!(!guidance.contains("[knowledge]"));
        assert!(!guidance.contains("[messaging]"));
    }

    #[test]
    fn test_guidance_priority_order() {
        let registry = registry_with(&[
            ("send_message", "messaging"),
            ("calendar_list_events", "calendar"),
        ]);
        let guidance = decision_guidance(&registry);
        assert!(guidance.contains("calendar > messaging"));
    }

    #[test]
    fn test_unknown_category_has_no_guidance_but_appears_in_catalog() {
        let registry = registry_with(&[("telemetry_probe", "telemetry")]);

        assert!(decision_guidance(&registry).is_empty());
        assert!(tool_catalog(&registry).contains("telemetry_probe"));
    }
}
