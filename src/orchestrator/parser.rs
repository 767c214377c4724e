// src/orchestrator/parser.rs
// Free-text output parsing behind a replaceable seam
//
// The stages never match on raw model text themselves; they go through an
// OutputParser. MarkerParser is the legacy fenced-block/marker
// implementation; a structured-output parser can be slotted in without
// touching any stage.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Markers and labels
// ============================================================================

/// Label of the fenced block the planning stage expects.
pub const TOOL_BLOCK_LABEL: &str = "tool_calls";
/// Explicit "no further tools needed" sentinel.
pub const NO_TOOLS_SENTINEL: &str = "NO_TOOLS_NEEDED";
/// Evaluation marker requesting another planning round.
pub const CONTINUATION_MARKER: &str = "CONTINUE";
/// Validation acceptance marker.
pub const ACCEPTANCE_MARKER: &str = "ACCEPTABLE";
/// Validation rejection marker, followed by ": <reason>".
pub const REFINEMENT_MARKER: &str = "NEEDS_REFINEMENT";

static TOOL_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    // First fenced block labeled `tool_calls`; content is captured lazily
    Regex::new(r"(?s)```tool_calls\s*(.*?)```").expect("valid tool block regex")
});

// ============================================================================
// Parsed shapes
// ============================================================================

/// One tool-call request proposed by the planning stage.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlannedCall {
    pub name: String,
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

fn empty_parameters() -> Value {
    Value::Object(serde_json::Map::new())
}

impl PlannedCall {
    pub fn new(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationVerdict {
    Accepted,
    NeedsRefinement(String),
}

// ============================================================================
// Parser seam
// ============================================================================

pub trait OutputParser: Send + Sync {
    /// Extract proposed tool calls from planning output. A missing label or
    /// malformed content yields an empty list, never an error.
    fn parse_tool_calls(&self, text: &str) -> Vec<PlannedCall>;

    /// Whether evaluation output asks for another round. Absence of the
    /// marker means completion.
    fn wants_continuation(&self, text: &str) -> bool;

    /// Verdict of a format-validation response.
    fn parse_validation(&self, text: &str) -> ValidationVerdict;
}

/// Legacy regex/marker implementation of the parser seam.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerParser;

impl OutputParser for MarkerParser {
    fn parse_tool_calls(&self, text: &str) -> Vec<PlannedCall> {
        if text.contains(NO_TOOLS_SENTINEL) {
            return Vec::new();
        }

        let Some(captures) = TOOL_BLOCK_RE.captures(text) else {
            return Vec::new();
        };
        let body = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");

        serde_json::from_str::<Vec<PlannedCall>>(body).unwrap_or_default()
    }

    // Conservative by design: anything that is not an explicit CONTINUE is
    // treated as completion, so a confused model cannot spin the loop.
    fn wants_continuation(&self, text: &str) -> bool {
        text.to_uppercase().contains(CONTINUATION_MARKER)
    }

    fn parse_validation(&self, text: &str) -> ValidationVerdict {
        let upper = text.to_uppercase();
        if let Some(pos) = upper.find(REFINEMENT_MARKER) {
            let tail = &text[pos + REFINEMENT_MARKER.len()..];
            let reason = tail.trim_start_matches([':', ' ', '-']).trim();
            let reason = if reason.is_empty() {
                "answer did not match the requested format".to_string()
            } else {
                reason.to_string()
            };
            return ValidationVerdict::NeedsRefinement(reason);
        }
        // ACCEPTABLE, or no marker at all: accept and terminate
        ValidationVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> MarkerParser {
        MarkerParser
    }

    #[test]
    fn test_parse_well_formed_block() {
        let text = r#"I will check the calendar first.

```tool_calls
[
  {"name": "calendar_list_events", "parameters": {"range": "next_week"}},
  {"name": "search_documents", "parameters": {"query": "Acme"}}
]
```
"#;
        let calls = parser().parse_tool_calls(text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "calendar_list_events");
        assert_eq!(calls[0].parameters["range"], "next_week");
        assert_eq!(calls[1].name, "search_documents");
    }

    #[test]
    fn test_parse_missing_parameters_defaults_to_empty_object() {
        let text = "```tool_calls\n[{\"name\": \"calendar_list_events\"}]\n```";
        let calls = parser().parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].parameters, json!({}));
    }

    #[test]
    fn test_parse_missing_label_yields_empty() {
        let text = "```json\n[{\"name\": \"x\"}]\n```";
        assert!(parser().parse_tool_calls(text).is_empty());
    }

    #[test]
    fn test_parse_malformed_body_yields_empty() {
        let text = "```tool_calls\nnot json at all\n```";
        assert!(parser().parse_tool_calls(text).is_empty());

        let text = "```tool_calls\n{\"name\": \"not-an-array\"}\n```";
        assert!(parser().parse_tool_calls(text).is_empty());
    }

    #[test]
    fn test_parse_sentinel_yields_empty() {
        let text = "NO_TOOLS_NEEDED - the request can be answered directly.";
        assert!(parser().parse_tool_calls(text).is_empty());
    }

    #[test]
    fn test_parse_first_block_wins() {
        let text = "```tool_calls\n[{\"name\": \"first\"}]\n```\n```tool_calls\n[{\"name\": \"second\"}]\n```";
        let calls = parser().parse_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "first");
    }

    #[test]
    fn test_continuation_marker_case_insensitive() {
        let p = parser();
        assert!(p.wants_continuation("CONTINUE: calendar data is still missing"));
        assert!(p.wants_continuation("I think we should continue gathering data"));
        assert!(!p.wants_continuation("COMPLETE - everything needed is gathered"));
        assert!(!p.wants_continuation(""));
    }

    #[test]
    fn test_validation_accepted() {
        assert_eq!(
            parser().parse_validation("ACCEPTABLE - matches the requested format"),
            ValidationVerdict::Accepted
        );
    }

    #[test]
    fn test_validation_needs_refinement_with_reason() {
        let verdict = parser().parse_validation("NEEDS_REFINEMENT: answer should be a bullet list");
        assert_eq!(
            verdict,
            ValidationVerdict::NeedsRefinement("answer should be a bullet list".to_string())
        );
    }

    #[test]
    fn test_validation_needs_refinement_without_reason() {
        let verdict = parser().parse_validation("NEEDS_REFINEMENT");
        match verdict {
            ValidationVerdict::NeedsRefinement(reason) => assert!(!reason.is_empty()),
            _ => panic!("expected refinement"),
        }
    }

    #[test]
    fn test_validation_ambiguous_output_accepts() {
        assert_eq!(
            parser().parse_validation("the answer looks fine to me"),
            ValidationVerdict::Accepted
        );
    }
}
