// src/utils.rs
// Small shared helpers

// ============================================================================
// Text truncation
// ============================================================================

/// Truncate a string for prompt-size control, appending an ellipsis when
/// anything was cut. Always cuts on a char boundary.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string_unchanged() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let out = truncate("abcdefghij", 8);
        assert_eq!(out, "abcde...");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        // é is two bytes; byte-indexed truncation would panic here
        let out = truncate("éééééééééé", 8);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 8);
    }

}
