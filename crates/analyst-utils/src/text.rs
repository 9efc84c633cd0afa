//! Small text helpers used by the engine's budget enforcement

/// Truncation marker appended when a character budget is exceeded.
pub const TRUNCATION_MARKER: &str = "...(truncated)";

/// Truncate `text` to at most `budget` characters, appending a marker when
/// anything was cut.
///
/// The budget counts characters, not bytes, so truncation never splits a
/// UTF-8 code point. The marker is appended on top of the budget; callers
/// size their budgets accordingly.
#[must_use]
pub fn truncate_with_marker(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(truncate_with_marker("hello", 10), "hello");
    }

    #[test]
    fn test_exact_budget_is_untouched() {
        assert_eq!(truncate_with_marker("hello", 5), "hello");
    }

    #[test]
    fn test_over_budget_gets_marker() {
        let out = truncate_with_marker("hello world", 5);
        assert_eq!(out, format!("hello{TRUNCATION_MARKER}"));
    }

    #[test]
    fn test_multibyte_boundary_is_respected() {
        let out = truncate_with_marker("héllo wörld", 6);
        assert!(out.starts_with("héllo "));
        assert!(out.ends_with(TRUNCATION_MARKER));
    }
}
