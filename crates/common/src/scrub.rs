//! Text normalization for recorded outcomes
//!
//! Module paths, parametrized test names and raw failure dumps all
//! arrive with runner decorations that would pollute the store. The
//! helpers here scrub them into the canonical persisted forms.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum length of a derived error summary
pub const SUMMARY_MAX_LEN: usize = 250;

/// Known test-path prefixes, checked in order; only the first match is
/// stripped.
const MODULE_PREFIXES: [&str; 3] = ["tests.test_", "tests.", "test."];

/// Strip the first matching test-path prefix from a module name.
///
/// `"tests.test_checkout"` becomes `"checkout"`, `"test.foo"` becomes
/// `"foo"`, anything without a known prefix passes through unchanged.
pub fn normalize_module(module: &str) -> &str {
    for prefix in MODULE_PREFIXES {
        if let Some(stripped) = module.strip_prefix(prefix) {
            return stripped;
        }
    }
    module
}

static PARAM_GROUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("param regex"));

/// Remove bracketed parametrization groups (device suffixes and the
/// like) from a test name, then trim surrounding whitespace and
/// underscores.
pub fn clean_test_name(name: &str) -> String {
    let stripped = PARAM_GROUP.replace_all(name, "");
    stripped
        .trim_matches(|c: char| c.is_whitespace() || c == '_')
        .to_string()
}

/// Ordered exception-signature table. Each pattern captures the text
/// following a recognized exception class name or the literal
/// `Message:` token, up to the end of the line. Order matters: the
/// first matching signature wins.
static EXCEPTION_SIGNATURES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"NoSuchElementException\s*:\s*([^\r\n]+)",
        r"TimeoutException\s*:\s*([^\r\n]+)",
        r"ElementClickInterceptedException\s*:\s*([^\r\n]+)",
        r"StaleElementReferenceException\s*:\s*([^\r\n]+)",
        r"ElementNotInteractableException\s*:\s*([^\r\n]+)",
        r"WebDriverException\s*:\s*([^\r\n]+)",
        r"AssertionError\s*:\s*([^\r\n]+)",
        r"Message\s*:\s*([^\r\n]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("signature regex"))
    .collect()
});

/// Derive a short error summary from a raw failure dump.
///
/// Tries the signature table first; falls back to the first line of the
/// detail. Either way the result is capped at [`SUMMARY_MAX_LEN`].
pub fn error_summary(detail: &str) -> String {
    for signature in EXCEPTION_SIGNATURES.iter() {
        if let Some(captured) = signature.captures(detail).and_then(|c| c.get(1)) {
            return truncate(captured.as_str().trim(), SUMMARY_MAX_LEN);
        }
    }
    truncate(detail.lines().next().unwrap_or("").trim(), SUMMARY_MAX_LEN)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_prefix_stripping() {
        assert_eq!(normalize_module("tests.test_checkout"), "checkout");
        assert_eq!(normalize_module("tests.regression"), "regression");
        assert_eq!(normalize_module("test.foo"), "foo");
        assert_eq!(normalize_module("plain_module"), "plain_module");
    }

    #[test]
    fn test_only_first_prefix_is_stripped() {
        // "tests.test_" wins over "tests." for the same input
        assert_eq!(normalize_module("tests.test_test.inner"), "test.inner");
    }

    #[test]
    fn test_name_cleaning() {
        assert_eq!(clean_test_name("test_monthly_plan[iPhone X]"), "test_monthly_plan");
        assert_eq!(clean_test_name("test_x[desktop]_"), "test_x");
        assert_eq!(clean_test_name("test_a[1][2]"), "test_a");
        assert_eq!(clean_test_name("  test_plain  "), "test_plain");
        assert_eq!(clean_test_name("test_plain"), "test_plain");
    }

    #[test]
    fn test_summary_from_known_exception() {
        let detail = "NoSuchElementException: unable to locate button\nstack trace...";
        assert_eq!(error_summary(detail), "unable to locate button");

        let detail = "TimeoutException: button not clickable";
        assert_eq!(error_summary(detail), "button not clickable");
    }

    #[test]
    fn test_summary_from_message_token() {
        let detail = "something went wrong\nMessage: element is stale";
        assert_eq!(error_summary(detail), "element is stale");
    }

    #[test]
    fn test_summary_fallback_first_line() {
        let detail = "plain failure text\nwith a second line";
        assert_eq!(error_summary(detail), "plain failure text");
    }

    #[test]
    fn test_summary_capped() {
        let long = "x".repeat(600);
        assert_eq!(error_summary(&long).len(), SUMMARY_MAX_LEN);
    }
}
