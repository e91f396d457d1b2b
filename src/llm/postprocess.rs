//! Cleanup applied to raw model output.

use regex::Regex;
use std::sync::OnceLock;

/// Replace every double quote with a single quote.
///
/// No other character is touched.
pub fn normalize_quotes(text: &str) -> String {
    text.replace('"', "'")
}

/// Extract SQL from a markdown code fence, if present.
///
/// Handles ```` ```sql ... ``` ```` anywhere in the text, then a generic
/// fence wrapping the whole answer. Text without a fence is only trimmed.
pub fn strip_sql_markdown(text: &str) -> String {
    static SQL_FENCE: OnceLock<Regex> = OnceLock::new();
    let re = SQL_FENCE.get_or_init(|| {
        Regex::new(r"(?is)```sql\s*(.*?)\s*```").expect("valid fence regex")
    });

    if let Some(inner) = re.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim().to_string();
    }

    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the opening line
        let body = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or(rest);
        return body.strip_suffix("```").unwrap_or(body).trim().to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_quotes() {
        assert_eq!(
            normalize_quotes(r#"SELECT * FROM users WHERE name = "Bob""#),
            "SELECT * FROM users WHERE name = 'Bob'"
        );
        assert_eq!(normalize_quotes("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_strip_sql_fence() {
        let text = "Here you go:\n```sql\nSELECT * FROM users;\n```\nAnything else?";
        assert_eq!(strip_sql_markdown(text), "SELECT * FROM users;");
    }

    #[test]
    fn test_strip_uppercase_fence() {
        assert_eq!(strip_sql_markdown("```SQL\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_strip_generic_fence() {
        assert_eq!(strip_sql_markdown("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_sql_markdown("```postgres\nSELECT 2\n```"), "SELECT 2");
    }

    #[test]
    fn test_plain_text_is_trimmed() {
        assert_eq!(strip_sql_markdown("  SELECT 1;\n"), "SELECT 1;");
    }
}
