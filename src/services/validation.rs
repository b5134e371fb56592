//! Field checks shared by the form-handling services.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

/// Loose `local@domain.tld` check; delivery is the real test.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

/// Trimmed value, or `message` when it is blank.
pub fn required(value: &str, message: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(message.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trimmed value, `None` when absent or blank.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Error message when `value` exceeds `max` characters.
pub fn max_chars(value: &str, max: usize, field: &str) -> Result<(), String> {
    if value.chars().count() > max {
        Err(format!("{} must be at most {} characters", field, max))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("space in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required("  Ali ", "Name is required"), Ok("Ali".to_string()));
        assert_eq!(required("   ", "Name is required"), Err("Name is required".to_string()));
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_max_chars_counts_characters() {
        assert!(max_chars("سلام", 4, "Title").is_ok());
        assert_eq!(
            max_chars("abcde", 4, "Title"),
            Err("Title must be at most 4 characters".to_string())
        );
    }
}
