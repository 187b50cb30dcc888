// Helper functions for safe logging and timestamp formatting

use chrono::{DateTime, TimeZone, Utc};

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// use admin_console::common::safe_email_log;
/// let masked = safe_email_log("user@example.com");
/// assert_eq!(masked, "u***@example.com");
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 && !parts[0].is_empty() {
            let first: String = parts[0].chars().take(1).collect();
            format!("{}***@{}", first, parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 && token.is_ascii() {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Formats a timestamp the way the identity provider's admin SDK reports
/// account metadata (`Tue, 02 Jan 2024 10:00:00 GMT`).
pub fn to_http_date(ts: DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses the millisecond epoch strings the identity REST API returns.
pub fn parse_epoch_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("a@b"), "***@***.***");
        assert_eq!(safe_email_log("not-an-email"), "***@***.***");
    }

    #[test]
    fn test_safe_token_log() {
        assert_eq!(safe_token_log("eyJhbGciOiJSUzI1NiJ9"), "eyJh...NiJ9");
        assert_eq!(safe_token_log("short"), "***");
    }

    #[test]
    fn test_http_date_and_epoch_parsing() {
        let ts = parse_epoch_millis("1704189600000").expect("valid millis");
        assert_eq!(to_http_date(ts), "Tue, 02 Jan 2024 10:00:00 GMT");
        assert!(parse_epoch_millis("yesterday").is_none());
    }
}
