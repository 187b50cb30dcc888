// Common validation types and traits

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    /// Turns the accumulated errors into `Err` so callers can use `?`
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid {
            Ok(())
        } else {
            Err(self)
        }
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

/// Strict address check used for account emails.
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-']+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("static email regex")
    });
    re.is_match(email)
}

/// Loose "something@something.tld" shape used by the notification endpoints.
pub fn looks_like_email(value: &str) -> bool {
    static LOOSE_RE: OnceLock<Regex> = OnceLock::new();
    let re = LOOSE_RE.get_or_init(|| Regex::new(r".+@.+\..+").expect("static email regex"));
    re.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_result_collects_errors() {
        let mut result = ValidationResult::new();
        assert!(result.is_valid);

        result.add_error("email", "Invalid email");
        result.add_error("disabled", "Expected boolean");

        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_email_checks() {
        assert!(is_valid_email("admin@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("admin@"));
        assert!(!is_valid_email("no-at-sign.example.com"));
        assert!(!is_valid_email("spaces in@example.com"));

        assert!(looks_like_email("a@b.c"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("plainstring"));
    }
}
