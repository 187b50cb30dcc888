// src/users/validators.rs

use serde_json::Value;

use super::models::UpdateUserRequest;
use crate::common::validation::is_valid_email;
use crate::common::{ValidationResult, Validator};

/// Checks the raw PATCH body field by field. Unknown fields are ignored.
pub struct UpdateUserValidator;

impl Validator<Value> for UpdateUserValidator {
    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        let Some(body) = data.as_object() else {
            result.add_error("body", "Expected object");
            return result;
        };

        if let Some(value) = body.get("displayName") {
            if !value.is_string() {
                result.add_error("displayName", "Expected string");
            }
        }

        if let Some(value) = body.get("email") {
            match value.as_str() {
                Some(email) if is_valid_email(email) => {}
                Some(_) => result.add_error("email", "Invalid email"),
                None => result.add_error("email", "Expected string"),
            }
        }

        if let Some(value) = body.get("disabled") {
            if !value.is_boolean() {
                result.add_error("disabled", "Expected boolean");
            }
        }

        if let Some(value) = body.get("customClaims") {
            if !value.is_object() {
                result.add_error("customClaims", "Expected object");
            }
        }

        result
    }
}

/// Validates and extracts the update. Only present fields end up `Some`.
pub fn parse_update(data: &Value) -> Result<UpdateUserRequest, ValidationResult> {
    UpdateUserValidator.validate(data).into_result()?;

    let field = |name: &str| data.get(name);
    Ok(UpdateUserRequest {
        display_name: field("displayName")
            .and_then(Value::as_str)
            .map(str::to_string),
        email: field("email").and_then(Value::as_str).map(str::to_string),
        disabled: field("disabled").and_then(Value::as_bool),
        custom_claims: field("customClaims").and_then(Value::as_object).cloned(),
    })
}
