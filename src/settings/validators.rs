// src/settings/validators.rs

use chrono::NaiveDate;
use serde_json::Value;

use super::models::{InvoiceFields, InvoiceStatus};
use crate::common::{ApiError, ValidationResult, Validator};

const INVOICE_FIELDS: [&str; 5] = ["invoiceNumber", "date", "service", "amount", "status"];

/// Empty strings, zero and null all count as missing, like the console form
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Bool(b)) => !b,
        Some(_) => false,
    }
}

/// The form posts numbers as strings too
fn amount_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub struct InvoiceValidator;

impl Validator<Value> for InvoiceValidator {
    fn validate(&self, data: &Value) -> ValidationResult {
        let mut result = ValidationResult::new();

        for field in ["invoiceNumber", "service"] {
            if !data[field].is_string() {
                result.add_error(field, "Expected string");
            }
        }

        match data["date"].as_str() {
            Some(raw) if parse_date(raw).is_some() => {}
            Some(_) => result.add_error("date", "Expected a YYYY-MM-DD date"),
            None => result.add_error("date", "Expected string"),
        }

        match amount_of(&data["amount"]) {
            Some(amount) if amount.is_finite() && amount > 0.0 => {}
            Some(_) => result.add_error("amount", "Amount must be greater than 0"),
            None => result.add_error("amount", "Expected number"),
        }

        if data["status"]
            .as_str()
            .and_then(InvoiceStatus::parse)
            .is_none()
        {
            result.add_error("status", "Status must be Paid, Pending or Overdue");
        }

        result
    }
}

/// Checks presence first, then field shapes.
pub fn parse_invoice(data: &Value) -> Result<InvoiceFields, ApiError> {
    if INVOICE_FIELDS.iter().any(|f| is_blank(data.get(*f))) {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    }
    InvoiceValidator.validate(data).into_result()?;

    let text = |field: &str| data[field].as_str().unwrap_or_default().trim().to_string();
    Ok(InvoiceFields {
        invoice_number: text("invoiceNumber"),
        date: parse_date(&text("date")).unwrap_or_default(),
        service: text("service"),
        amount: amount_of(&data["amount"]).unwrap_or_default(),
        status: InvoiceStatus::parse(&text("status")).unwrap_or(InvoiceStatus::Pending),
    })
}

/// Create bodies also name the user (email or uid) the invoice belongs to.
pub fn parse_new_invoice(data: &Value) -> Result<(String, InvoiceFields), ApiError> {
    if is_blank(data.get("user")) {
        return Err(ApiError::BadRequest("All fields required".to_string()));
    }
    let user = data["user"]
        .as_str()
        .ok_or_else(|| ApiError::BadRequest("user must be a string".to_string()))?
        .to_string();
    Ok((user, parse_invoice(data)?))
}
