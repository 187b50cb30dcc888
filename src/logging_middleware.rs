// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::{debug, enabled, Level};

/// Keys whose values never reach the logs
const REDACTED_KEYS: [&str; 5] = [
    "password",
    "currentPassword",
    "newPassword",
    "secret",
    "idToken",
];

/// Replaces secret-looking values anywhere in the document
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *inner = Value::String("***".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Text worth logging: JSON is pretty-printed and redacted, other UTF-8 is
/// passed through, binary bodies are skipped.
fn printable(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let text = std::str::from_utf8(bytes).ok()?;
    match serde_json::from_str::<Value>(text) {
        Ok(mut json) => {
            redact(&mut json);
            Some(serde_json::to_string_pretty(&json).unwrap_or_else(|_| text.to_string()))
        }
        Err(_) => Some(text.to_string()),
    }
}

fn is_streamed(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| {
            ct.starts_with("multipart/") || ct.starts_with("application/pdf")
        })
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    // Buffering only happens when someone is going to read the output
    if !enabled!(Level::DEBUG) || is_streamed(request.headers()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = printable(&bytes) {
        debug!(method = %parts.method, uri = %parts.uri, request_body = %body, "Request");
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    if is_streamed(response.headers()) {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = printable(&bytes) {
        debug!(status = %parts.status, response_body = %body, "Response");
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_nested_secrets() {
        let mut body = json!({
            "email": "a@b.com",
            "password": "hunter2",
            "nested": [{"newPassword": "x", "keep": 1}],
            "secret": "s"
        });
        redact(&mut body);
        assert_eq!(
            body,
            json!({
                "email": "a@b.com",
                "password": "***",
                "nested": [{"newPassword": "***", "keep": 1}],
                "secret": "***"
            })
        );
    }

    #[test]
    fn test_printable_skips_binary() {
        assert!(printable(b"").is_none());
        assert!(printable(&[0xff, 0xfe, 0x00]).is_none());
        assert_eq!(printable(b"plain").as_deref(), Some("plain"));
        assert!(printable(br#"{"password":"x"}"#).unwrap().contains("***"));
    }
}
