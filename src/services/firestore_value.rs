// src/services/firestore_value.rs
//! Typed document values and their Firestore REST encoding.
//!
//! The REST API wraps every value in a single-key object naming its type
//! (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Handlers work with
//! `FieldValue` and `DocumentData`; only the client touches the wire shape.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number, Value};
use std::collections::BTreeMap;

pub type DocumentData = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(DocumentData),
    /// Write-only sentinel resolved by the database to its commit time
    ServerTimestamp,
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Double(d) if d.fract() == 0.0 => Some(*d as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Plain JSON for API responses. Timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null | FieldValue::ServerTimestamp => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Double(d) => Number::from_f64(*d)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FieldValue::Map(fields) => Value::Object(data_to_json(fields)),
        }
    }

    /// Lifts arbitrary request JSON into a value. Whole numbers stay integers.
    pub fn from_json(value: &Value) -> FieldValue {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(items) => FieldValue::Array(items.iter().map(FieldValue::from_json).collect()),
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

pub fn data_to_json(data: &DocumentData) -> Map<String, Value> {
    data.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported value encoding: {0}")]
pub struct DecodeError(pub String);

/// Encodes a value for the REST API. Callers strip `ServerTimestamp` into
/// field transforms before encoding; a stray one encodes as null.
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null | FieldValue::ServerTimestamp => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        FieldValue::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(data: &DocumentData) -> Map<String, Value> {
    data.iter()
        .filter(|(_, v)| !matches!(v, FieldValue::ServerTimestamp))
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

pub fn decode_value(value: &Value) -> Result<FieldValue, DecodeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DecodeError(value.to_string()))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| DecodeError("empty value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(FieldValue::Null),
        "booleanValue" => inner
            .as_bool()
            .map(FieldValue::Bool)
            .ok_or_else(|| DecodeError(inner.to_string())),
        // int64 travels as a decimal string
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| DecodeError(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| DecodeError(n.to_string())),
            other => Err(DecodeError(other.to_string())),
        },
        "doubleValue" => match inner {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Double)
                .ok_or_else(|| DecodeError(n.to_string())),
            // NaN and the infinities arrive as strings
            Value::String(s) => s
                .parse::<f64>()
                .map(FieldValue::Double)
                .map_err(|_| DecodeError(s.clone())),
            other => Err(DecodeError(other.to_string())),
        },
        "stringValue" | "referenceValue" => inner
            .as_str()
            .map(|s| FieldValue::String(s.to_string()))
            .ok_or_else(|| DecodeError(inner.to_string())),
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
            .ok_or_else(|| DecodeError(inner.to_string())),
        "arrayValue" => {
            let values = match inner.get("values").and_then(Value::as_array) {
                Some(values) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };
            Ok(FieldValue::Array(values))
        }
        "mapValue" => Ok(FieldValue::Map(decode_fields(inner.get("fields"))?)),
        "geoPointValue" | "bytesValue" => Ok(FieldValue::String(inner.to_string())),
        other => Err(DecodeError(other.to_string())),
    }
}

pub fn decode_fields(fields: Option<&Value>) -> Result<DocumentData, DecodeError> {
    let Some(Value::Object(map)) = fields else {
        return Ok(DocumentData::new());
    };
    map.iter()
        .map(|(k, v)| decode_value(v).map(|decoded| (k.clone(), decoded)))
        .collect()
}
