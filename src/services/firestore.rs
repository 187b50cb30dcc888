// src/services/firestore.rs
//! Document database seam and its Firestore v1 REST client.
//!
//! Paths are slash-separated and relative to the database root
//! (`tickets/abc`, `tickets/abc/messages`). Every write goes through
//! `documents:commit` so preconditions and server timestamps share one code
//! path.

use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error};

use super::credentials::{AccessTokenSource, CredentialsError};
use super::firestore_value::{decode_fields, encode_fields, encode_value, DocumentData, FieldValue};

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";
const AUTO_ID_LEN: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("database returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("could not decode document: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub path: String,
    pub data: DocumentData,
}

impl Document {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// `{id, ...fields}`, the shape the console renders
    pub fn to_json(&self) -> Value {
        let mut map = super::firestore_value::data_to_json(&self.data);
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_wire(&self) -> &'static str {
        match self {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        }
    }
}

/// Single-collection query: equality filters, one ordering, optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, FieldValue)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn collection(path: impl Into<String>) -> Self {
        Self {
            collection: path.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a write to `collection` can change this query's result
    pub fn watches(&self, collection: &str) -> bool {
        self.collection == collection
    }

    fn structured_query(&self, collection_id: &str) -> Value {
        let mut query = json!({ "from": [{ "collectionId": collection_id }] });

        let field_filters: Vec<Value> = self
            .filters
            .iter()
            .map(|(field, value)| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": encode_value(value),
                    }
                })
            })
            .collect();

        match field_filters.len() {
            0 => {}
            1 => query["where"] = field_filters[0].clone(),
            _ => {
                query["where"] = json!({
                    "compositeFilter": { "op": "AND", "filters": field_filters }
                })
            }
        }

        if let Some((field, direction)) = &self.order_by {
            query["orderBy"] = json!([{
                "field": { "fieldPath": field },
                "direction": direction.as_wire(),
            }]);
        }

        if let Some(limit) = self.limit {
            query["limit"] = json!(limit);
        }

        query
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// `Ok(None)` when the document does not exist
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Creates a document with a generated id and returns the id
    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError>;

    /// Overwrites the document, or merges the given fields into it
    async fn set(&self, path: &str, data: DocumentData, merge: bool) -> Result<(), StoreError>;

    /// Changes the given fields; `StoreError::NotFound` if the document is missing
    async fn update(&self, path: &str, data: DocumentData) -> Result<(), StoreError>;

    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}

/// 20 alphanumeric characters, the same shape the client SDKs generate
pub fn auto_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(AUTO_ID_LEN)
        .map(char::from)
        .collect()
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect()
}

pub fn validate_document_path(path: &str) -> Result<(), StoreError> {
    let parts = segments(path);
    if parts.is_empty() || parts.len() % 2 != 0 {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

pub fn validate_collection_path(path: &str) -> Result<(), StoreError> {
    let parts = segments(path);
    if parts.len() % 2 != 1 {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Collection path that contains the document at `path`
pub fn parent_collection(path: &str) -> String {
    let parts = segments(path);
    parts[..parts.len().saturating_sub(1)].join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Create,
    Set,
    Merge,
    Update,
}

#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    tokens: AccessTokenSource,
    database: String,
}

impl FirestoreClient {
    pub fn new(http: Client, tokens: AccessTokenSource, project_id: &str) -> Self {
        Self {
            http,
            tokens,
            database: format!("projects/{}/databases/(default)", project_id),
        }
    }

    fn documents_root(&self) -> String {
        format!("{}/documents", self.database)
    }

    fn document_name(&self, path: &str) -> String {
        format!("{}/{}", self.documents_root(), path.trim_matches('/'))
    }

    fn parse_document(&self, raw: &Value) -> Result<Document, StoreError> {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("document without name".to_string()))?;
        let root = format!("{}/", self.documents_root());
        let path = name.strip_prefix(&root).unwrap_or(name).to_string();
        let id = path.rsplit('/').next().unwrap_or_default().to_string();
        let data = decode_fields(raw.get("fields")).map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Document { id, path, data })
    }

    async fn api_error(response: reqwest::Response, path: &str) -> StoreError {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"]["message"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();

        if status == StatusCode::NOT_FOUND || body["error"]["status"] == "NOT_FOUND" {
            return StoreError::NotFound(path.to_string());
        }

        error!(http_status = %status, path = %path, message = %message, "Firestore request failed");
        StoreError::Api {
            status: status.as_u16(),
            message,
        }
    }

    fn build_write(&self, path: &str, data: &DocumentData, mode: WriteMode) -> Value {
        let mut write = json!({
            "update": {
                "name": self.document_name(path),
                "fields": encode_fields(data),
            }
        });

        let plain_fields: Vec<&String> = data
            .iter()
            .filter(|(_, v)| !matches!(v, FieldValue::ServerTimestamp))
            .map(|(k, _)| k)
            .collect();

        match mode {
            WriteMode::Create => write["currentDocument"] = json!({ "exists": false }),
            WriteMode::Set => {}
            WriteMode::Merge => write["updateMask"] = json!({ "fieldPaths": plain_fields }),
            WriteMode::Update => {
                write["updateMask"] = json!({ "fieldPaths": plain_fields });
                write["currentDocument"] = json!({ "exists": true });
            }
        }

        let transforms: Vec<Value> = data
            .iter()
            .filter(|(_, v)| matches!(v, FieldValue::ServerTimestamp))
            .map(|(k, _)| json!({ "fieldPath": k, "setToServerValue": "REQUEST_TIME" }))
            .collect();
        if !transforms.is_empty() {
            write["updateTransforms"] = Value::Array(transforms);
        }

        write
    }

    async fn commit(&self, path: &str, write: Value) -> Result<(), StoreError> {
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}:commit", FIRESTORE_API, self.documents_root());

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "writes": [write] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response, path).await);
        }

        debug!(path = %path, "Firestore commit succeeded");
        Ok(())
    }

    async fn write(&self, path: &str, data: &DocumentData, mode: WriteMode) -> Result<(), StoreError> {
        validate_document_path(path)?;
        let write = self.build_write(path, data, mode);
        self.commit(path, write).await
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        validate_document_path(path)?;
        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}", FIRESTORE_API, self.document_name(path));

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response, path).await);
        }

        let raw: Value = response.json().await?;
        self.parse_document(&raw).map(Some)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        validate_collection_path(&query.collection)?;
        let parts = segments(&query.collection);
        let collection_id = parts.last().copied().unwrap_or_default();

        // Subcollections are queried from their parent document
        let parent = if parts.len() > 1 {
            let doc_path = parts[..parts.len() - 1].join("/");
            self.document_name(&doc_path)
        } else {
            self.documents_root()
        };

        let token = self.tokens.access_token().await?;
        let url = format!("{}/{}:runQuery", FIRESTORE_API, parent);
        let body = json!({ "structuredQuery": query.structured_query(collection_id) });

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response, &query.collection).await);
        }

        // One element per result; an empty result is a single element without `document`
        let rows: Vec<Value> = response.json().await?;
        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(|doc| self.parse_document(doc))
            .collect()
    }

    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError> {
        validate_collection_path(collection)?;
        let id = auto_id();
        let path = format!("{}/{}", collection.trim_matches('/'), id);
        self.write(&path, &data, WriteMode::Create).await?;
        Ok(id)
    }

    async fn set(&self, path: &str, data: DocumentData, merge: bool) -> Result<(), StoreError> {
        let mode = if merge { WriteMode::Merge } else { WriteMode::Set };
        self.write(path, &data, mode).await
    }

    async fn update(&self, path: &str, data: DocumentData) -> Result<(), StoreError> {
        self.write(path, &data, WriteMode::Update).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        validate_document_path(path)?;
        let write = json!({ "delete": self.document_name(path) });
        self.commit(path, write).await
    }
}
