//! In-memory stand-ins for the managed services, used by router tests.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use crate::common::{AppConfig, AppState};
use crate::services::firestore::{
    auto_id, parent_collection, validate_collection_path, validate_document_path, Direction,
    Document, DocumentStore, Query, StoreError,
};
use crate::services::firestore_value::{DocumentData, FieldValue};
use crate::services::identity::{
    DecodedToken, IdentityProvider, NewAccount, ProfileUpdate, ProviderError, UserPage,
    UserRecord,
};
use crate::services::listener::{ChangeNotifier, ObservedStore};
use crate::services::notify::NotificationService;
use crate::services::storage::{ObjectStorage, StorageError};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const USER_TOKEN: &str = "user-token";
pub const ADMIN_UID: &str = "admin-uid";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";

pub fn user_record(uid: &str, email: &str, created_at: DateTime<Utc>) -> UserRecord {
    UserRecord {
        uid: uid.to_string(),
        email: Some(email.to_string()),
        display_name: None,
        photo_url: None,
        email_verified: false,
        disabled: false,
        created_at,
        last_sign_in_at: None,
        custom_claims: Map::new(),
        provider_data: Vec::new(),
    }
}

#[derive(Default)]
struct IdentityInner {
    users: BTreeMap<String, UserRecord>,
    passwords: HashMap<String, String>,
    tokens: HashMap<String, DecodedToken>,
    failing: bool,
}

/// Account store with fixed bearer tokens.
pub struct MemoryIdentity {
    inner: Mutex<IdentityInner>,
}

impl MemoryIdentity {
    /// Seeds an admin account reachable through `ADMIN_TOKEN` and a plain
    /// account behind `USER_TOKEN`.
    pub fn new() -> Self {
        let mut inner = IdentityInner::default();

        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut admin = user_record(ADMIN_UID, ADMIN_EMAIL, created);
        admin.display_name = Some("Admin".to_string());
        admin.custom_claims.insert("admin".to_string(), json!(true));
        inner.users.insert(ADMIN_UID.to_string(), admin.clone());
        inner
            .passwords
            .insert(ADMIN_EMAIL.to_string(), ADMIN_PASSWORD.to_string());

        inner.tokens.insert(
            ADMIN_TOKEN.to_string(),
            DecodedToken {
                uid: ADMIN_UID.to_string(),
                email: Some(ADMIN_EMAIL.to_string()),
                claims: admin.custom_claims.clone(),
            },
        );
        inner.tokens.insert(
            USER_TOKEN.to_string(),
            DecodedToken {
                uid: "plain-uid".to_string(),
                email: Some("plain@example.com".to_string()),
                claims: Map::new(),
            },
        );

        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn insert(&self, record: UserRecord) {
        self.inner
            .lock()
            .unwrap()
            .users
            .insert(record.uid.clone(), record);
    }

    pub fn user(&self, uid: &str) -> Option<UserRecord> {
        self.inner.lock().unwrap().users.get(uid).cloned()
    }

    pub fn password_of(&self, email: &str) -> Option<String> {
        self.inner.lock().unwrap().passwords.get(email).cloned()
    }

    /// Makes every admin call fail with a transport error
    pub fn fail_all(&self) {
        self.inner.lock().unwrap().failing = true;
    }

    fn check(&self) -> Result<(), ProviderError> {
        if self.inner.lock().unwrap().failing {
            Err(ProviderError::Transport("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn verify_id_token(&self, token: &str) -> Result<DecodedToken, ProviderError> {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::InvalidToken("unknown token".to_string()))
    }

    async fn list_users(
        &self,
        max_results: u32,
        page_token: Option<&str>,
    ) -> Result<UserPage, ProviderError> {
        self.check()?;
        let inner = self.inner.lock().unwrap();
        let users: Vec<UserRecord> = inner
            .users
            .values()
            .filter(|u| page_token.map_or(true, |after| u.uid.as_str() > after))
            .take(max_results as usize)
            .cloned()
            .collect();

        let next_page_token = match users.last() {
            Some(last) if inner.users.keys().any(|uid| uid > &last.uid) => Some(last.uid.clone()),
            _ => None,
        };

        Ok(UserPage {
            users,
            next_page_token,
        })
    }

    async fn get_user(&self, uid: &str) -> Result<UserRecord, ProviderError> {
        self.check()?;
        self.user(uid)
            .ok_or_else(|| ProviderError::UserNotFound(uid.to_string()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<UserRecord, ProviderError> {
        self.check()?;
        self.inner
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned()
            .ok_or_else(|| ProviderError::UserNotFound(email.to_string()))
    }

    async fn create_user(&self, account: NewAccount) -> Result<String, ProviderError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        if inner
            .users
            .values()
            .any(|u| u.email.as_deref() == Some(account.email.as_str()))
        {
            return Err(ProviderError::Rejected("EMAIL_EXISTS".to_string()));
        }
        let uid = auto_id();
        let mut record = user_record(&uid, &account.email, Utc::now());
        record.display_name = account.display_name;
        inner.users.insert(uid.clone(), record);
        inner.passwords.insert(account.email, account.password);
        Ok(uid)
    }

    async fn update_user(&self, uid: &str, update: ProfileUpdate) -> Result<(), ProviderError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .users
            .get_mut(uid)
            .ok_or_else(|| ProviderError::UserNotFound(uid.to_string()))?;

        if let Some(name) = update.display_name {
            record.display_name = Some(name);
        }
        if let Some(email) = update.email {
            record.email = Some(email);
        }
        if let Some(disabled) = update.disabled {
            record.disabled = disabled;
        }
        if let Some(photo_url) = update.photo_url {
            record.photo_url = Some(photo_url);
        }
        if let Some(password) = update.password {
            if let Some(email) = record.email.clone() {
                inner.passwords.insert(email, password);
            }
        }
        Ok(())
    }

    async fn set_custom_claims(
        &self,
        uid: &str,
        claims: Map<String, Value>,
    ) -> Result<(), ProviderError> {
        self.check()?;
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .users
            .get_mut(uid)
            .ok_or_else(|| ProviderError::UserNotFound(uid.to_string()))?;
        record.custom_claims = claims;
        Ok(())
    }

    async fn delete_user(&self, uid: &str) -> Result<(), ProviderError> {
        self.check()?;
        self.inner
            .lock()
            .unwrap()
            .users
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| ProviderError::UserNotFound(uid.to_string()))
    }

    async fn password_reset_link(&self, email: &str) -> Result<String, ProviderError> {
        self.check()?;
        Ok(format!(
            "https://demo-project.firebaseapp.com/__/auth/action?mode=resetPassword&email={}",
            urlencoding::encode(email)
        ))
    }

    async fn verify_password(&self, email: &str, password: &str) -> Result<(), ProviderError> {
        match self.inner.lock().unwrap().passwords.get(email) {
            Some(stored) if stored == password => Ok(()),
            _ => Err(ProviderError::InvalidCredentials),
        }
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        (FieldValue::String(x), FieldValue::String(y)) => x.cmp(y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

#[derive(Default)]
struct StoreInner {
    docs: BTreeMap<String, DocumentData>,
    failing: HashSet<String>,
    clock: Option<DateTime<Utc>>,
}

impl StoreInner {
    /// Server timestamps strictly increase so ordering by them is stable
    fn resolve(&mut self, mut data: DocumentData) -> DocumentData {
        for value in data.values_mut() {
            if matches!(value, FieldValue::ServerTimestamp) {
                let now = Utc::now();
                let next = match self.clock {
                    Some(last) if last >= now => last + Duration::milliseconds(1),
                    _ => now,
                };
                self.clock = Some(next);
                *value = FieldValue::Timestamp(next);
            }
        }
        data
    }
}

/// Document store over a map of paths, with Firestore's query semantics for
/// equality filters and ordering (documents lacking the order field are left
/// out).
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    pub fn fail_collection(&self, collection: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing
            .insert(collection.to_string());
    }

    pub fn seed(&self, path: &str, data: Value) {
        let FieldValue::Map(fields) = FieldValue::from_json(&data) else {
            panic!("seed data must be an object");
        };
        self.inner
            .lock()
            .unwrap()
            .docs
            .insert(path.to_string(), fields);
    }

    pub fn doc(&self, path: &str) -> Option<DocumentData> {
        self.inner.lock().unwrap().docs.get(path).cloned()
    }

    pub fn collection(&self, collection: &str) -> Vec<Document> {
        self.inner
            .lock()
            .unwrap()
            .docs
            .iter()
            .filter(|(path, _)| parent_collection(path) == collection)
            .map(|(path, data)| to_document(path, data))
            .collect()
    }

    fn check(&self, path: &str) -> Result<(), StoreError> {
        let collection = if validate_collection_path(path).is_ok() {
            path.to_string()
        } else {
            parent_collection(path)
        };
        if self.inner.lock().unwrap().failing.contains(&collection) {
            return Err(StoreError::Transport("deadline exceeded".to_string()));
        }
        Ok(())
    }
}

fn to_document(path: &str, data: &DocumentData) -> Document {
    Document {
        id: path.rsplit('/').next().unwrap_or_default().to_string(),
        path: path.to_string(),
        data: data.clone(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        validate_document_path(path)?;
        self.check(path)?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .docs
            .get(path)
            .map(|data| to_document(path, data)))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        validate_collection_path(&query.collection)?;
        self.check(&query.collection)?;

        let mut docs: Vec<Document> = self
            .collection(&query.collection)
            .into_iter()
            .filter(|doc| {
                query
                    .filters
                    .iter()
                    .all(|(field, value)| doc.get(field) == Some(value))
            })
            .collect();

        if let Some((field, direction)) = &query.order_by {
            docs.retain(|doc| doc.get(field).is_some());
            docs.sort_by(|a, b| {
                let ord = compare_values(&a.data[field], &b.data[field]);
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit as usize);
        }
        Ok(docs)
    }

    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError> {
        validate_collection_path(collection)?;
        self.check(collection)?;
        let id = auto_id();
        let mut inner = self.inner.lock().unwrap();
        let data = inner.resolve(data);
        inner.docs.insert(format!("{}/{}", collection, id), data);
        Ok(id)
    }

    async fn set(&self, path: &str, data: DocumentData, merge: bool) -> Result<(), StoreError> {
        validate_document_path(path)?;
        self.check(path)?;
        let mut inner = self.inner.lock().unwrap();
        let data = inner.resolve(data);
        if merge {
            inner
                .docs
                .entry(path.to_string())
                .or_default()
                .extend(data);
        } else {
            inner.docs.insert(path.to_string(), data);
        }
        Ok(())
    }

    async fn update(&self, path: &str, data: DocumentData) -> Result<(), StoreError> {
        validate_document_path(path)?;
        self.check(path)?;
        let mut inner = self.inner.lock().unwrap();
        let data = inner.resolve(data);
        let existing = inner
            .docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        existing.extend(data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        validate_document_path(path)?;
        self.check(path)?;
        self.inner.lock().unwrap().docs.remove(path);
        Ok(())
    }
}

/// Records uploads instead of sending them anywhere.
#[derive(Default)]
pub struct MemoryStorage {
    pub uploads: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), data.len()));
        Ok(format!("https://storage.test/{}", key))
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub identity: Arc<MemoryIdentity>,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<MemoryStorage>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(NotificationService::new(None, None))
    }

    pub fn with_notifier(notifier: NotificationService) -> Self {
        let identity = Arc::new(MemoryIdentity::new());
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(MemoryStorage::default());
        let changes = ChangeNotifier::new();

        let state = Arc::new(AppState {
            config: Arc::new(AppConfig::for_tests()),
            identity: identity.clone(),
            store: Arc::new(ObservedStore::new(store.clone(), changes.clone())),
            storage: storage.clone(),
            notifier: Arc::new(notifier),
            changes,
        });

        Self {
            state,
            identity,
            store,
            storage,
        }
    }

    pub fn router(&self) -> Router {
        crate::build_router(self.state.clone())
    }

    /// Sends a JSON request and returns status plus parsed body (`Null` when empty).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, bytes) = self.raw(request).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }
}
