// src/services/mod.rs
//
// Clients for the managed services the console sits on top of. Each concern
// is a trait so handlers can be exercised against in-memory fakes.

pub mod credentials;
pub mod firebase_auth;
pub mod firestore;
pub mod firestore_value;
pub mod id_token;
pub mod identity;
pub mod listener;
pub mod monitoring;
pub mod notify;
pub mod storage;

// Re-export commonly used types for convenience
pub use firestore::{Direction, Document, DocumentStore, Query, StoreError};
pub use firestore_value::{DocumentData, FieldValue};
pub use identity::{DecodedToken, IdentityProvider, ProviderError, UserRecord};
pub use listener::{ChangeNotifier, ObservedStore};
pub use notify::NotificationService;
pub use storage::ObjectStorage;
