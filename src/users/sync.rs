// src/users/sync.rs
//! Mirrors identity accounts into the `users` collection.

use thiserror::Error;
use tracing::{debug, info};

use crate::common::helpers::{safe_email_log, to_http_date};
use crate::services::firestore::{DocumentStore, StoreError};
use crate::services::firestore_value::{DocumentData, FieldValue};
use crate::services::identity::{list_all_users, IdentityProvider, ProviderError, UserRecord};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("listing accounts failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("writing users/{uid} failed: {source}")]
    Store { uid: String, source: StoreError },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
}

/// `{email, displayName, createdAt}` with an empty string for a missing name
pub fn mirror_fields(user: &UserRecord) -> DocumentData {
    let mut data = DocumentData::new();
    data.insert("email".to_string(), FieldValue::from(user.email.clone()));
    data.insert(
        "displayName".to_string(),
        FieldValue::from(user.display_name.clone().unwrap_or_default()),
    );
    data.insert(
        "createdAt".to_string(),
        FieldValue::from(to_http_date(user.created_at)),
    );
    data
}

/// Merge-writes `users/{uid}` for every account. Fields written by other
/// parts of the app survive.
pub async fn sync_auth_users(
    identity: &dyn IdentityProvider,
    store: &dyn DocumentStore,
) -> Result<SyncSummary, SyncError> {
    let users = list_all_users(identity).await?;

    for user in &users {
        store
            .set(&format!("users/{}", user.uid), mirror_fields(user), true)
            .await
            .map_err(|source| SyncError::Store {
                uid: user.uid.clone(),
                source,
            })?;
        debug!(
            uid = %user.uid,
            email = %user.email.as_deref().map(safe_email_log).unwrap_or_default(),
            "User mirrored"
        );
    }

    info!(count = users.len(), "Synced all users to the document store");
    Ok(SyncSummary {
        synced: users.len(),
    })
}
