// Application state shared across all modules

use std::sync::Arc;

use super::config::AppConfig;
use crate::services::{
    ChangeNotifier, DocumentStore, IdentityProvider, NotificationService, ObjectStorage,
};

/// Handles to every collaborator a request may need.
///
/// Nothing in here is mutated after startup, so the state is shared as a plain
/// `Arc` without a lock.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub notifier: Arc<NotificationService>,
    pub changes: ChangeNotifier,
}
