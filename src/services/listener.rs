// src/services/listener.rs
//! Live query snapshots for the realtime views.
//!
//! A listener re-runs its query on an interval and pushes the result only when
//! it differs from the previous one. Writes made through `ObservedStore`
//! announce their collection on the `ChangeNotifier`, which wakes matching
//! listeners right away instead of waiting for the next tick.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::firestore::{parent_collection, Document, DocumentStore, Query, StoreError};
use super::firestore_value::DocumentData;

const CHANGE_CHANNEL_CAPACITY: usize = 256;
const SNAPSHOT_BUFFER: usize = 8;

/// Broadcasts the collection path of every local write.
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<String>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn notify(&self, collection: &str) {
        // No receivers simply means nobody is listening
        let _ = self.tx.send(collection.trim_matches('/').to_string());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// `DocumentStore` decorator that announces successful writes.
pub struct ObservedStore {
    inner: Arc<dyn DocumentStore>,
    changes: ChangeNotifier,
}

impl ObservedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, changes: ChangeNotifier) -> Self {
        Self { inner, changes }
    }
}

#[async_trait]
impl DocumentStore for ObservedStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.inner.query(query).await
    }

    async fn add(&self, collection: &str, data: DocumentData) -> Result<String, StoreError> {
        let id = self.inner.add(collection, data).await?;
        self.changes.notify(collection);
        Ok(id)
    }

    async fn set(&self, path: &str, data: DocumentData, merge: bool) -> Result<(), StoreError> {
        self.inner.set(path, data, merge).await?;
        self.changes.notify(&parent_collection(path));
        Ok(())
    }

    async fn update(&self, path: &str, data: DocumentData) -> Result<(), StoreError> {
        self.inner.update(path, data).await?;
        self.changes.notify(&parent_collection(path));
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.inner.delete(path).await?;
        self.changes.notify(&parent_collection(path));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    Snapshot(Vec<Document>),
    Error(String),
}

/// Handle to a running listener; dropping it stops the listener.
pub struct Subscription {
    events: mpsc::Receiver<SnapshotEvent>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.events.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn listen(
    store: Arc<dyn DocumentStore>,
    changes: &ChangeNotifier,
    query: Query,
    poll_interval: Duration,
) -> Subscription {
    let (tx, events) = mpsc::channel(SNAPSHOT_BUFFER);
    // Subscribe before the first read so a write racing it still wakes us
    let pokes = changes.subscribe();
    let task = tokio::spawn(run_listener(store, pokes, query, poll_interval, tx));
    Subscription { events, task }
}

async fn run_listener(
    store: Arc<dyn DocumentStore>,
    mut pokes: broadcast::Receiver<String>,
    query: Query,
    poll_interval: Duration,
    tx: mpsc::Sender<SnapshotEvent>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut last: Option<Vec<Document>> = None;
    let mut failing = false;

    loop {
        let event = match store.query(&query).await {
            Ok(docs) => {
                failing = false;
                if last.as_ref() == Some(&docs) {
                    None
                } else {
                    last = Some(docs.clone());
                    Some(SnapshotEvent::Snapshot(docs))
                }
            }
            Err(e) if !failing => {
                warn!(collection = %query.collection, error = %e, "Listener query failed");
                failing = true;
                Some(SnapshotEvent::Error(e.to_string()))
            }
            Err(_) => None,
        };

        if let Some(event) = event {
            if tx.send(event).await.is_err() {
                break;
            }
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => break,
                poke = pokes.recv() => match poke {
                    Ok(collection) if query.watches(&collection) => break,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Listener lagged behind change notifications");
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        ticker.tick().await;
                        break;
                    }
                },
            }
        }
    }

    debug!(collection = %query.collection, "Listener stopped");
}
