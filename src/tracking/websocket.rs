// src/tracking/websocket.rs
//! Realtime ticket and chat streams.
//!
//! Browsers cannot set headers on a WebSocket handshake, so the admin token
//! travels in `?token=`. The socket gets the full list on connect and again
//! whenever it changes; closing the socket drops the listener. The admin gate
//! runs before the handshake is validated, so a bad token is a plain 401/403.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Extension, Path, Query, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::handlers::{messages_query, tickets_query};
use super::models::{StreamAuth, StreamMessage};
use crate::auth::authorize;
use crate::common::{ApiError, AppState};
use crate::services::listener::{listen, SnapshotEvent};
use crate::services::DecodedToken;
use crate::services::Query as StoreQuery;

impl From<SnapshotEvent> for StreamMessage {
    fn from(event: SnapshotEvent) -> Self {
        match event {
            SnapshotEvent::Snapshot(docs) => StreamMessage::Snapshot {
                items: docs.iter().map(|d| d.to_json()).collect(),
            },
            SnapshotEvent::Error(message) => StreamMessage::Error { message },
        }
    }
}

type Upgrade = Result<WebSocketUpgrade, WebSocketUpgradeRejection>;

/// Gate first, then the handshake itself.
async fn admit(
    state: &AppState,
    auth: &StreamAuth,
    ws: Upgrade,
) -> Result<(DecodedToken, WebSocketUpgrade), Response> {
    let admin = authorize(state, auth.token.as_deref())
        .await
        .map_err(|failure| ApiError::from(failure).into_response())?;
    let ws = ws.map_err(IntoResponse::into_response)?;
    Ok((admin, ws))
}

/// GET /ws/tickets
pub async fn tickets_socket(
    Extension(state): Extension<Arc<AppState>>,
    Query(auth): Query<StreamAuth>,
    ws: Upgrade,
) -> Result<Response, Response> {
    let (admin, ws) = admit(&state, &auth, ws).await?;
    info!(admin_uid = %admin.uid, "Ticket stream opened");
    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, state, tickets_query())))
}

/// GET /ws/tickets/:id/messages
pub async fn messages_socket(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Query(auth): Query<StreamAuth>,
    ws: Upgrade,
) -> Result<Response, Response> {
    let (admin, ws) = admit(&state, &auth, ws).await?;
    if id.is_empty() || id.contains('/') {
        return Err(ApiError::BadRequest("Invalid ticket id".to_string()).into_response());
    }
    info!(admin_uid = %admin.uid, ticket_id = %id, "Message stream opened");
    let query = messages_query(&id);
    Ok(ws.on_upgrade(move |socket| stream_snapshots(socket, state, query)))
}

async fn stream_snapshots(socket: WebSocket, state: Arc<AppState>, query: StoreQuery) {
    let collection = query.collection.clone();
    let mut subscription = listen(
        state.store.clone(),
        &state.changes,
        query,
        state.config.listener_poll_interval,
    );
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = subscription.next() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&StreamMessage::from(event)) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize snapshot");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Client frames carry nothing we act on
                Some(Ok(_)) => {}
            },
        }
    }

    drop(subscription);
    debug!(collection = %collection, "Snapshot stream closed");
}
