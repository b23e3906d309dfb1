use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::events::{BountyEvent, EventBus};
use crate::state::AppState;

const KEEPALIVE_INTERVAL_SECS: u64 = 30;

/// Message pushed to a connected client after a payment attempt resolves.
///
/// The field casing matches what the web client expects on the wire, so the
/// serde renames are part of the contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketMessage {
    #[serde(rename = "type")]
    pub message_type: i32,
    #[serde(rename = "broadcastType")]
    pub broadcast_type: String,
    #[serde(rename = "sourceSessionID")]
    pub source_session_id: String,
    pub message: String,
    pub action: String,
    #[serde(rename = "ticketDetails")]
    pub ticket_details: TicketData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketData {
    #[serde(rename = "featureUUID")]
    pub feature_uuid: String,
    #[serde(rename = "phaseUUID")]
    pub phase_uuid: String,
    #[serde(rename = "ticketUUID")]
    pub ticket_uuid: String,
    #[serde(rename = "ticketDescription")]
    pub ticket_description: String,
}

impl TicketMessage {
    /// A direct notification for a single client, the shape used for payment
    /// outcome pushes.
    pub fn direct(
        source_session_id: impl Into<String>,
        message: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            message_type: 1,
            broadcast_type: "direct".to_string(),
            source_session_id: source_session_id.into(),
            message: message.into(),
            action: action.into(),
            ticket_details: TicketData::default(),
        }
    }
}

struct PoolEntry {
    connection_id: u64,
    sender: mpsc::UnboundedSender<Message>,
}

/// Registry of live websocket connections keyed by the client's host.
///
/// Payment handlers resolve a host here to push outcome notifications. A
/// missing or dead connection is not an error: payment state is already
/// persisted by the time a push is attempted, so delivery is best effort.
pub struct WsPool {
    clients: RwLock<HashMap<String, PoolEntry>>,
    next_connection_id: AtomicU64,
    event_bus: Arc<EventBus>,
}

impl WsPool {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            event_bus,
        }
    }

    /// Register a connection for `host`, replacing any previous one.
    ///
    /// Returns the connection id and the receiving half that the socket task
    /// forwards to the client. When a reconnect replaces the entry, the old
    /// sender is dropped and the old task's receiver runs dry.
    pub async fn register(&self, host: &str) -> (u64, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

        let replaced = {
            let mut clients = self.clients.write().await;
            clients
                .insert(
                    host.to_string(),
                    PoolEntry {
                        connection_id,
                        sender,
                    },
                )
                .is_some()
        };

        info!(host = %host, connection_id, replaced, "Websocket client registered");

        if let Err(e) = self
            .event_bus
            .publish(BountyEvent::ClientRegistered {
                host: host.to_string(),
                timestamp: Utc::now(),
            })
            .await
        {
            warn!(host = %host, error = %e, "Failed to publish client registration event");
        }

        (connection_id, receiver)
    }

    /// Drop the connection for `host`, but only if it is still the one
    /// identified by `connection_id`. A stale task finishing after a
    /// reconnect must not evict the replacement.
    pub async fn unregister(&self, host: &str, connection_id: u64) {
        let removed = {
            let mut clients = self.clients.write().await;
            match clients.get(host) {
                Some(entry) if entry.connection_id == connection_id => {
                    clients.remove(host);
                    true
                }
                _ => false,
            }
        };

        if !removed {
            return;
        }

        info!(host = %host, connection_id, "Websocket client dropped");

        if let Err(e) = self
            .event_bus
            .publish(BountyEvent::ClientDropped {
                host: host.to_string(),
                timestamp: Utc::now(),
            })
            .await
        {
            warn!(host = %host, error = %e, "Failed to publish client drop event");
        }
    }

    /// Push a message to the client registered under `host`.
    ///
    /// Returns false when no client is connected or the connection is gone;
    /// callers treat that as a dropped notification, not a failure.
    pub async fn send_ticket(&self, host: &str, message: &TicketMessage) -> bool {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(host = %host, error = %e, "Failed to serialize websocket message");
                return false;
            }
        };

        let clients = self.clients.read().await;
        match clients.get(host) {
            Some(entry) => match entry.sender.send(Message::Text(text)) {
                Ok(()) => true,
                Err(_) => {
                    debug!(host = %host, "Websocket client channel closed, dropping message");
                    false
                }
            },
            None => {
                debug!(host = %host, "No websocket client for host, dropping message");
                false
            }
        }
    }

    pub async fn is_connected(&self, host: &str) -> bool {
        self.clients.read().await.contains_key(host)
    }

    pub async fn connected_clients(&self) -> usize {
        self.clients.read().await.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub host: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let host = query
        .host
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::validation_error("missing host query parameter"))?;

    Ok(ws.on_upgrade(move |socket| async move {
        if let Err(e) = handle_socket(socket, host.clone(), state).await {
            warn!(host = %host, error = %e, "Websocket connection ended with error");
        }
    }))
}

async fn handle_socket(socket: WebSocket, host: String, state: AppState) -> anyhow::Result<()> {
    let (mut sink, mut stream) = socket.split();
    let (connection_id, mut outbound) = state.ws_pool.register(&host).await;

    let mut keepalive = tokio::time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
    keepalive.tick().await;

    let result = loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        break Err(anyhow::anyhow!("send failed: {e}"));
                    }
                }
                // Sender replaced by a reconnect; this task is done.
                None => break Ok(()),
            },
            _ = keepalive.tick() => {
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    break Err(anyhow::anyhow!("keepalive failed: {e}"));
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                // Clients only listen on this socket; inbound frames are
                // drained to keep the connection healthy.
                Some(Ok(_)) => {}
                Some(Err(e)) => break Err(anyhow::anyhow!("receive failed: {e}")),
            },
        }
    };

    state.ws_pool.unregister(&host, connection_id).await;
    result
}
