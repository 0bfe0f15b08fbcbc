//! WebSocket feed of workflow events
//!
//! Clients subscribe to entity ids (an order, a ticket, a return...) and
//! receive an event each time one of them is created, changes status or, for
//! tickets, gets a reply. An empty subscription list receives everything.
//! Events carry ids and statuses only.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

/// Something observable happened to a workflow entity
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowEvent {
    Created {
        entity: &'static str,
        entity_id: Uuid,
        status: String,
    },
    StatusChanged {
        entity: &'static str,
        entity_id: Uuid,
        from: String,
        to: String,
    },
    TicketReplied {
        entity_id: Uuid,
        reply_id: Uuid,
        is_staff: bool,
    },
}

impl WorkflowEvent {
    pub fn entity_id(&self) -> Uuid {
        match self {
            WorkflowEvent::Created { entity_id, .. }
            | WorkflowEvent::StatusChanged { entity_id, .. }
            | WorkflowEvent::TicketReplied { entity_id, .. } => *entity_id,
        }
    }

    pub fn status_changed(
        entity: &'static str,
        entity_id: Uuid,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        WorkflowEvent::StatusChanged {
            entity,
            entity_id,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct WsState {
    pub tx: broadcast::Sender<WorkflowEvent>,
    /// client id -> subscribed entity ids
    clients: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    Subscribe { entity_ids: Vec<Uuid> },
    Unsubscribe { entity_ids: Vec<Uuid> },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    Event { event: WorkflowEvent },
    Subscribed { entity_ids: Vec<Uuid> },
    Unsubscribed { entity_ids: Vec<Uuid> },
    Pong,
    Error { message: String },
}

impl Default for WsState {
    fn default() -> Self {
        Self::new()
    }
}

impl WsState {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            tx,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fan an event out to connected clients. Having no clients is not an error.
    pub fn publish(&self, event: WorkflowEvent) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        if let Err(e) = self.tx.send(event) {
            tracing::warn!(error = %e, "Failed to broadcast workflow event");
        }
    }

    async fn register_client(&self, client_id: Uuid) {
        self.clients.write().await.insert(client_id, HashSet::new());
        tracing::debug!(client_id = %client_id, "WebSocket client connected");
    }

    async fn unregister_client(&self, client_id: Uuid) {
        self.clients.write().await.remove(&client_id);
        tracing::debug!(client_id = %client_id, "WebSocket client disconnected");
    }

    async fn subscribe(&self, client_id: Uuid, ids: &[Uuid]) {
        if let Some(subs) = self.clients.write().await.get_mut(&client_id) {
            subs.extend(ids.iter().copied());
        }
    }

    async fn unsubscribe(&self, client_id: Uuid, ids: &[Uuid]) {
        if let Some(subs) = self.clients.write().await.get_mut(&client_id) {
            for id in ids {
                subs.remove(id);
            }
        }
    }

    async fn wants(&self, client_id: Uuid, event: &WorkflowEvent) -> bool {
        self.clients
            .read()
            .await
            .get(&client_id)
            .map_or(false, |subs| subs.is_empty() || subs.contains(&event.entity_id()))
    }
}

/// Upgrade `/ws` to a WebSocket
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WsState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let client_id = Uuid::new_v4();
    state.register_client(client_id).await;

    let (mut sender, mut receiver) = socket.split();
    let (internal_tx, mut internal_rx) = mpsc::channel::<ServerMessage>(32);
    let mut rx = state.tx.subscribe();

    let send_state = state.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => {
                        if !send_state.wants(client_id, &event).await {
                            continue;
                        }
                        ServerMessage::Event { event }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(client_id = %client_id, skipped, "WebSocket client lagging");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(msg) = internal_rx.recv() => msg,
                else => break,
            };

            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode WebSocket message"),
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let text = match msg {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Subscribe { entity_ids }) => {
                    recv_state.subscribe(client_id, &entity_ids).await;
                    ServerMessage::Subscribed { entity_ids }
                }
                Ok(ClientMessage::Unsubscribe { entity_ids }) => {
                    recv_state.unsubscribe(client_id, &entity_ids).await;
                    ServerMessage::Unsubscribed { entity_ids }
                }
                Ok(ClientMessage::Ping) => ServerMessage::Pong,
                Err(e) => ServerMessage::Error {
                    message: format!("Unrecognized message: {}", e),
                },
            };

            if internal_tx.send(reply).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.unregister_client(client_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filtering() {
        let state = WsState::new();
        let client = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        state.register_client(client).await;

        let event = WorkflowEvent::status_changed("order", order_id, "pending", "confirmed");
        assert!(state.wants(client, &event).await);

        state.subscribe(client, &[Uuid::new_v4()]).await;
        assert!(!state.wants(client, &event).await);

        state.subscribe(client, &[order_id]).await;
        assert!(state.wants(client, &event).await);

        state.unregister_client(client).await;
        assert!(!state.wants(client, &event).await);
    }

    #[tokio::test]
    async fn test_publish_reaches_receivers() {
        let state = WsState::new();
        let mut rx = state.tx.subscribe();
        let id = Uuid::new_v4();

        state.publish(WorkflowEvent::Created {
            entity: "ticket",
            entity_id: id,
            status: "open".to_string(),
        });

        assert_eq!(rx.recv().await.unwrap().entity_id(), id);
    }

    #[test]
    fn test_event_serialization() {
        let event = WorkflowEvent::status_changed("return", Uuid::nil(), "pending", "approved");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "status_changed");
        assert_eq!(json["entity"], "return");
        assert_eq!(json["to"], "approved");
    }
}
