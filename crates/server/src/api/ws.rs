//! WebSocket change stream for live queue displays.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};

use ghiseu_core::{ChangeKind, TicketChange};

use super::response::TicketResponse;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Idle connections get a heartbeat this often.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// A ticket was created or changed; carries the ticket after the change.
    TicketChanged {
        kind: ChangeKind,
        ticket: TicketResponse,
    },
    /// Server heartbeat (unix seconds).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    /// Metric label: the change kind for ticket changes.
    fn type_label(&self) -> &'static str {
        match self {
            WsMessage::TicketChanged { kind, .. } => kind.as_str(),
            WsMessage::Heartbeat { .. } => "heartbeat",
        }
    }
}

impl From<TicketChange> for WsMessage {
    fn from(change: TicketChange) -> Self {
        WsMessage::TicketChanged {
            kind: change.kind,
            ticket: TicketResponse::from(change.ticket),
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut rx = state.notifier().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let send_task = tokio::spawn(async move {
        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_INTERVAL, HEARTBEAT_INTERVAL);

        loop {
            let msg = tokio::select! {
                result = rx.recv() => match result {
                    Ok(change) => WsMessage::from(change),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("WebSocket client lagged, skipped {} changes", n);
                        WS_LAG_EVENTS.inc();
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Change stream closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => WsMessage::Heartbeat {
                    timestamp: chrono::Utc::now().timestamp(),
                },
            };

            WS_MESSAGES_SENT.with_label_values(&[msg.type_label()]).inc();

            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize WsMessage: {}", e);
                }
            }
        }
    });

    // Clients only listen; drain until they go away
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Ignoring client text message: {}", text.as_str());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ghiseu_core::{Ticket, TicketStatus};

    #[test]
    fn test_change_serializes_with_type_tag() {
        let now = Utc::now();
        let change = TicketChange {
            kind: ChangeKind::Claimed,
            ticket: Ticket {
                id: 7,
                desk_id: 1,
                number: 3,
                status: TicketStatus::InProgress,
                operator: Some("op-1".to_string()),
                close_reason: None,
                created_at: now,
                modified_at: now,
            },
        };

        let msg = WsMessage::from(change);
        assert_eq!(msg.type_label(), "claimed");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "ticket_changed");
        assert_eq!(json["kind"], "claimed");
        assert_eq!(json["ticket"]["id"], 7);
        assert_eq!(json["ticket"]["status"], "in_progress");
        assert_eq!(json["ticket"]["operator"], "op-1");
    }

    #[test]
    fn test_heartbeat_label() {
        let msg = WsMessage::Heartbeat { timestamp: 0 };
        assert_eq!(msg.type_label(), "heartbeat");
        assert_eq!(serde_json::to_value(&msg).unwrap()["type"], "heartbeat");
    }
}
