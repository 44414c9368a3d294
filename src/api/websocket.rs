//! Live notification push.
//!
//! `GET /ws/:compteId` upgrades to a WebSocket that receives every stored
//! notification for that account as a JSON text frame.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use crate::domain::{AccountId, InboxNotification};

use super::AppState;

pub async fn notifications_ws(
    ws: WebSocketUpgrade,
    Path(account_id): Path<AccountId>,
    State(state): State<AppState>,
) -> Response {
    let live = state.feed.subscribe();
    ws.on_upgrade(move |socket| push_notifications(socket, account_id, live))
}

async fn push_notifications(
    socket: WebSocket,
    account_id: AccountId,
    mut live: broadcast::Receiver<InboxNotification>,
) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(account_id, "websocket subscriber connected");

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                // Pings are answered by axum; anything else is ignored.
                Some(Ok(_)) => {}
            },
            notification = live.recv() => match notification {
                Ok(notification) if notification.account_id == account_id => {
                    let text = match serde_json::to_string(&notification) {
                        Ok(text) => text,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to encode notification");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(account_id, skipped, "websocket subscriber lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    tracing::debug!(account_id, "websocket subscriber disconnected");
}
