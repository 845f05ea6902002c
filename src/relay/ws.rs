use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::relay::state::AppState;
use crate::utils::scope_guard::ScopeGuard;

/// Change-feed WebSocket handler
pub async fn change_feed_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New change-feed connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Serve one subscriber: send the current record on connect, then forward
/// every change until the client goes away. Subscribers never write.
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let connection_id = Uuid::new_v4().to_string();
    info!("Change-feed subscriber connected: {}", connection_id);

    app_state.n_subscribers.fetch_add(1, Ordering::SeqCst);
    let counted = app_state.clone();
    let _guard = ScopeGuard::new(move || {
        counted.n_subscribers.fetch_sub(1, Ordering::SeqCst);
    });

    let (mut sender, mut receiver) = socket.split();
    let mut changes = app_state.changes.subscribe();

    // Initial snapshot so a late joiner does not wait for the next write.
    let snapshot = app_state.record.read().await.clone();
    let initial = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize snapshot for {}: {}", connection_id, e);
            return;
        }
    };
    if sender.send(Message::Text(initial)).await.is_err() {
        debug!("Subscriber {} gone before snapshot", connection_id);
        return;
    }

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                Ok(record) => {
                    let json = match serde_json::to_string(&record) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize change: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Re-send the current record; intermediate states are
                    // deltas the protocol can skip.
                    debug!("Subscriber {} lagged by {}, sending snapshot", connection_id, skipped);
                    let snapshot = app_state.record.read().await.clone();
                    let json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "null".into());
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!("Subscriber {} socket error: {}", connection_id, e);
                    break;
                }
            },
        }
    }
    info!("Change-feed subscriber disconnected: {}", connection_id);
}
