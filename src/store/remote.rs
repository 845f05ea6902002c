use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::Session;
use crate::store::{SessionStore, StoreError, CHANGE_CHANNEL_CAPACITY};

const RECONNECT_DELAY_MS: u64 = 1000;

/// Store adapter speaking to a session relay over HTTP and WebSocket.
///
/// Reads and writes go through the relay's REST endpoints; a background
/// task keeps a WebSocket open to the relay's change feed and forwards
/// every pushed record into the local broadcast channel. Connection loss is
/// logged and retried; consumers fall back to their own polling cadence in
/// the meantime.
pub struct RemoteStore {
    http: reqwest::Client,
    session_url: String,
    changes: broadcast::Sender<Option<Session>>,
    feed_token: CancellationToken,
}

impl RemoteStore {
    /// `base_url` like `http://relay:3000`, `ws_url` like
    /// `ws://relay:3000/ws/session`.
    pub fn connect(base_url: &str, ws_url: &str) -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let feed_token = CancellationToken::new();

        let feed_changes = changes.clone();
        let feed_url = ws_url.to_string();
        let token = feed_token.clone();
        tokio::spawn(async move {
            run_change_feed(feed_url, feed_changes, token).await;
        });

        RemoteStore {
            http: reqwest::Client::new(),
            session_url: format!("{}/api/v1/session", base_url.trim_end_matches('/')),
            changes,
            feed_token,
        }
    }

    /// Drop the relay's record entirely. Used by a teacher client cleaning
    /// up after `end_session`; never required for correctness.
    pub async fn delete(&self) -> Result<(), StoreError> {
        self.http
            .delete(&self.session_url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(())
    }
}

impl Drop for RemoteStore {
    fn drop(&mut self) {
        self.feed_token.cancel();
    }
}

#[async_trait]
impl SessionStore for RemoteStore {
    async fn write(&self, session: &Session) -> Result<(), StoreError> {
        self.http
            .put(&self.session_url)
            .json(session)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(())
    }

    async fn read_active(&self) -> Result<Option<Session>, StoreError> {
        let record: Option<Session> = self
            .http
            .get(&self.session_url)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(record.filter(|s| s.is_active))
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<Session>> {
        self.changes.subscribe()
    }
}

/// Keep the relay change feed open, forwarding pushed records locally.
async fn run_change_feed(
    ws_url: String,
    changes: broadcast::Sender<Option<Session>>,
    token: CancellationToken,
) {
    loop {
        if token.is_cancelled() {
            return;
        }
        match connect_async(ws_url.as_str()).await {
            Ok((stream, _resp)) => {
                info!("Connected to relay change feed at {}", ws_url);
                let (_write, mut read) = stream.split();
                loop {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        msg = read.next() => match msg {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<Option<Session>>(text.as_str()) {
                                    Ok(record) => {
                                        let _ = changes.send(record);
                                    }
                                    Err(e) => {
                                        // Tolerated: consumers re-read on their next poll.
                                        warn!("Discarding malformed change-feed message: {}", e);
                                    }
                                }
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                warn!("Relay change feed error: {}", e);
                                break;
                            }
                            None => {
                                debug!("Relay change feed closed");
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to reach relay change feed at {}: {}", ws_url, e);
            }
        }
        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_millis(RECONNECT_DELAY_MS)) => {}
        }
    }
}
