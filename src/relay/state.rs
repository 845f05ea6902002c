use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::models::Session;
use crate::store::CHANGE_CHANNEL_CAPACITY;

/// Shared state of the relay: the one session record plus the fan-out
/// channel feeding every websocket subscriber.
pub struct AppState {
    pub record: RwLock<Option<Session>>,
    pub changes: broadcast::Sender<Option<Session>>,
    /// Currently attached change-feed subscribers, for diagnostics.
    pub n_subscribers: AtomicU32,
}

impl AppState {
    pub fn new() -> Arc<Self> {
        let (changes, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Arc::new(AppState {
            record: RwLock::new(None),
            changes,
            n_subscribers: AtomicU32::new(0),
        })
    }

    /// Replace the record and notify subscribers. Last write wins, matching
    /// the store contract the protocol is written against.
    pub async fn replace(&self, record: Option<Session>) {
        {
            let mut current = self.record.write().await;
            *current = record.clone();
        }
        let _ = self.changes.send(record);
    }
}
