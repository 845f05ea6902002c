use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::models::Session;
use crate::store::{SessionStore, StoreError, CHANGE_CHANNEL_CAPACITY};

/// In-process store backed by a `RwLock` and a broadcast channel.
///
/// Serves single-process deployments (teacher and students in one runtime)
/// and every test. Notification is push: each successful write fans the new
/// record out to all subscribers.
pub struct MemoryStore {
    record: RwLock<Option<Session>>,
    changes: broadcast::Sender<Option<Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _rx) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        MemoryStore {
            record: RwLock::new(None),
            changes,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn write(&self, session: &Session) -> Result<(), StoreError> {
        {
            let mut record = self.record.write().await;
            *record = Some(session.clone());
        }
        debug!("Session record written: {}", session.id);
        // Nobody listening is fine.
        let _ = self.changes.send(Some(session.clone()));
        Ok(())
    }

    async fn read_active(&self) -> Result<Option<Session>, StoreError> {
        let record = self.record.read().await;
        Ok(record.clone().filter(|s| s.is_active))
    }

    fn subscribe(&self) -> broadcast::Receiver<Option<Session>> {
        self.changes.subscribe()
    }
}
