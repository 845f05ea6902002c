pub mod memory;
pub mod remote;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::Session;

pub use memory::MemoryStore;
pub use remote::RemoteStore;

/// Capacity of the change-notification channel. A lagged subscriber is not
/// an error; it simply re-reads the current record on its next tick.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
    #[error("store rejected write: {0}")]
    Rejected(String),
    #[error("malformed session record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Contract over the shared-state backend carrying session records.
///
/// The backend offers no transactions, no compare-and-swap, and no ordering
/// guarantee between writers. Callers must read-modify-write the whole
/// record and tolerate losing one of their own writes; the periodic
/// heartbeat loops are the retry mechanism.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the full record. No partial patch semantics.
    async fn write(&self, session: &Session) -> Result<(), StoreError>;

    /// Current record if one exists and is flagged active.
    async fn read_active(&self) -> Result<Option<Session>, StoreError>;

    /// Asynchronous change notifications. Dropping the receiver
    /// unsubscribes. Delivery is at-least-eventually, not ordered.
    fn subscribe(&self) -> broadcast::Receiver<Option<Session>>;
}
