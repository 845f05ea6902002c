use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One student device's membership record within a session.
///
/// Created on first join, updated in place on rejoin to the same session,
/// and marked inactive (never deleted) when its `last_seen` goes stale.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Stable per-device identifier, generated once and persisted locally.
    pub id: String,
    pub name: String,
    /// Visibility/foreground flag reported by the student client.
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Participant {
    pub fn join(id: String, name: String) -> Self {
        let now = Utc::now();
        Participant {
            id,
            name,
            is_active: true,
            joined_at: now,
            last_seen: now,
        }
    }

    /// Refresh liveness on a heartbeat tick. `joined_at` is preserved.
    pub fn touch(&mut self, visible: bool) {
        self.is_active = visible;
        self.last_seen = Utc::now();
    }
}
