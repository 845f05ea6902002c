use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for health check
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Response for relay diagnostics
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Whether an active session record is currently held.
    pub has_session: bool,
    /// True when the held record also passes the heartbeat staleness check.
    pub session_live: bool,
    /// Subscribers currently attached to the change feed.
    pub n_subscribers: u32,
    /// Participants registered in the held record.
    pub n_participants: u32,
    /// Participants whose own `lastSeen` is within the presence window.
    pub n_participants_present: u32,
}
