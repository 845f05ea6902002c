use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::presence;
use crate::relay::AppState;

/// Relay diagnostics: what is held, whether it is live, who is watching.
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    let now = Utc::now();
    let record = app_state.record.read().await;

    let (has_session, session_live, n_participants, n_participants_present) = match record.as_ref()
    {
        Some(session) => (
            true,
            presence::is_live(session, now),
            session.connected_students.len() as u32,
            session
                .connected_students
                .iter()
                .filter(|p| presence::participant_is_present(p, now))
                .count() as u32,
        ),
        None => (false, false, 0, 0),
    };
    let n_subscribers = app_state.n_subscribers.load(Ordering::SeqCst);

    info!(
        "Diagnostics: session={}, live={}, subscribers={}, participants={}/{}",
        has_session, session_live, n_subscribers, n_participants_present, n_participants
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            has_session,
            session_live,
            n_subscribers,
            n_participants,
            n_participants_present,
        }),
    )
}
