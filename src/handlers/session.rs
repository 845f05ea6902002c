use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use crate::models::{ErrorResponse, Session};
use crate::relay::AppState;

/// Read the current session record
///
/// Returns JSON `null` when no record is held; "no session" is a normal
/// answer here, not an error.
pub async fn get_session(
    State(app_state): State<Arc<AppState>>,
) -> Json<Option<Session>> {
    let record = app_state.record.read().await.clone();
    Json(record)
}

/// Replace the session record
///
/// Whole-record replacement, last write wins. The relay does not arbitrate
/// between writers; that matches the store contract the protocol assumes.
pub async fn put_session(
    State(app_state): State<Arc<AppState>>,
    Json(session): Json<Session>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if session.id.is_empty() {
        let status = StatusCode::BAD_REQUEST;
        warn!("Rejected session write with empty id");
        return Err((
            status,
            Json(ErrorResponse::new(status, "Session id must not be empty")),
        ));
    }
    app_state.replace(Some(session)).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Drop the session record
pub async fn delete_session(State(app_state): State<Arc<AppState>>) -> StatusCode {
    info!("Session record deleted");
    app_state.replace(None).await;
    StatusCode::NO_CONTENT
}
