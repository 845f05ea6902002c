use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{delete_session, diagnostics, get_session, health_check, put_session};
use crate::relay::AppState;

/// Create API routes
pub fn create_api_routes(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health_check))
        .route("/v1/diagnostics", get(diagnostics))
        .route(
            "/v1/session",
            get(get_session).put(put_session).delete(delete_session),
        )
        .with_state(app_state)
}
