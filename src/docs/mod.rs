use utoipa::OpenApi;

use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Relay is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Relay diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Relay diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Read the current session record
#[utoipa::path(
    get,
    path = "/api/v1/session",
    responses(
        (status = 200, description = "Current session record, or null when none is held", body = Session)
    )
)]
#[allow(dead_code)]
pub async fn get_session_doc() {}

/// Replace the session record
#[utoipa::path(
    put,
    path = "/api/v1/session",
    request_body = Session,
    responses(
        (status = 204, description = "Record replaced and broadcast"),
        (status = 400, description = "Malformed record", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn put_session_doc() {}

/// Drop the session record
#[utoipa::path(
    delete,
    path = "/api/v1/session",
    responses(
        (status = 204, description = "Record dropped")
    )
)]
#[allow(dead_code)]
pub async fn delete_session_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        diagnostics_doc,
        get_session_doc,
        put_session_doc,
        delete_session_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            Session,
            Participant,
            TextSelection,
            AnimationState
        )
    ),
    tags(
        (name = "relay", description = "Session relay endpoints")
    )
)]
pub struct ApiDoc;
