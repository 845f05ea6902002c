use axum::{routing::get, Router};
use std::panic;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use classcast::config::Config;
use classcast::docs::ApiDoc;
use classcast::relay::{ws::change_feed_handler, AppState};
use classcast::routes::create_api_routes;

#[tokio::main(flavor = "current_thread")]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "classcast=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting session relay...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Shared relay state: the session record plus the change fan-out
    let app_state = AppState::new();

    // Create API routes
    let api_routes = create_api_routes(app_state.clone());

    // Change feed for store adapters
    let ws_routes = Router::new()
        .route("/ws/session", get(change_feed_handler))
        .with_state(app_state);

    // Combine all routes
    let app_routes = Router::new()
        // Mount API routes
        .nest("/api", api_routes)
        .merge(ws_routes)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Tracing and CORS layers
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start the HTTP/WS server
    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("Relay running on http://{}", config.server_address());
    info!("Change feed available at ws://{}/ws/session", config.server_address());
    info!("Swagger UI available at http://{}/swagger", config.server_address());

    axum::serve(listener, app_routes)
        .await
        .expect("Relay failed to start");
}
