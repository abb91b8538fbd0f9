//! Route Configuration
//!
//! Configures all HTTP routes and the middleware stack.

use axum::{
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{
    create_cors_layer, create_security_headers_layer, rate_limit, track_http_metrics,
};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let mut router = Router::new()
        .merge(upgrade_routes(state.clone()))
        .nest("/api", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler));

    if let Some(dir) = settings.server.static_dir.as_deref() {
        let index = std::path::Path::new(dir).join("index.html");
        router = router.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }

    router
        .layer(middleware::from_fn(track_http_metrics))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(&settings.cors))
        // Outermost so headers are added to all responses
        .layer(create_security_headers_layer(&settings.security))
        .with_state(state)
}

/// WebSocket upgrade route, rate limited per client address
fn upgrade_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(&state.settings.websocket.path, get(ws_handler))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

/// API routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/rooms", get(handlers::rooms::list_rooms))
        .route_layer(middleware::from_fn_with_state(state, rate_limit))
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}
