//! Route definitions for the Porter HTTP API.
//!
//! All routes are mounted under `/api`. The router receives `AppState`
//! and passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let max_body = state.config.server.max_body_size_bytes as usize;
    let cors = build_cors_layer(&state);

    let api_routes = Router::new()
        .merge(target_routes())
        .merge(transfer_routes())
        .merge(job_routes())
        .merge(health_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Target browsing and per-target job creation.
fn target_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/targets/{target}/resources",
            get(handlers::targets::list_resources),
        )
        .route(
            "/targets/{target}/resources/{resource_id}",
            get(handlers::targets::get_resource),
        )
        .route(
            "/targets/{target}/resources/{resource_id}/download",
            post(handlers::download::start_download),
        )
        .route(
            "/targets/{target}/upload",
            post(handlers::upload::start_upload),
        )
}

/// Cross-target transfers.
fn transfer_routes() -> Router<AppState> {
    Router::new().route("/transfers", post(handlers::transfer::start_transfer))
}

/// Job polling, artifact retrieval, and cancellation.
fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/{ticket}", get(handlers::job::get_status))
        .route("/jobs/{ticket}", patch(handlers::job::cancel))
        .route("/jobs/{ticket}/download", get(handlers::job::get_artifact))
}

/// Health check endpoint (no token required).
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health_check))
}

/// Build CORS layer from configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    use axum::http::{HeaderValue, Method};
    use tower_http::cors::Any;

    let cors_config = &state.config.server.cors;
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(cors_config.max_age_seconds));

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    cors
}
