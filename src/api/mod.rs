//! API module
//!
//! HTTP API endpoints and middleware.

pub mod middleware;
pub mod routes;

pub use routes::{create_router, AppState};

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // Axum layers run last-added first: context -> logging -> handler
    let api_routes = create_router()
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(axum_middleware::from_fn(middleware::context_middleware));

    Router::new()
        .route("/health", get(routes::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
