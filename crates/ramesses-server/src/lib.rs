//! HTTP ingestion shell: accepts payloads into the queue and exposes
//! read-only views of it. Store calls block, so handlers run them on the
//! blocking pool.

mod error;
mod routes;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use ramesses_core::Queue;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub queue: Queue,
    /// Window used to tell in-flight claims from stale ones in `/jobs/stats`.
    pub visibility_timeout: Duration,
}

/// Build the router for `/jobs`, `/jobs/all` and `/jobs/stats`. Methods a
/// route does not serve get a plain-text 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/jobs",
            post(routes::enqueue).fallback(error::method_not_allowed),
        )
        .route(
            "/jobs/all",
            get(routes::list_all).fallback(error::method_not_allowed),
        )
        .route(
            "/jobs/stats",
            get(routes::stats).fallback(error::method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
