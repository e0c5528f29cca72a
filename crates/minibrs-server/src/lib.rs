//! MiniBRS HTTP server: a JSON API over the core services.

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use minibrs_core::Services;

pub use error::ApiError;

/// Build the API router, mounted under `context_path` (`/` mounts at the root).
pub fn router(services: Arc<Services>, context_path: &str) -> Router {
    let api = routes::api().with_state(services);
    let app = match context_path.trim_end_matches('/') {
        "" => api,
        prefix => Router::new().nest(prefix, api),
    };
    app.layer(TraceLayer::new_for_http())
}
