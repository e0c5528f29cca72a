//! Route tables and shared handler plumbing.

pub mod groups;
pub mod students;
pub mod tasks;

use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use minibrs_core::Services;

use crate::error::ApiError;

pub type AppState = Arc<Services>;

pub fn api() -> Router<AppState> {
    Router::new()
        .merge(groups::routes())
        .merge(students::routes())
        .merge(tasks::routes())
}

/// Run a storage call on the blocking pool.
pub(crate) async fn blocking<T, F>(services: &AppState, call: F) -> Result<T, ApiError>
where
    F: FnOnce(&Services) -> minibrs_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let services = Arc::clone(services);
    Ok(tokio::task::spawn_blocking(move || call(&services)).await??)
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::bad_request("Invalid UUID format"))
}

/// A required string field: missing or blank gives 400 with `message`.
pub(crate) fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(message)),
    }
}
