use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use minibrs_core::{Task, TaskStatus};

use super::{AppState, blocking, parse_uuid, required};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list))
        .route("/api/tasks/{id}", get(show).put(update_status))
}

fn parse_status(raw: &str) -> Result<TaskStatus, ApiError> {
    raw.parse::<TaskStatus>().map_err(ApiError::bad_request)
}

async fn list(
    State(services): State<AppState>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let status = filter.status.as_deref().map(parse_status).transpose()?;
    let tasks = blocking(&services, move |s| match status {
        Some(status) => s.tasks.get_tasks_by_status(status),
        None => s.tasks.get_all_tasks(),
    })
    .await?;
    Ok(Json(tasks))
}

async fn show(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_uuid(&id)?;
    let task = blocking(&services, move |s| s.tasks.get_task_by_id(id)).await?;
    Ok(Json(task))
}

async fn update_status(
    State(services): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_uuid(&id)?;
    let Json(request) = payload?;
    let status = parse_status(required(request.status.as_deref(), "Task status is required")?)?;
    let task = blocking(&services, move |s| s.tasks.update_task_status(id, status)).await?;
    Ok(Json(task))
}
