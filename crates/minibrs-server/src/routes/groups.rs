use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use minibrs_core::{Group, GroupReport};

use super::{AppState, blocking, parse_uuid, required};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct GroupRequest {
    name: Option<String>,
    /// Missing means 0, which fails course validation.
    #[serde(default)]
    course: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/groups",
            get(list).post(create).put(missing_id).delete(missing_id),
        )
        .route("/api/groups/{id}", get(show).put(update).delete(remove))
        .route("/api/groups/{id}/report", get(report))
}

async fn list(State(services): State<AppState>) -> Result<Json<Vec<Group>>, ApiError> {
    let groups = blocking(&services, |s| s.groups.get_all_groups()).await?;
    Ok(Json(groups))
}

async fn show(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Group>, ApiError> {
    let id = parse_uuid(&id)?;
    let group = blocking(&services, move |s| s.groups.get_group_by_id(id)).await?;
    Ok(Json(group))
}

async fn create(
    State(services): State<AppState>,
    payload: Result<Json<GroupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Group>), ApiError> {
    let Json(request) = payload?;
    let name = required(request.name.as_deref(), "Group name is required")?.to_string();
    let course = request.course;
    let group = blocking(&services, move |s| s.groups.create_group(&name, course)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn update(
    State(services): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<GroupRequest>, JsonRejection>,
) -> Result<Json<Group>, ApiError> {
    let id = parse_uuid(&id)?;
    let Json(request) = payload?;
    let name = required(request.name.as_deref(), "Group name is required")?.to_string();
    let course = request.course;
    let group = blocking(&services, move |s| s.groups.update_group(id, &name, course)).await?;
    Ok(Json(group))
}

async fn remove(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_uuid(&id)?;
    blocking(&services, move |s| s.groups.delete_group(id)).await?;
    Ok(Json(json!({ "message": "Group deleted successfully" })))
}

async fn report(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<GroupReport>, ApiError> {
    let id = parse_uuid(&id)?;
    let report = blocking(&services, move |s| s.groups.get_group_report(id)).await?;
    Ok(Json(report))
}

async fn missing_id() -> ApiError {
    ApiError::bad_request("Group ID required")
}
