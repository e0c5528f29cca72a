use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use minibrs_core::{Student, Task};

use super::{AppState, blocking, parse_uuid, required};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRequest {
    name: Option<String>,
    group_id: Option<String>,
}

impl StudentRequest {
    fn into_parts(self) -> Result<(String, uuid::Uuid), ApiError> {
        let name = required(self.name.as_deref(), "Student name is required")?.to_string();
        let group_id = required(self.group_id.as_deref(), "Group ID is required")?;
        Ok((name, parse_uuid(group_id)?))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/students",
            get(list).post(create).put(missing_id).delete(missing_id),
        )
        .route("/api/students/group/{group_id}", get(list_by_group))
        .route("/api/students/{id}", get(show).put(update).delete(remove))
        .route("/api/students/{id}/tasks", get(tasks))
}

async fn list(State(services): State<AppState>) -> Result<Json<Vec<Student>>, ApiError> {
    let students = blocking(&services, |s| s.students.get_all_students()).await?;
    Ok(Json(students))
}

async fn list_by_group(
    State(services): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<Student>>, ApiError> {
    let group_id = parse_uuid(&group_id)?;
    let students = blocking(&services, move |s| s.students.get_students_by_group(group_id)).await?;
    Ok(Json(students))
}

async fn show(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Student>, ApiError> {
    let id = parse_uuid(&id)?;
    let student = blocking(&services, move |s| s.students.get_student_by_id(id)).await?;
    Ok(Json(student))
}

async fn create(
    State(services): State<AppState>,
    payload: Result<Json<StudentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let Json(request) = payload?;
    let (name, group_id) = request.into_parts()?;
    let student = blocking(&services, move |s| s.students.create_student(&name, group_id)).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn update(
    State(services): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StudentRequest>, JsonRejection>,
) -> Result<Json<Student>, ApiError> {
    let id = parse_uuid(&id)?;
    let Json(request) = payload?;
    let (name, group_id) = request.into_parts()?;
    let student = blocking(&services, move |s| {
        s.students.update_student(id, &name, Some(group_id))
    })
    .await?;
    Ok(Json(student))
}

async fn remove(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_uuid(&id)?;
    blocking(&services, move |s| s.students.delete_student(id)).await?;
    Ok(Json(json!({ "message": "Student deleted successfully" })))
}

async fn tasks(
    State(services): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let id = parse_uuid(&id)?;
    let tasks = blocking(&services, move |s| s.students.get_student_tasks(id)).await?;
    Ok(Json(tasks))
}

async fn missing_id() -> ApiError {
    ApiError::not_found("Student ID required")
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::test_support::{app, send, services};

    #[tokio::test]
    async fn test_student_lifecycle() {
        let services = services();
        let group = services.groups.create_group("IT-21", 2).unwrap();
        let app = app(&services);

        let (status, created) = send(
            &app,
            Method::POST,
            "/api/students",
            Some(json!({ "name": "Ivan Petrov", "groupId": group.id.to_string() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["groupId"], group.id.to_string());
        let id = created["id"].as_str().unwrap().to_string();

        let (status, tasks) = send(&app, Method::GET, &format!("/api/students/{id}/tasks"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tasks.as_array().unwrap().len(), 3);
        assert!(tasks.as_array().unwrap().iter().all(|t| t["status"] == "NOT_SUBMITTED"));

        let (status, members) =
            send(&app, Method::GET, &format!("/api/students/group/{}", group.id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(members[0]["name"], "Ivan Petrov");

        let (status, updated) = send(
            &app,
            Method::PUT,
            &format!("/api/students/{id}"),
            Some(json!({ "name": "Ivan Sidorov", "groupId": group.id.to_string() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "Ivan Sidorov");

        let (status, body) = send(&app, Method::DELETE, &format!("/api/students/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Student deleted successfully");
        assert_eq!(services.tasks.get_total_tasks_count().unwrap(), 0);

        let (status, _) = send(&app, Method::GET, &format!("/api/students/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_student_request_errors() {
        let services = services();
        let app = app(&services);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/students",
            Some(json!({ "groupId": uuid::Uuid::new_v4().to_string() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Student name is required");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/students",
            Some(json!({ "name": "Ivan" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Group ID is required");

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/students",
            Some(json!({ "name": "Ivan", "groupId": uuid::Uuid::new_v4().to_string() })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().starts_with("Group not found"));

        for method in [Method::PUT, Method::DELETE] {
            let (status, body) = send(&app, method, "/api/students", None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Student ID required");
        }
    }
}
