use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use deck_core::{ChangeOrigin, TaskId, TaskStatus};
use deck_store::{CompleteInterview, InterviewOutcome, NewTask};

use crate::error::BridgeError;
use crate::model::{
    CreateRequirementRequest, ListTasksQuery, NextTaskResponse, RequirementDocResponse,
    RequirementListResponse, RequirementsPathResponse, StatusChangeRequest, TaskDetailResponse,
    TaskListResponse, TaskView,
};
use crate::state::BridgeState;

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/next", get(next_task))
        .route("/tasks/{task_id}", get(get_task))
        .route("/tasks/{task_id}/status", patch(update_status))
        .route("/tasks/{task_id}/requirement", get(task_requirement))
        .route("/requirements", get(list_requirements).post(create_requirement))
        .route("/requirements/path", get(requirements_path))
        .route("/interview/complete", post(complete_interview))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn list_tasks(
    State(state): State<BridgeState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, BridgeError> {
    let status = query
        .status
        .as_deref()
        .map(TaskStatus::from_str)
        .transpose()
        .map_err(BridgeError::Validation)?;
    let tasks = state.store().list_tasks(status, query.limit).await;
    let views = tasks.iter().map(TaskView::from).collect::<Vec<_>>();
    Ok(Json(TaskListResponse { tasks: views }))
}

async fn create_task(
    State(state): State<BridgeState>,
    Json(request): Json<NewTask>,
) -> Result<Json<TaskDetailResponse>, BridgeError> {
    let task = state.store().create_task(request).await?;
    Ok(Json(TaskDetailResponse {
        task: TaskView::from(&task),
    }))
}

async fn next_task(
    State(state): State<BridgeState>,
) -> Result<Json<NextTaskResponse>, BridgeError> {
    let task = state.store().next_task().await;
    Ok(Json(NextTaskResponse {
        task: task.as_ref().map(TaskView::from),
    }))
}

async fn get_task(
    State(state): State<BridgeState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskDetailResponse>, BridgeError> {
    let task = state.store().get_task(&TaskId::new(task_id)).await?;
    Ok(Json(TaskDetailResponse {
        task: TaskView::from(&task),
    }))
}

async fn update_status(
    State(state): State<BridgeState>,
    Path(task_id): Path<String>,
    Json(request): Json<StatusChangeRequest>,
) -> Result<Json<TaskDetailResponse>, BridgeError> {
    let task = state
        .store()
        .update_task_status(&TaskId::new(task_id), request.status, ChangeOrigin::Agent)
        .await?;
    Ok(Json(TaskDetailResponse {
        task: TaskView::from(&task),
    }))
}

async fn task_requirement(
    State(state): State<BridgeState>,
    Path(task_id): Path<String>,
) -> Result<Json<RequirementDocResponse>, BridgeError> {
    let id = TaskId::new(task_id);
    let task = state.store().get_task(&id).await?;
    let path = task
        .requirement_path
        .ok_or_else(|| BridgeError::NotFound(format!("requirement:{id}")))?;
    let content = state.store().read_requirement(&path)?;
    Ok(Json(RequirementDocResponse { path, content }))
}

async fn list_requirements(
    State(state): State<BridgeState>,
) -> Result<Json<RequirementListResponse>, BridgeError> {
    let paths = state.store().list_requirements()?;
    Ok(Json(RequirementListResponse { paths }))
}

async fn create_requirement(
    State(state): State<BridgeState>,
    Json(request): Json<CreateRequirementRequest>,
) -> Result<Json<RequirementsPathResponse>, BridgeError> {
    let path = state
        .store()
        .write_requirement(&request.path, &request.content)?;
    Ok(Json(RequirementsPathResponse { path }))
}

async fn requirements_path(
    State(state): State<BridgeState>,
) -> Result<Json<RequirementsPathResponse>, BridgeError> {
    let path = state.store().paths().requirements_dir();
    Ok(Json(RequirementsPathResponse {
        path: path.display().to_string(),
    }))
}

async fn complete_interview(
    State(state): State<BridgeState>,
    Json(request): Json<CompleteInterview>,
) -> Result<Json<InterviewOutcome>, BridgeError> {
    let outcome = state.store().complete_interview(&request).await?;
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use deck_store::TaskStore;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_router(tmp: &TempDir) -> Router {
        let store = TaskStore::open(tmp.path()).expect("open store");
        router(BridgeState::new(store))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let tmp = TempDir::new().unwrap();
        let response = test_router(&tmp).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "ok": true }));
    }

    #[tokio::test]
    async fn create_then_list_and_get() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({ "title": "Fix header" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        let id = created["task"]["id"].as_str().unwrap().to_string();
        assert_eq!(created["task"]["status"], "todo");
        assert_eq!(created["task"]["rank"], 0);

        let response = app.clone().oneshot(get_request("/tasks")).await.unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed["tasks"].as_array().unwrap().len(), 1);

        let response = app
            .oneshot(get_request(&format!("/tasks/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["task"]["title"], "Fix header");
    }

    #[tokio::test]
    async fn next_task_is_null_on_empty_backlog() {
        let tmp = TempDir::new().unwrap();
        let response = test_router(&tmp)
            .oneshot(get_request("/tasks/next"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({ "task": null }));
    }

    #[tokio::test]
    async fn list_honors_status_filter_and_limit() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);
        for title in ["Fix header", "Add logout"] {
            app.clone()
                .oneshot(json_request(
                    "POST",
                    "/tasks",
                    serde_json::json!({ "title": title }),
                ))
                .await
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(get_request("/tasks?status=todo&limit=1"))
            .await
            .unwrap();
        let listed = body_json(response).await;
        let tasks = listed["tasks"].as_array().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0]["title"], "Fix header");
    }

    #[tokio::test]
    async fn unknown_status_filter_is_unprocessable() {
        let tmp = TempDir::new().unwrap();
        let response = test_router(&tmp)
            .oneshot(get_request("/tasks?status=blocked"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "validation");
        assert!(body["error"].as_str().unwrap().contains("blocked"));
    }

    #[tokio::test]
    async fn illegal_agent_transition_is_unprocessable_and_unapplied() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({ "title": "Fix header" }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["task"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/tasks/{id}/status"),
                serde_json::json!({ "status": "done" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(get_request(&format!("/tasks/{id}")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["task"]["status"], "todo");
    }

    #[tokio::test]
    async fn origin_field_in_the_body_cannot_escalate_to_operator() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({ "title": "Fix header" }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["task"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/tasks/{id}/status"),
                serde_json::json!({ "status": "done", "origin": "operator" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(get_request(&format!("/tasks/{id}")))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["task"]["status"], "todo");
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let response = test_router(&tmp)
            .oneshot(get_request("/tasks/T-missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["kind"], "not_found");
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_bad_request() {
        let tmp = TempDir::new().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/tasks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = test_router(&tmp).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn requirement_documents_round_trip_over_http() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/requirements",
                serde_json::json!({ "path": "requirements/auth.md", "content": "# Auth" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(get_request("/requirements")).await.unwrap();
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "paths": ["requirements/auth.md"] })
        );

        let response = app.oneshot(get_request("/requirements/path")).await.unwrap();
        let body = body_json(response).await;
        assert!(body["path"]
            .as_str()
            .unwrap()
            .ends_with(".deck/requirements"));
    }

    #[tokio::test]
    async fn task_requirement_follows_the_attached_path() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);

        app.clone()
            .oneshot(json_request(
                "POST",
                "/requirements",
                serde_json::json!({ "path": "requirements/auth.md", "content": "# Auth" }),
            ))
            .await
            .unwrap();
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({
                    "title": "Login",
                    "requirement_path": "requirements/auth.md"
                }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["task"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(get_request(&format!("/tasks/{id}/requirement")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["path"], "requirements/auth.md");
        assert_eq!(body["content"], "# Auth");
    }

    #[tokio::test]
    async fn task_without_requirement_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/tasks",
                serde_json::json!({ "title": "Fix header" }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["task"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(get_request(&format!("/tasks/{id}/requirement")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn interview_complete_applies_the_proposal() {
        let tmp = TempDir::new().unwrap();
        let app = test_router(&tmp);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/interview/complete",
                serde_json::json!({
                    "features": [{"title": "Auth"}],
                    "tasks": [{"title": "Login", "featureIndex": 0}],
                    "requirementDoc": "# Auth",
                    "requirementPath": "requirements/auth.md"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["feature_ids"].as_array().unwrap().len(), 1);
        assert_eq!(body["task_ids"].as_array().unwrap().len(), 1);

        let response = app.oneshot(get_request("/tasks")).await.unwrap();
        let listed = body_json(response).await;
        assert_eq!(listed["tasks"][0]["title"], "Login");
        assert_eq!(
            listed["tasks"][0]["requirement_path"],
            "requirements/auth.md"
        );
    }

    #[tokio::test]
    async fn interview_complete_rejects_invalid_batches() {
        let tmp = TempDir::new().unwrap();
        let response = test_router(&tmp)
            .oneshot(json_request(
                "POST",
                "/interview/complete",
                serde_json::json!({
                    "tasks": [{"title": "Orphan"}]
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
