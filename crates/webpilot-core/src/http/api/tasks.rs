use crate::AppCore;
use crate::http::{ApiError, ApiJson};
use crate::models::{BrowserTask, NewTask, TaskEvent, TaskPatch};
use crate::runtime::controller::DEFAULT_LIST_LIMIT;
use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use webpilot_ai::Plan;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/analyze", post(analyze_task))
        .route(
            "/{id}",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        )
        .route("/{id}/execute", post(execute_task))
        .route("/{id}/events", get(list_task_events))
}

#[derive(Debug, Deserialize)]
struct ListTasksQuery {
    skip: Option<usize>,
    limit: Option<usize>,
}

async fn list_tasks(
    Extension(core): Extension<Arc<AppCore>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<BrowserTask>>, ApiError> {
    let tasks = core.controller.list(
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(DEFAULT_LIST_LIMIT),
    )?;
    Ok(Json(tasks))
}

async fn create_task(
    Extension(core): Extension<Arc<AppCore>>,
    ApiJson(req): ApiJson<NewTask>,
) -> Result<Json<BrowserTask>, ApiError> {
    let task = core.controller.create(req).await?;
    Ok(Json(task))
}

async fn get_task(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<BrowserTask>, ApiError> {
    Ok(Json(core.controller.get(&id)?))
}

async fn update_task(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> Result<Json<BrowserTask>, ApiError> {
    Ok(Json(core.controller.update(&id, patch).await?))
}

async fn delete_task(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    core.controller.delete(&id)?;
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

/// Queue an execution; the outcome shows up on later reads of the task.
async fn execute_task(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let handle = core.controller.execute(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "message": "Task execution started",
            "task_id": handle.task_id(),
        })),
    ))
}

async fn list_task_events(
    Extension(core): Extension<Arc<AppCore>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TaskEvent>>, ApiError> {
    Ok(Json(core.controller.events(&id)?))
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    description: String,
    url: String,
}

async fn analyze_task(
    Extension(core): Extension<Arc<AppCore>>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<Plan>, ApiError> {
    Ok(Json(core.controller.analyze(&req.description, &req.url).await?))
}
