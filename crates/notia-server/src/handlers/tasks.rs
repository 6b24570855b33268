use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use notia::db::task_repo::{SortDirection, TaskFilter, TaskOrder, TaskRecord};
use notia::{CreateTaskRequest, TaskStatus};

use super::parse_optional;
use crate::error::{ok, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TasksQuery {
    status: Option<String>,
    order_by: Option<String>,
    direction: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    query: Result<Query<TasksQuery>, QueryRejection>,
) -> ApiResult<Vec<TaskRecord>> {
    let Query(query) = query.map_err(ApiError::rejected)?;
    let filter = TaskFilter {
        status: parse_optional::<TaskStatus>(query.status.as_deref())?,
        order_by: parse_optional::<TaskOrder>(query.order_by.as_deref())?.unwrap_or_default(),
        direction: parse_optional::<SortDirection>(query.direction.as_deref())?
            .unwrap_or_default(),
    };
    ok(state.service.list_tasks(&filter)?)
}

pub async fn pending_tasks(State(state): State<AppState>) -> ApiResult<Vec<TaskRecord>> {
    ok(state.service.pending_tasks()?)
}

pub async fn overdue_tasks(State(state): State<AppState>) -> ApiResult<Vec<TaskRecord>> {
    ok(state.service.overdue_tasks()?)
}

pub async fn create_task(
    State(state): State<AppState>,
    request: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<TaskRecord> {
    let Json(request) = request.map_err(ApiError::rejected)?;
    ok(state.service.create_task(request)?)
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusParams {
    status: Option<String>,
}

/// `PUT /api/tasks/{id}`: status from `?status=` or a JSON body `{"status": ...}`.
pub async fn update_task_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    params: Result<Query<StatusParams>, QueryRejection>,
    body: Bytes,
) -> ApiResult<TaskRecord> {
    let Path(id) = id.map_err(ApiError::rejected)?;
    let Query(params) = params.map_err(ApiError::rejected)?;
    let status = match params.status {
        Some(status) => status,
        None if !body.is_empty() => serde_json::from_slice::<StatusParams>(&body)
            .map_err(|e| ApiError::validation(format!("invalid request body: {}", e)))?
            .status
            .ok_or_else(|| ApiError::validation("status is required"))?,
        None => return Err(ApiError::validation("status is required")),
    };
    ok(state.service.update_task_status(id, &status)?)
}
