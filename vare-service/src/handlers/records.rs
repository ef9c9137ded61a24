use axum::{extract::State, http::StatusCode, Json};

use crate::dtos::{ListRecordsQuery, RecordCreate, RecordResponse, TodoResponse, TodoUpdate};
use crate::services::metrics::RECORDS_CREATED_TOTAL;
use crate::startup::AppState;
use crate::utils::{PathParam, QueryParams, ValidatedJson};
use service_core::error::AppError;

/// How many records `/db/latest` returns at most.
pub const LATEST_LIMIT: i64 = 3;

fn record_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("해당 기록을 찾을 수 없습니다."))
}

#[tracing::instrument(skip(state, request), fields(category = %request.category))]
pub async fn create_record(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RecordCreate>,
) -> Result<Json<RecordResponse>, AppError> {
    let detail = state.db.create_record(&request.to_new_record()).await?;

    RECORDS_CREATED_TOTAL.inc();

    Ok(Json(detail.into()))
}

#[tracing::instrument(skip(state))]
pub async fn latest_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let records = state.db.list_records(0, LATEST_LIMIT).await?;

    if records.is_empty() {
        return Err(AppError::NotFound(anyhow::anyhow!("저장된 기록이 없습니다.")));
    }

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn list_records(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListRecordsQuery>,
) -> Result<Json<Vec<RecordResponse>>, AppError> {
    let (skip, limit) = query.normalized();
    let records = state.db.list_records(skip, limit).await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn get_record(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<RecordResponse>, AppError> {
    match state.db.get_record(id).await? {
        Some(detail) => Ok(Json(detail.into())),
        None => Err(record_not_found()),
    }
}

#[tracing::instrument(skip(state))]
pub async fn delete_record(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, AppError> {
    if state.db.delete_record(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(record_not_found())
    }
}

#[tracing::instrument(skip(state, request))]
pub async fn update_todo(
    State(state): State<AppState>,
    PathParam(todo_id): PathParam<i64>,
    ValidatedJson(request): ValidatedJson<TodoUpdate>,
) -> Result<Json<TodoResponse>, AppError> {
    match state
        .db
        .set_todo_completed(todo_id, request.is_completed)
        .await?
    {
        Some(todo) => Ok(Json(todo.into())),
        None => Err(AppError::NotFound(anyhow::anyhow!(
            "해당 할 일을 찾을 수 없습니다."
        ))),
    }
}
