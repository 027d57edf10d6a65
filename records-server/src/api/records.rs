use crate::errors::ApiError;
use crate::openapi::RECORDS_TAG;
use crate::repository::{DataEventRecord, DataEventRecordInput};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use log::info;

/// Malformed bodies are reported as 400 like any other invalid record
fn input(
    body: Result<Json<DataEventRecordInput>, JsonRejection>,
) -> Result<DataEventRecordInput, ApiError> {
    body.map(|Json(input)| input)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

/// List all data event records
#[utoipa::path(
    get,
    path = "/api/DataEventRecords",
    tag = RECORDS_TAG,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All records", body = [DataEventRecord]),
        (status = 401, description = "Missing or invalid access token"),
        (status = 403, description = "Caller lacks the records.user role")
    )
)]
pub(crate) async fn list_records(
    State(state): State<AppState>,
) -> Result<Json<Vec<DataEventRecord>>, ApiError> {
    Ok(Json(state.records.get_all().await?))
}

/// Fetch one data event record
#[utoipa::path(
    get,
    path = "/api/DataEventRecords/{id}",
    tag = RECORDS_TAG,
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 200, description = "The record", body = DataEventRecord),
        (status = 404, description = "No record with this id")
    )
)]
pub(crate) async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DataEventRecord>, ApiError> {
    Ok(Json(state.records.get(id).await?))
}

/// Create a data event record
#[utoipa::path(
    post,
    path = "/api/DataEventRecords",
    tag = RECORDS_TAG,
    security(("bearer" = [])),
    request_body = DataEventRecordInput,
    responses(
        (status = 201, description = "Record created", body = DataEventRecord),
        (status = 400, description = "Invalid record"),
        (status = 403, description = "Caller lacks the records.admin role")
    )
)]
pub(crate) async fn create_record(
    State(state): State<AppState>,
    body: Result<Json<DataEventRecordInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.records.create(input(body)?).await?;
    info!("Created data event record {}", record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

/// Replace a data event record
#[utoipa::path(
    put,
    path = "/api/DataEventRecords/{id}",
    tag = RECORDS_TAG,
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Record id")),
    request_body = DataEventRecordInput,
    responses(
        (status = 200, description = "Record updated", body = DataEventRecord),
        (status = 400, description = "Invalid record"),
        (status = 404, description = "No record with this id")
    )
)]
pub(crate) async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<DataEventRecordInput>, JsonRejection>,
) -> Result<Json<DataEventRecord>, ApiError> {
    let record = state.records.update(id, input(body)?).await?;
    info!("Updated data event record {}", record.id);
    Ok(Json(record))
}

/// Delete a data event record
#[utoipa::path(
    delete,
    path = "/api/DataEventRecords/{id}",
    tag = RECORDS_TAG,
    security(("bearer" = [])),
    params(("id" = i64, Path, description = "Record id")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 404, description = "No record with this id")
    )
)]
pub(crate) async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.records.delete(id).await?;
    info!("Deleted data event record {}", id);
    Ok(StatusCode::NO_CONTENT)
}
