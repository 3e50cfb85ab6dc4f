use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignJobWorkRequest {
    pub item_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub vendor: String,
    /// Expected return date as YYYY-MM-DD
    pub expected_return_date: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct JobWorkListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Restrict the listing to one item
    pub item_id: Option<i64>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn parse_return_date(raw: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    let Some(date_str) = raw else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| ApiError::ValidationError(format!("Invalid date format: {}", e)))?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::ValidationError("Invalid date format".to_string()))?;
    Ok(Some(DateTime::<Utc>::from_naive_utc_and_offset(date, Utc)))
}

// Handler functions

/// Send an in-stock item out on job work
#[utoipa::path(
    post,
    path = "/api/v1/job-works",
    request_body = AssignJobWorkRequest,
    responses(
        (status = 201, description = "Job work assigned", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Item is not in stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "job-works"
)]
pub async fn assign_job_work(
    State(state): State<AppState>,
    Json(payload): Json<AssignJobWorkRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let expected_return_date = parse_return_date(payload.expected_return_date)?;
    let job = state
        .services
        .job_works
        .assign_job_work(
            payload.item_id,
            payload.vendor,
            expected_return_date,
            payload.remarks,
        )
        .await
        .map_err(map_service_error)?;

    info!("Job work {} assigned to {}", job.id, job.vendor);

    Ok(created_response(serde_json::json!({
        "id": job.id,
        "item_id": job.item_id,
        "vendor": job.vendor,
        "message": "Job work assigned"
    })))
}

/// Get an open job-work assignment
#[utoipa::path(
    get,
    path = "/api/v1/job-works/{id}",
    params(
        ("id" = i64, Path, description = "Job work ID")
    ),
    responses(
        (status = 200, description = "Job work fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Job work not found", body = crate::errors::ErrorResponse)
    ),
    tag = "job-works"
)]
pub async fn get_job_work(
    State(state): State<AppState>,
    Path(job_work_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let job = state
        .services
        .job_works
        .get_job_work(job_work_id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Job work with ID {} not found", job_work_id))
        })?;

    Ok(success_response(job))
}

/// List open job-work assignments
#[utoipa::path(
    get,
    path = "/api/v1/job-works",
    params(JobWorkListQuery),
    responses(
        (status = 200, description = "Job works listed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "job-works"
)]
pub async fn list_job_works(
    State(state): State<AppState>,
    Query(params): Query<JobWorkListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (jobs, total) = state
        .services
        .job_works
        .list_job_works(params.page, params.per_page, params.item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        jobs,
        params.page,
        params.per_page,
        total,
    )))
}

/// Complete a job-work assignment and bring the item back through QC
#[utoipa::path(
    post,
    path = "/api/v1/job-works/{id}/complete",
    params(
        ("id" = i64, Path, description = "Job work ID")
    ),
    responses(
        (status = 200, description = "Job work completed", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Job work not found", body = crate::errors::ErrorResponse)
    ),
    tag = "job-works"
)]
pub async fn complete_job_work(
    State(state): State<AppState>,
    Path(job_work_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let movement = state
        .services
        .job_works
        .complete_job_work(job_work_id)
        .await
        .map_err(map_service_error)?;

    info!(
        "Job work {} completed, item {} awaiting QC",
        job_work_id, movement.item_id
    );

    Ok(success_response(serde_json::json!({
        "job_work_id": job_work_id,
        "item_id": movement.item_id,
        "movement_id": movement.id,
        "message": "Job work completed, item awaiting QC"
    })))
}

/// Creates the router for job work endpoints
pub fn job_work_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(assign_job_work))
        .route("/", get(list_job_works))
        .route("/:id", get(get_job_work))
        .route("/:id/complete", post(complete_job_work))
}
