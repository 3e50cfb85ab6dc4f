use super::common::{
    map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QcApproveRequest {
    #[validate(length(min = 1, max = 255))]
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct QcRejectRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct DispatchRequest {
    pub item_id: i64,
    #[validate(length(min = 1, max = 255))]
    pub destination: String,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReturnRequest {
    pub item_id: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct MovementListQuery {
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

// Handler functions

/// List movements, newest first
#[utoipa::path(
    get,
    path = "/api/v1/movements",
    params(MovementListQuery),
    responses(
        (status = 200, description = "Movements listed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(params): Query<MovementListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (movements, total) = state
        .services
        .movements
        .list_movements(params.page, params.per_page, params.item_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        movements,
        params.page,
        params.per_page,
        total,
    )))
}

/// List inward movements awaiting QC
#[utoipa::path(
    get,
    path = "/api/v1/movements/qc",
    responses(
        (status = 200, description = "Pending QC queue", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "movements"
)]
pub async fn list_qc_pending(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let movements = state
        .services
        .movements
        .list_qc_pending()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "movements": movements
    })))
}

/// Approve a QC-pending movement and put the item into stock
#[utoipa::path(
    post,
    path = "/api/v1/movements/{id}/qc-approve",
    request_body = QcApproveRequest,
    params(
        ("id" = i64, Path, description = "Movement ID")
    ),
    responses(
        (status = 200, description = "Movement approved", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Movement is not awaiting QC", body = crate::errors::ErrorResponse),
        (status = 404, description = "Movement not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn qc_approve(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
    Json(payload): Json<QcApproveRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let movement = state
        .services
        .movements
        .qc_approve(movement_id, payload.location)
        .await
        .map_err(map_service_error)?;

    info!("QC approved for movement {}", movement.id);

    Ok(success_response(serde_json::json!({
        "id": movement.id,
        "item_id": movement.item_id,
        "to_location": movement.to_location,
        "message": "QC approved, item moved into stock"
    })))
}

/// Reject a QC-pending movement and send the item back to the vendor
#[utoipa::path(
    post,
    path = "/api/v1/movements/{id}/qc-reject",
    request_body = QcRejectRequest,
    params(
        ("id" = i64, Path, description = "Movement ID")
    ),
    responses(
        (status = 200, description = "Movement rejected", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Movement is not awaiting QC", body = crate::errors::ErrorResponse),
        (status = 404, description = "Movement not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn qc_reject(
    State(state): State<AppState>,
    Path(movement_id): Path<i64>,
    Json(payload): Json<QcRejectRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let movement = state
        .services
        .movements
        .qc_reject(movement_id, payload.notes)
        .await
        .map_err(map_service_error)?;

    info!("QC rejected for movement {}, item returned to vendor", movement_id);

    Ok(success_response(serde_json::json!({
        "id": movement.id,
        "item_id": movement.item_id,
        "message": "QC rejected, item returned to vendor"
    })))
}

/// Dispatch an in-stock item to an outside destination
#[utoipa::path(
    post,
    path = "/api/v1/movements/outward",
    request_body = DispatchRequest,
    responses(
        (status = 200, description = "Item dispatched", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Item is not in stock", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn dispatch_item(
    State(state): State<AppState>,
    Json(payload): Json<DispatchRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let movement = state
        .services
        .movements
        .dispatch_item(payload.item_id, payload.destination, payload.notes)
        .await
        .map_err(map_service_error)?;

    info!(
        "Item {} dispatched, movement {}",
        movement.item_id, movement.id
    );

    Ok(success_response(serde_json::json!({
        "id": movement.id,
        "item_id": movement.item_id,
        "to_location": movement.to_location,
        "message": "Item dispatched"
    })))
}

/// Bring a dispatched item back in through QC
#[utoipa::path(
    post,
    path = "/api/v1/movements/inward",
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Item returned into QC", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Item is not outward", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "movements"
)]
pub async fn return_item(
    State(state): State<AppState>,
    Json(payload): Json<ReturnRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let movement = state
        .services
        .movements
        .return_item(payload.item_id, payload.notes)
        .await
        .map_err(map_service_error)?;

    info!(
        "Item {} returned, QC movement {}",
        movement.item_id, movement.id
    );

    Ok(success_response(serde_json::json!({
        "id": movement.id,
        "item_id": movement.item_id,
        "message": "Item returned, awaiting QC"
    })))
}

/// Creates the router for movement endpoints
pub fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_movements))
        .route("/qc", get(list_qc_pending))
        .route("/:id/qc-approve", post(qc_approve))
        .route("/:id/qc-reject", post(qc_reject))
        .route("/outward", post(dispatch_item))
        .route("/inward", post(return_item))
}
