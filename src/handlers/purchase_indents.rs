use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::{
    errors::ApiError, handlers::AppState, services::purchase_indents::IndentLineRequest,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseIndentRequest {
    #[validate(length(min = 1, max = 100))]
    pub indent_number: String,
    pub remarks: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<IndentLineDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct IndentLineDto {
    pub item_id: i64,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseIndentRequest {
    pub remarks: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<IndentLineDto>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct IndentListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Filter by indent status (pending, approved or rejected)
    pub status: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn into_line_requests(items: Vec<IndentLineDto>) -> Vec<IndentLineRequest> {
    items
        .into_iter()
        .map(|line| IndentLineRequest {
            item_id: line.item_id,
            remarks: line.remarks,
        })
        .collect()
}

// Handler functions

/// Create a new purchase indent
#[utoipa::path(
    post,
    path = "/api/v1/purchase-indents",
    request_body = CreatePurchaseIndentRequest,
    responses(
        (status = 201, description = "Purchase indent created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request or ineligible item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn create_purchase_indent(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseIndentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (indent, lines) = state
        .services
        .purchase_indents
        .create_purchase_indent(
            payload.indent_number,
            payload.remarks,
            into_line_requests(payload.items),
        )
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase indent created: {} with {} lines",
        indent.id,
        lines.len()
    );

    Ok(created_response(serde_json::json!({
        "id": indent.id,
        "indent_number": indent.indent_number,
        "items": lines,
        "message": "Purchase indent created successfully"
    })))
}

/// Get a purchase indent with its lines
#[utoipa::path(
    get,
    path = "/api/v1/purchase-indents/{id}",
    params(
        ("id" = i64, Path, description = "Purchase indent ID")
    ),
    responses(
        (status = 200, description = "Purchase indent fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase indent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn get_purchase_indent(
    State(state): State<AppState>,
    Path(indent_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (indent, lines) = state
        .services
        .purchase_indents
        .get_purchase_indent(indent_id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Purchase indent with ID {} not found", indent_id))
        })?;

    Ok(success_response(serde_json::json!({
        "indent": indent,
        "items": lines
    })))
}

/// Replace the lines of a pending purchase indent
#[utoipa::path(
    put,
    path = "/api/v1/purchase-indents/{id}",
    request_body = UpdatePurchaseIndentRequest,
    params(
        ("id" = i64, Path, description = "Purchase indent ID")
    ),
    responses(
        (status = 200, description = "Purchase indent updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Indent not editable or item ineligible", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase indent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn update_purchase_indent(
    State(state): State<AppState>,
    Path(indent_id): Path<i64>,
    Json(payload): Json<UpdatePurchaseIndentRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let (indent, lines) = state
        .services
        .purchase_indents
        .update_purchase_indent(indent_id, payload.remarks, into_line_requests(payload.items))
        .await
        .map_err(map_service_error)?;

    info!("Purchase indent updated: {}", indent.id);

    Ok(success_response(serde_json::json!({
        "id": indent.id,
        "items": lines,
        "message": "Purchase indent updated successfully"
    })))
}

/// List purchase indents
#[utoipa::path(
    get,
    path = "/api/v1/purchase-indents",
    params(IndentListQuery),
    responses(
        (status = 200, description = "Purchase indents listed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid filter or pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn list_purchase_indents(
    State(state): State<AppState>,
    Query(params): Query<IndentListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (indents, total) = state
        .services
        .purchase_indents
        .list_purchase_indents(params.page, params.per_page, params.status)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        indents,
        params.page,
        params.per_page,
        total,
    )))
}

/// Approve a pending purchase indent
#[utoipa::path(
    post,
    path = "/api/v1/purchase-indents/{id}/approve",
    params(
        ("id" = i64, Path, description = "Purchase indent ID")
    ),
    responses(
        (status = 200, description = "Purchase indent approved", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Indent is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase indent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn approve_purchase_indent(
    State(state): State<AppState>,
    Path(indent_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let indent = state
        .services
        .purchase_indents
        .approve_purchase_indent(indent_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase indent approved: {}", indent.id);

    Ok(success_response(serde_json::json!({
        "id": indent.id,
        "status": indent.status,
        "message": "Purchase indent approved"
    })))
}

/// Reject a pending purchase indent
#[utoipa::path(
    post,
    path = "/api/v1/purchase-indents/{id}/reject",
    params(
        ("id" = i64, Path, description = "Purchase indent ID")
    ),
    responses(
        (status = 200, description = "Purchase indent rejected", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Indent is not pending", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase indent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn reject_purchase_indent(
    State(state): State<AppState>,
    Path(indent_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let indent = state
        .services
        .purchase_indents
        .reject_purchase_indent(indent_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase indent rejected: {}", indent.id);

    Ok(success_response(serde_json::json!({
        "id": indent.id,
        "status": indent.status,
        "message": "Purchase indent rejected"
    })))
}

/// Cancel a purchase indent
#[utoipa::path(
    post,
    path = "/api/v1/purchase-indents/{id}/cancel",
    params(
        ("id" = i64, Path, description = "Purchase indent ID")
    ),
    responses(
        (status = 200, description = "Purchase indent cancelled", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Indent already inactive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase indent not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-indents"
)]
pub async fn cancel_purchase_indent(
    State(state): State<AppState>,
    Path(indent_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let indent = state
        .services
        .purchase_indents
        .cancel_purchase_indent(indent_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase indent cancelled: {}", indent.id);

    Ok(success_response(serde_json::json!({
        "id": indent.id,
        "message": "Purchase indent cancelled"
    })))
}

/// Creates the router for purchase indent endpoints
pub fn purchase_indent_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_indent))
        .route("/", get(list_purchase_indents))
        .route("/:id", get(get_purchase_indent))
        .route("/:id", put(update_purchase_indent))
        .route("/:id/approve", post(approve_purchase_indent))
        .route("/:id/reject", post(reject_purchase_indent))
        .route("/:id/cancel", post(cancel_purchase_indent))
}
