use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::{errors::ApiError, handlers::AppState, services::purchase_orders::OrderLineRequest};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub order_number: String,
    #[validate(length(min = 1, max = 255))]
    pub vendor: String,
    /// Expected delivery date as YYYY-MM-DD
    pub expected_delivery_date: Option<String>,
    pub remarks: Option<String>,
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineDto {
    pub purchase_indent_item_id: i64,
    #[schema(value_type = Option<f64>)]
    pub rate: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OrderListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Filter on the active flag
    pub is_active: Option<bool>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

fn parse_delivery_date(raw: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
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

/// Create a purchase order from approved indent lines
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request or unorderable line", body = crate::errors::ErrorResponse),
        (status = 404, description = "Indent line not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Line already on an active order", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let expected_delivery_date = parse_delivery_date(payload.expected_delivery_date)?;
    let lines = payload
        .items
        .into_iter()
        .map(|line| OrderLineRequest {
            purchase_indent_item_id: line.purchase_indent_item_id,
            rate: line.rate,
        })
        .collect();

    let (order, lines) = state
        .services
        .purchase_orders
        .create_purchase_order(
            payload.order_number,
            payload.vendor,
            expected_delivery_date,
            payload.remarks,
            lines,
        )
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase order created: {} with {} lines",
        order.id,
        lines.len()
    );

    Ok(created_response(serde_json::json!({
        "id": order.id,
        "order_number": order.order_number,
        "items": lines,
        "message": "Purchase order created successfully"
    })))
}

/// Get a purchase order with its lines
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(
        ("id" = i64, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (order, lines) = state
        .services
        .purchase_orders
        .get_purchase_order(order_id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Purchase order with ID {} not found", order_id))
        })?;

    Ok(success_response(serde_json::json!({
        "order": order,
        "items": lines
    })))
}

/// List purchase orders
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Purchase orders listed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (orders, total) = state
        .services
        .purchase_orders
        .list_purchase_orders(params.page, params.per_page, params.is_active)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        orders,
        params.page,
        params.per_page,
        total,
    )))
}

/// Receive a purchase order into QC
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(
        ("id" = i64, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order received", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Order inactive or empty", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .receive_purchase_order(order_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order received: {}", order.id);

    Ok(success_response(serde_json::json!({
        "id": order.id,
        "is_active": order.is_active,
        "message": "Purchase order received, items moved into QC"
    })))
}

/// Cancel a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/cancel",
    params(
        ("id" = i64, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order cancelled", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Order already inactive", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn cancel_purchase_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let order = state
        .services
        .purchase_orders
        .cancel_purchase_order(order_id)
        .await
        .map_err(map_service_error)?;

    info!("Purchase order cancelled: {}", order.id);

    Ok(success_response(serde_json::json!({
        "id": order.id,
        "message": "Purchase order cancelled"
    })))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/", get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/cancel", post(cancel_purchase_order))
}
