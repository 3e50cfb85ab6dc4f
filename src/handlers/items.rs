use super::common::{
    created_response, map_service_error, success_response, validate_input, PaginatedResponse,
};
use crate::{errors::ApiError, handlers::AppState};
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
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 100))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1))]
    pub item_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub item_type: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ItemListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    /// Restrict the listing to one item type
    pub item_type: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct StateQuery {
    /// Indent whose own lines are ignored while deriving the state
    pub exclude_indent_id: Option<i64>,
}

// Handler functions

/// Register a new item
#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Item code already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .items
        .create_item(
            payload.code,
            payload.name,
            payload.item_type,
            payload.description,
        )
        .await
        .map_err(map_service_error)?;

    info!("Item created: {} ({})", item.id, item.code);

    Ok(created_response(serde_json::json!({
        "id": item.id,
        "code": item.code,
        "message": "Item created successfully"
    })))
}

/// Get an item by ID
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item = state
        .services
        .items
        .get_item(item_id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Item with ID {} not found", item_id)))?;

    Ok(success_response(item))
}

/// Update an item
#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    request_body = UpdateItemRequest,
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let item = state
        .services
        .items
        .update_item(item_id, payload.name, payload.item_type, payload.description)
        .await
        .map_err(map_service_error)?;

    info!("Item updated: {}", item.id);

    Ok(success_response(serde_json::json!({
        "id": item.id,
        "message": "Item updated successfully"
    })))
}

/// List items
#[utoipa::path(
    get,
    path = "/api/v1/items",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Items listed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid pagination", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ItemListQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let (items, total) = state
        .services
        .items
        .list_items(params.page, params.per_page, params.item_type)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        items,
        params.page,
        params.per_page,
        total,
    )))
}

/// Derive the lifecycle state of an item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/state",
    params(
        ("id" = i64, Path, description = "Item ID"),
        StateQuery
    ),
    responses(
        (status = 200, description = "State derived", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "items"
)]
pub async fn get_item_state(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
    Query(params): Query<StateQuery>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item_state = state
        .services
        .item_state
        .resolve_state(item_id, params.exclude_indent_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "item_id": item_id,
        "state": item_state,
        "state_display": item_state.display_name()
    })))
}

/// Check what the current state allows for an item
#[utoipa::path(
    get,
    path = "/api/v1/items/{id}/eligibility",
    params(
        ("id" = i64, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Eligibility derived", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "items"
)]
pub async fn get_item_eligibility(
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let item_state = state
        .services
        .item_state
        .resolve_state(item_id, None)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "item_id": item_id,
        "state": item_state,
        "state_display": item_state.display_name(),
        "can_add_to_purchase_indent": item_state == crate::services::item_state::ItemState::NotInStock,
        "in_stock": item_state == crate::services::item_state::ItemState::InStock
    })))
}

/// Creates the router for item endpoints
pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_item))
        .route("/", get(list_items))
        .route("/:id", get(get_item))
        .route("/:id", put(update_item))
        .route("/:id/state", get(get_item_state))
        .route("/:id/eligibility", get(get_item_eligibility))
}
