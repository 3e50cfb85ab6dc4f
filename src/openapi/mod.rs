use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Toolstock API",
        version = "0.1.0",
        description = r#"
# Toolstock Die and Pattern Tracking API

Tracks dies and patterns through their full procurement and custody
lifecycle: purchase indents, purchase orders, receiving, QC, stock,
outward dispatch and job work.

## Item states

An item's lifecycle state is never stored. It is derived on every read
from the active records that reference the item, in fixed precedence:

1. `in_po` - on a line of an active purchase order
2. `in_pi` - on a line of an active pending or approved indent
3. `in_qc` - has an inward movement awaiting QC
4. `in_job_work` - out with a vendor on an open job work
5. otherwise the item's holder decides: `in_stock`, `outward` or `not_in_stock`

Only a `not_in_stock` item can be added to a purchase indent, and only
an `in_stock` item can be dispatched or sent on job work.

## Pagination

List endpoints accept `page` (default 1) and `per_page` (default 20,
max 1000) query parameters.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "items", description = "Item registry and state derivation"),
        (name = "purchase-indents", description = "Purchase indent workflow"),
        (name = "purchase-orders", description = "Purchase order workflow"),
        (name = "movements", description = "Stock movements, QC, dispatch and returns"),
        (name = "job-works", description = "Job work assignments")
    ),
    paths(
        // Items
        crate::handlers::items::create_item,
        crate::handlers::items::get_item,
        crate::handlers::items::update_item,
        crate::handlers::items::list_items,
        crate::handlers::items::get_item_state,
        crate::handlers::items::get_item_eligibility,

        // Purchase indents
        crate::handlers::purchase_indents::create_purchase_indent,
        crate::handlers::purchase_indents::get_purchase_indent,
        crate::handlers::purchase_indents::update_purchase_indent,
        crate::handlers::purchase_indents::list_purchase_indents,
        crate::handlers::purchase_indents::approve_purchase_indent,
        crate::handlers::purchase_indents::reject_purchase_indent,
        crate::handlers::purchase_indents::cancel_purchase_indent,

        // Purchase orders
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::purchase_orders::cancel_purchase_order,

        // Movements
        crate::handlers::movements::list_movements,
        crate::handlers::movements::list_qc_pending,
        crate::handlers::movements::qc_approve,
        crate::handlers::movements::qc_reject,
        crate::handlers::movements::dispatch_item,
        crate::handlers::movements::return_item,

        // Job works
        crate::handlers::job_works::assign_job_work,
        crate::handlers::job_works::get_job_work,
        crate::handlers::job_works::list_job_works,
        crate::handlers::job_works::complete_job_work,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::services::item_state::ItemState,

            // Item types
            crate::handlers::items::CreateItemRequest,
            crate::handlers::items::UpdateItemRequest,

            // Purchase indent types
            crate::handlers::purchase_indents::CreatePurchaseIndentRequest,
            crate::handlers::purchase_indents::UpdatePurchaseIndentRequest,
            crate::handlers::purchase_indents::IndentLineDto,

            // Purchase order types
            crate::handlers::purchase_orders::CreatePurchaseOrderRequest,
            crate::handlers::purchase_orders::OrderLineDto,

            // Movement types
            crate::handlers::movements::QcApproveRequest,
            crate::handlers::movements::QcRejectRequest,
            crate::handlers::movements::DispatchRequest,
            crate::handlers::movements::ReturnRequest,

            // Job work types
            crate::handlers::job_works::AssignJobWorkRequest,
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated OpenAPI document as JSON
pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}
