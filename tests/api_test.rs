mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn status_and_health_report_ok() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["service"], json!("toolstock-api"));
    assert!(body["meta"]["request_id"].is_string());

    let response = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["data"]["checks"]["database"], json!("healthy"));
}

#[tokio::test]
async fn request_ids_are_generated_and_echoed() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/status", None).await;
    let generated = response
        .headers()
        .get("x-request-id")
        .expect("response should carry a request id")
        .to_str()
        .unwrap()
        .to_string();
    assert!(!generated.is_empty());

    // Error bodies carry the id too.
    let response = app.request(Method::GET, "/api/v1/items/9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));
    let body = TestApp::json_body(response).await;
    assert_eq!(body["error"], json!("Not Found"));
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn item_crud_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({
                "code": "D-200",
                "name": "Bracket die",
                "item_type": "die",
                "description": "40T press"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["code"], json!("D-200"));
    let item_id = body["id"].as_i64().expect("created item id");

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{item_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["name"], json!("Bracket die"));
    assert_eq!(body["current_holder_type"], json!("not_in_stock"));

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/items/{item_id}"),
            Some(json!({ "name": "Bracket die MK2" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::GET, "/api/v1/items", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["pagination"]["total"], json!(1));
    assert_eq!(body["data"][0]["name"], json!("Bracket die MK2"));
}

#[tokio::test]
async fn invalid_requests_map_to_client_errors() {
    let app = TestApp::new().await;

    // Empty code fails request validation.
    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "code": "", "name": "Nameless", "item_type": "die" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Unknown item type fails service validation.
    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "code": "D-210", "name": "Odd tool", "item_type": "jig" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Duplicate codes conflict.
    let payload = json!({ "code": "D-211", "name": "Trim die", "item_type": "die" });
    let response = app
        .request(Method::POST, "/api/v1/items", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = app.request(Method::POST, "/api/v1/items", Some(payload)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Page zero is rejected by the pagination validation.
    let response = app.request(Method::GET, "/api/v1/items?page=0", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn state_endpoints_track_indent_membership() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "code": "D-220", "name": "Form die", "item_type": "die" })),
        )
        .await;
    let item_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{item_id}/state"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["state"], json!("not_in_stock"));
    assert_eq!(body["state_display"], json!("Not In Stock"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{item_id}/eligibility"),
            None,
        )
        .await;
    let body = TestApp::json_body(response).await;
    assert_eq!(body["can_add_to_purchase_indent"], json!(true));
    assert_eq!(body["in_stock"], json!(false));

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-indents",
            Some(json!({
                "indent_number": "PI-220",
                "items": [{ "item_id": item_id }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let indent_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{item_id}/state"), None)
        .await;
    let body = TestApp::json_body(response).await;
    assert_eq!(body["state"], json!("in_pi"));

    // The indent being edited does not block its own items.
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{item_id}/state?exclude_indent_id={indent_id}"),
            None,
        )
        .await;
    let body = TestApp::json_body(response).await;
    assert_eq!(body["state"], json!("not_in_stock"));
}

#[tokio::test]
async fn procurement_flow_over_http() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "code": "D-230", "name": "Draw die", "item_type": "die" })),
        )
        .await;
    let item_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-indents",
            Some(json!({
                "indent_number": "PI-230",
                "items": [{ "item_id": item_id, "remarks": "urgent" }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = TestApp::json_body(response).await;
    let indent_id = body["id"].as_i64().unwrap();
    let line_id = body["items"][0]["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-indents/{indent_id}/approve"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["status"], json!("approved"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "order_number": "PO-230",
                "vendor": "Acme Foundry",
                "expected_delivery_date": "2026-09-15",
                "items": [{ "purchase_indent_item_id": line_id, "rate": 1250.0 }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{item_id}/state"), None)
        .await;
    assert_eq!(
        TestApp::json_body(response).await["state"],
        json!("in_po")
    );

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/purchase-orders/{order_id}/receive"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["is_active"], json!(false));

    let response = app.request(Method::GET, "/api/v1/movements/qc", None).await;
    let body = TestApp::json_body(response).await;
    let movement_id = body["movements"][0]["id"].as_i64().unwrap();
    assert_eq!(body["movements"][0]["item_id"], json!(item_id));

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/movements/{movement_id}/qc-approve"),
            Some(json!({ "location": "Rack A1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert_eq!(body["to_location"], json!("Rack A1"));

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/items/{item_id}/eligibility"),
            None,
        )
        .await;
    let body = TestApp::json_body(response).await;
    assert_eq!(body["state"], json!("in_stock"));
    assert_eq!(body["in_stock"], json!(true));
    assert_eq!(body["can_add_to_purchase_indent"], json!(false));

    // And straight out on job work over the API.
    let response = app
        .request(
            Method::POST,
            "/api/v1/job-works",
            Some(json!({ "item_id": item_id, "vendor": "Hardening Works" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let job_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/job-works/{job_id}/complete"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = TestApp::json_body(response).await;
    assert!(body["movement_id"].is_i64());

    let response = app
        .request(Method::GET, &format!("/api/v1/items/{item_id}/state"), None)
        .await;
    assert_eq!(TestApp::json_body(response).await["state"], json!("in_qc"));
}

#[tokio::test]
async fn blocked_operations_surface_as_bad_requests() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/items",
            Some(json!({ "code": "D-240", "name": "Punch die", "item_type": "die" })),
        )
        .await;
    let item_id = TestApp::json_body(response).await["id"].as_i64().unwrap();

    // Fresh items are not in stock, so job work is refused.
    let response = app
        .request(
            Method::POST,
            "/api/v1/job-works",
            Some(json!({ "item_id": item_id, "vendor": "Hardening Works" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = TestApp::json_body(response).await;
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Not In Stock"),
        "message should name the blocking state: {body}"
    );

    // Same for outward dispatch.
    let response = app
        .request(
            Method::POST,
            "/api/v1/movements/outward",
            Some(json!({ "item_id": item_id, "destination": "Press Shop" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Approving a movement that is not QC-pending is refused.
    let response = app
        .request(
            Method::POST,
            "/api/v1/movements/999/qc-approve",
            Some(json!({ "location": "Rack A1" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
