mod common;

use chrono::Utc;
use common::TestApp;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use toolstock_api::entities::{
    item::{self, HolderType},
    job_work, movement, purchase_indent, purchase_indent_item, purchase_order,
    purchase_order_item,
};
use toolstock_api::services::item_state::ItemState;

// Seeding goes straight at the tables. The lifecycle services refuse to
// build most of the record combinations the resolver has to cope with.

async fn seed_item(
    db: &DatabaseConnection,
    code: &str,
    holder: &str,
    location: Option<&str>,
) -> item::Model {
    let now = Utc::now();
    item::ActiveModel {
        code: Set(code.to_string()),
        name: Set(format!("{code} test die")),
        item_type: Set("die".to_string()),
        current_holder_type: Set(holder.to_string()),
        current_location: Set(location.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed item")
}

async fn seed_item_with_id(db: &DatabaseConnection, id: i64, code: &str) -> item::Model {
    let now = Utc::now();
    item::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        name: Set(format!("{code} test die")),
        item_type: Set("die".to_string()),
        description: Set(None),
        current_holder_type: Set(HolderType::NotInStock.as_str().to_string()),
        current_location: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed item with explicit id")
}

async fn seed_indent(
    db: &DatabaseConnection,
    number: &str,
    status: &str,
    active: bool,
) -> purchase_indent::Model {
    let now = Utc::now();
    purchase_indent::ActiveModel {
        indent_number: Set(number.to_string()),
        status: Set(status.to_string()),
        is_active: Set(active),
        remarks: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed indent")
}

async fn seed_indent_with_id(
    db: &DatabaseConnection,
    id: i64,
    number: &str,
    status: &str,
) -> purchase_indent::Model {
    let now = Utc::now();
    purchase_indent::ActiveModel {
        id: Set(id),
        indent_number: Set(number.to_string()),
        status: Set(status.to_string()),
        is_active: Set(true),
        remarks: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed indent with explicit id")
}

async fn seed_indent_line(
    db: &DatabaseConnection,
    indent_id: i64,
    item_id: i64,
) -> purchase_indent_item::Model {
    purchase_indent_item::ActiveModel {
        purchase_indent_id: Set(indent_id),
        item_id: Set(item_id),
        remarks: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed indent line")
}

async fn seed_order(db: &DatabaseConnection, number: &str, active: bool) -> purchase_order::Model {
    let now = Utc::now();
    purchase_order::ActiveModel {
        order_number: Set(number.to_string()),
        vendor: Set("Acme Foundry".to_string()),
        expected_delivery_date: Set(None),
        is_active: Set(active),
        remarks: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed order")
}

async fn seed_order_line(
    db: &DatabaseConnection,
    order_id: i64,
    indent_line_id: i64,
) -> purchase_order_item::Model {
    purchase_order_item::ActiveModel {
        purchase_order_id: Set(order_id),
        purchase_indent_item_id: Set(indent_line_id),
        rate: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed order line")
}

async fn seed_movement(db: &DatabaseConnection, item_id: i64, qc_pending: bool) -> movement::Model {
    let now = Utc::now();
    movement::ActiveModel {
        item_id: Set(item_id),
        movement_type: Set("inward".to_string()),
        is_qc_pending: Set(qc_pending),
        is_qc_approved: Set(!qc_pending),
        from_location: Set(None),
        to_location: Set(None),
        reference_number: Set(None),
        notes: Set(None),
        moved_at: Set(now),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed movement")
}

async fn seed_job_work(db: &DatabaseConnection, item_id: i64) -> job_work::Model {
    let now = Utc::now();
    job_work::ActiveModel {
        item_id: Set(item_id),
        vendor: Set("Hardening Works".to_string()),
        expected_return_date: Set(None),
        remarks: Set(None),
        issued_at: Set(now),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("seed job work")
}

#[tokio::test]
async fn missing_items_resolve_not_in_stock() {
    let app = TestApp::new().await;
    let resolver = &app.state.services.item_state;

    let state = resolver.resolve_state(9_999, None).await.unwrap();
    assert_eq!(state, ItemState::NotInStock);
    assert!(resolver
        .can_add_to_purchase_indent(9_999, None)
        .await
        .unwrap());
    assert!(!resolver.is_in_stock(9_999).await.unwrap());
}

#[tokio::test]
async fn holder_type_decides_when_no_pipeline_presence() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let shelved = seed_item(db, "D-001", "location", Some("Rack A1")).await;
    let at_vendor = seed_item(db, "D-002", "vendor", None).await;
    let unplaced = seed_item(db, "D-003", "not_in_stock", None).await;
    let corrupt = seed_item(db, "D-004", "somewhere else", None).await;

    assert_eq!(
        resolver.resolve_state(shelved.id, None).await.unwrap(),
        ItemState::InStock
    );
    assert_eq!(
        resolver.resolve_state(at_vendor.id, None).await.unwrap(),
        ItemState::Outward
    );
    assert_eq!(
        resolver.resolve_state(unplaced.id, None).await.unwrap(),
        ItemState::NotInStock
    );
    // Unrecognized holder strings degrade to not-in-stock.
    assert_eq!(
        resolver.resolve_state(corrupt.id, None).await.unwrap(),
        ItemState::NotInStock
    );
}

#[tokio::test]
async fn open_indent_lines_resolve_in_pi() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let pending_item = seed_item(db, "D-010", "not_in_stock", None).await;
    let pending = seed_indent(db, "PI-010", "pending", true).await;
    seed_indent_line(db, pending.id, pending_item.id).await;

    let approved_item = seed_item(db, "D-011", "not_in_stock", None).await;
    let approved = seed_indent(db, "PI-011", "approved", true).await;
    seed_indent_line(db, approved.id, approved_item.id).await;

    assert_eq!(
        resolver.resolve_state(pending_item.id, None).await.unwrap(),
        ItemState::InPi
    );
    assert_eq!(
        resolver
            .resolve_state(approved_item.id, None)
            .await
            .unwrap(),
        ItemState::InPi
    );
}

#[tokio::test]
async fn rejected_indents_never_claim_an_item() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-020", "vendor", None).await;
    let rejected = seed_indent(db, "PI-020", "rejected", true).await;
    seed_indent_line(db, rejected.id, tool.id).await;

    // Falls through to the stored holder, not InPi.
    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::Outward
    );
}

#[tokio::test]
async fn inactive_indents_never_claim_an_item() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-021", "location", Some("Rack B2")).await;
    let cancelled = seed_indent(db, "PI-021", "pending", false).await;
    seed_indent_line(db, cancelled.id, tool.id).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InStock
    );
}

#[tokio::test]
async fn excluding_an_indent_ignores_its_lines() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-030", "not_in_stock", None).await;
    let indent = seed_indent(db, "PI-030", "pending", true).await;
    seed_indent_line(db, indent.id, tool.id).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InPi
    );
    // The indent being edited does not count against its own items.
    assert_eq!(
        resolver
            .resolve_state(tool.id, Some(indent.id))
            .await
            .unwrap(),
        ItemState::NotInStock
    );
    // Excluding some other indent changes nothing.
    assert_eq!(
        resolver
            .resolve_state(tool.id, Some(indent.id + 100))
            .await
            .unwrap(),
        ItemState::InPi
    );
}

#[tokio::test]
async fn qc_pending_movement_beats_location_holder() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-040", "location", Some("Rack C3")).await;
    seed_movement(db, tool.id, true).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InQc
    );
}

#[tokio::test]
async fn settled_movements_do_not_hold_an_item_in_qc() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-041", "location", Some("Rack C4")).await;
    seed_movement(db, tool.id, false).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InStock
    );
}

#[tokio::test]
async fn job_work_presence_marks_item_out() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-050", "location", Some("Rack D1")).await;
    seed_job_work(db, tool.id).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InJobWork
    );
}

/// Stacks every claim onto one item, then peels them off in order and
/// watches the resolved state walk down the precedence chain.
#[tokio::test]
async fn precedence_walks_from_order_down_to_holder() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item(db, "D-060", "location", Some("Rack E5")).await;
    let indent = seed_indent(db, "PI-060", "approved", true).await;
    let line = seed_indent_line(db, indent.id, tool.id).await;
    let order = seed_order(db, "PO-060", true).await;
    seed_order_line(db, order.id, line.id).await;
    let mov = seed_movement(db, tool.id, true).await;
    let jw = seed_job_work(db, tool.id).await;

    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InPo
    );

    purchase_order::ActiveModel {
        id: Set(order.id),
        is_active: Set(false),
        ..Default::default()
    }
    .update(db)
    .await
    .unwrap();
    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InPi
    );

    purchase_indent::ActiveModel {
        id: Set(indent.id),
        is_active: Set(false),
        ..Default::default()
    }
    .update(db)
    .await
    .unwrap();
    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InQc
    );

    movement::ActiveModel {
        id: Set(mov.id),
        is_qc_pending: Set(false),
        is_qc_approved: Set(true),
        ..Default::default()
    }
    .update(db)
    .await
    .unwrap();
    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InJobWork
    );

    job_work::Entity::delete_by_id(jw.id).exec(db).await.unwrap();
    assert_eq!(
        resolver.resolve_state(tool.id, None).await.unwrap(),
        ItemState::InStock
    );
}

#[tokio::test]
async fn eligibility_mirrors_resolved_state() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let unplaced = seed_item(db, "D-070", "not_in_stock", None).await;
    let shelved = seed_item(db, "D-071", "location", Some("Rack F1")).await;
    let at_vendor = seed_item(db, "D-072", "vendor", None).await;

    assert!(resolver
        .can_add_to_purchase_indent(unplaced.id, None)
        .await
        .unwrap());
    assert!(!resolver
        .can_add_to_purchase_indent(shelved.id, None)
        .await
        .unwrap());
    assert!(!resolver
        .can_add_to_purchase_indent(at_vendor.id, None)
        .await
        .unwrap());

    assert!(resolver.is_in_stock(shelved.id).await.unwrap());
    assert!(!resolver.is_in_stock(unplaced.id).await.unwrap());
    assert!(!resolver.is_in_stock(at_vendor.id).await.unwrap());
}

/// One item, three snapshots: untouched, on an indent, on an order. The
/// exclusion parameter only matters in the middle snapshot.
#[tokio::test]
async fn item_forty_two_walks_the_pipeline() {
    let app = TestApp::new().await;
    let db = &*app.state.db;
    let resolver = &app.state.services.item_state;

    let tool = seed_item_with_id(db, 42, "D-042").await;
    assert_eq!(
        resolver.resolve_state(42, None).await.unwrap(),
        ItemState::NotInStock
    );
    assert!(resolver.can_add_to_purchase_indent(42, None).await.unwrap());

    let indent = seed_indent_with_id(db, 7, "PI-007", "pending").await;
    let line = seed_indent_line(db, indent.id, tool.id).await;
    assert_eq!(
        resolver.resolve_state(42, None).await.unwrap(),
        ItemState::InPi
    );
    assert!(resolver
        .can_add_to_purchase_indent(42, Some(7))
        .await
        .unwrap());
    assert!(!resolver.can_add_to_purchase_indent(42, None).await.unwrap());

    let order = seed_order(db, "PO-042", true).await;
    seed_order_line(db, order.id, line.id).await;
    // An active order claims the item no matter what is excluded.
    assert_eq!(
        resolver.resolve_state(42, Some(7)).await.unwrap(),
        ItemState::InPo
    );
    assert_eq!(
        resolver.resolve_state(42, None).await.unwrap(),
        ItemState::InPo
    );
    assert!(!resolver
        .can_add_to_purchase_indent(42, Some(7))
        .await
        .unwrap());
}
