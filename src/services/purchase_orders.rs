use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::{
    entities::{
        movement::{self, MovementType},
        purchase_indent::{self, IndentStatus},
        purchase_indent_item, purchase_order, purchase_order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// A requested line on a new purchase order, referencing the indent line
/// it fulfils.
#[derive(Debug, Clone)]
pub struct OrderLineRequest {
    pub purchase_indent_item_id: i64,
    pub rate: Option<Decimal>,
}

/// Service for purchase orders: creation from approved indent lines,
/// receiving into QC, and cancellation.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an active purchase order. Every referenced indent line must
    /// belong to an active, approved indent and must not already sit on
    /// another active order.
    #[instrument(skip(self, lines), fields(order_number = %order_number, line_count = lines.len()))]
    pub async fn create_purchase_order(
        &self,
        order_number: String,
        vendor: String,
        expected_delivery_date: Option<DateTime<Utc>>,
        remarks: Option<String>,
        lines: Vec<OrderLineRequest>,
    ) -> Result<(purchase_order::Model, Vec<purchase_order_item::Model>), ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase order needs at least one line".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for line in &lines {
            if !seen.insert(line.purchase_indent_item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Indent line {} appears more than once in the order lines",
                    line.purchase_indent_item_id
                )));
            }
        }

        for line in &lines {
            self.ensure_line_orderable(line.purchase_indent_item_id)
                .await?;
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let order = purchase_order::ActiveModel {
            order_number: Set(order_number),
            vendor: Set(vendor),
            expected_delivery_date: Set(expected_delivery_date),
            is_active: Set(true),
            remarks: Set(remarks),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert purchase order: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut saved_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let saved = purchase_order_item::ActiveModel {
                purchase_order_id: Set(order.id),
                purchase_indent_item_id: Set(line.purchase_indent_item_id),
                rate: Set(line.rate),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!("Failed to insert order line: {}", e);
                ServiceError::DatabaseError(e)
            })?;
            saved_lines.push(saved);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::PurchaseOrderCreated(order.id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "Purchase order created: {} with {} line(s)",
            order.id,
            saved_lines.len()
        );
        Ok((order, saved_lines))
    }

    /// Receives an active order. Every line's item gets an inward movement
    /// flagged for QC with the order number as reference, then the order
    /// and each distinct source indent are deactivated. Closing the source
    /// indents is what lets the received items resolve as awaiting QC
    /// instead of still sitting on an open indent.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn receive_purchase_order(
        &self,
        order_id: i64,
    ) -> Result<purchase_order::Model, ServiceError> {
        let db = &*self.db;
        let order = purchase_order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;
        if !order.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order {} is not active and cannot be received",
                order_id
            )));
        }

        let lines = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .find_also_related(purchase_indent_item::Entity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if lines.is_empty() {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order {} has no lines to receive",
                order_id
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let mut source_indents = HashSet::new();
        let mut received = 0usize;
        for (line, indent_line) in &lines {
            let indent_line = indent_line.as_ref().ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Order line {} has no indent line attached",
                    line.id
                ))
            })?;
            source_indents.insert(indent_line.purchase_indent_id);

            movement::ActiveModel {
                item_id: Set(indent_line.item_id),
                movement_type: Set(MovementType::Inward.as_str().to_string()),
                is_qc_pending: Set(true),
                is_qc_approved: Set(false),
                from_location: Set(Some(order.vendor.clone())),
                to_location: Set(None),
                reference_number: Set(Some(order.order_number.clone())),
                notes: Set(None),
                moved_at: Set(now),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!("Failed to insert inward movement: {}", e);
                ServiceError::DatabaseError(e)
            })?;
            received += 1;
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.is_active = Set(false);
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(|e| {
            error!("Failed to deactivate purchase order {}: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        let indents = purchase_indent::Entity::find()
            .filter(purchase_indent::Column::Id.is_in(source_indents.iter().copied()))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        for indent in indents {
            let mut active: purchase_indent::ActiveModel = indent.into();
            active.is_active = Set(false);
            active.updated_at = Set(now);
            active.update(&txn).await.map_err(|e| {
                error!("Failed to deactivate source indent: {}", e);
                ServiceError::DatabaseError(e)
            })?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::PurchaseOrderReceived {
                order_id,
                items_received: received,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "Purchase order received: {} ({} item(s) into QC)",
            order_id, received
        );
        Ok(updated)
    }

    /// Cancels an active order. Its indent lines become orderable again.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_purchase_order(
        &self,
        order_id: i64,
    ) -> Result<purchase_order::Model, ServiceError> {
        let db = &*self.db;
        let order = purchase_order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;
        if !order.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order {} is already inactive",
                order_id
            )));
        }

        let mut active: purchase_order::ActiveModel = order.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await.map_err(|e| {
            error!("Failed to cancel purchase order {}: {}", order_id, e);
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::PurchaseOrderCancelled(order_id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Purchase order cancelled: {}", order_id);
        Ok(updated)
    }

    /// Gets an order with its lines.
    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        order_id: i64,
    ) -> Result<Option<(purchase_order::Model, Vec<purchase_order_item::Model>)>, ServiceError>
    {
        let db = &*self.db;
        let order = purchase_order::Entity::find_by_id(order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let Some(order) = order else {
            return Ok(None);
        };

        let lines = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Some((order, lines)))
    }

    /// Lists orders with pagination and an optional active filter.
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        page: u64,
        limit: u64,
        is_active: Option<bool>,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = &*self.db;
        let mut query = purchase_order::Entity::find().order_by_asc(purchase_order::Column::Id);
        if let Some(is_active) = is_active {
            query = query.filter(purchase_order::Column::IsActive.eq(is_active));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count purchase orders: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let orders = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch purchase orders page {}: {}", page, e);
            ServiceError::DatabaseError(e)
        })?;

        Ok((orders, total))
    }

    /// An indent line is orderable when it exists, its parent indent is
    /// active and approved, and no other active order already carries it.
    async fn ensure_line_orderable(&self, indent_line_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db;
        let indent_line = purchase_indent_item::Entity::find_by_id(indent_line_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Indent line {} not found", indent_line_id))
            })?;

        let indent = purchase_indent::Entity::find_by_id(indent_line.purchase_indent_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Purchase indent {} not found",
                    indent_line.purchase_indent_id
                ))
            })?;
        if !indent.is_active || indent.status != IndentStatus::Approved.as_str() {
            return Err(ServiceError::InvalidOperation(format!(
                "Indent line {} belongs to indent {} which is {} and cannot be ordered",
                indent_line_id,
                indent.id,
                if indent.is_active {
                    indent.status.as_str()
                } else {
                    "inactive"
                }
            )));
        }

        let already_ordered = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseIndentItemId.eq(indent_line_id))
            .inner_join(purchase_order::Entity)
            .filter(purchase_order::Column::IsActive.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        if already_ordered > 0 {
            return Err(ServiceError::Conflict(format!(
                "Indent line {} is already on an active purchase order",
                indent_line_id
            )));
        }

        Ok(())
    }
}
