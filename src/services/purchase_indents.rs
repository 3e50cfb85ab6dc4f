use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::{
    entities::{
        item,
        purchase_indent::{self, IndentStatus},
        purchase_indent_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::item_state::{ItemState, ItemStateService},
};

/// A requested line on a new or edited purchase indent.
#[derive(Debug, Clone)]
pub struct IndentLineRequest {
    pub item_id: i64,
    pub remarks: Option<String>,
}

/// Service for the purchase indent workflow: creation and editing gated
/// by item eligibility, and the pending/approved/rejected status moves.
#[derive(Clone)]
pub struct PurchaseIndentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    item_state: Arc<ItemStateService>,
}

impl PurchaseIndentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        item_state: Arc<ItemStateService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            item_state,
        }
    }

    /// Creates a pending indent with its lines. Every line's item must
    /// currently resolve to `Not In Stock`; anything already in the
    /// pipeline or on a shelf is refused with its current state named.
    ///
    /// The eligibility checks are reads against the shared store, not a
    /// reservation. Two concurrent creations for the same item can both
    /// pass and both commit.
    #[instrument(skip(self, lines), fields(indent_number = %indent_number, line_count = lines.len()))]
    pub async fn create_purchase_indent(
        &self,
        indent_number: String,
        remarks: Option<String>,
        lines: Vec<IndentLineRequest>,
    ) -> Result<(purchase_indent::Model, Vec<purchase_indent_item::Model>), ServiceError> {
        self.validate_lines(&lines)?;
        for line in &lines {
            self.ensure_item_eligible(line.item_id, None).await?;
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let indent = purchase_indent::ActiveModel {
            indent_number: Set(indent_number),
            status: Set(IndentStatus::Pending.as_str().to_string()),
            is_active: Set(true),
            remarks: Set(remarks),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert purchase indent: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut saved_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let saved = purchase_indent_item::ActiveModel {
                purchase_indent_id: Set(indent.id),
                item_id: Set(line.item_id),
                remarks: Set(line.remarks),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!("Failed to insert indent line: {}", e);
                ServiceError::DatabaseError(e)
            })?;
            saved_lines.push(saved);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::PurchaseIndentCreated(indent.id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "Purchase indent created: {} with {} line(s)",
            indent.id,
            saved_lines.len()
        );
        Ok((indent, saved_lines))
    }

    /// Replaces the lines and remarks of a pending indent. Lines are
    /// re-validated with the indent itself excluded, so an item whose only
    /// pipeline presence is this indent stays eligible for re-addition.
    #[instrument(skip(self, lines), fields(indent_id = %indent_id))]
    pub async fn update_purchase_indent(
        &self,
        indent_id: i64,
        remarks: Option<String>,
        lines: Vec<IndentLineRequest>,
    ) -> Result<(purchase_indent::Model, Vec<purchase_indent_item::Model>), ServiceError> {
        self.validate_lines(&lines)?;

        let db = &*self.db;
        let indent = purchase_indent::Entity::find_by_id(indent_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase indent {} not found", indent_id))
            })?;
        self.ensure_pending_and_active(&indent)?;

        for line in &lines {
            self.ensure_item_eligible(line.item_id, Some(indent_id))
                .await?;
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        purchase_indent_item::Entity::delete_many()
            .filter(purchase_indent_item::Column::PurchaseIndentId.eq(indent_id))
            .exec(&txn)
            .await
            .map_err(|e| {
                error!("Failed to clear indent lines: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        let now = Utc::now();
        let mut saved_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let saved = purchase_indent_item::ActiveModel {
                purchase_indent_id: Set(indent_id),
                item_id: Set(line.item_id),
                remarks: Set(line.remarks),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!("Failed to insert indent line: {}", e);
                ServiceError::DatabaseError(e)
            })?;
            saved_lines.push(saved);
        }

        let mut active: purchase_indent::ActiveModel = indent.into();
        if let Some(remarks) = remarks {
            active.remarks = Set(Some(remarks));
        }
        active.updated_at = Set(now);
        let updated = active.update(&txn).await.map_err(|e| {
            error!("Failed to update purchase indent {}: {}", indent_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::PurchaseIndentUpdated(indent_id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Purchase indent updated: {}", indent_id);
        Ok((updated, saved_lines))
    }

    /// Approves a pending indent, making its lines orderable.
    #[instrument(skip(self), fields(indent_id = %indent_id))]
    pub async fn approve_purchase_indent(
        &self,
        indent_id: i64,
    ) -> Result<purchase_indent::Model, ServiceError> {
        let updated = self.set_status(indent_id, IndentStatus::Approved).await?;

        self.event_sender
            .send(Event::PurchaseIndentApproved(indent_id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Purchase indent approved: {}", indent_id);
        Ok(updated)
    }

    /// Rejects a pending indent. Rejected indents no longer claim their
    /// items even while the row stays active.
    #[instrument(skip(self), fields(indent_id = %indent_id))]
    pub async fn reject_purchase_indent(
        &self,
        indent_id: i64,
    ) -> Result<purchase_indent::Model, ServiceError> {
        let updated = self.set_status(indent_id, IndentStatus::Rejected).await?;

        self.event_sender
            .send(Event::PurchaseIndentRejected(indent_id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Purchase indent rejected: {}", indent_id);
        Ok(updated)
    }

    /// Cancels an indent by clearing its active flag. The status is left
    /// as it was.
    #[instrument(skip(self), fields(indent_id = %indent_id))]
    pub async fn cancel_purchase_indent(
        &self,
        indent_id: i64,
    ) -> Result<purchase_indent::Model, ServiceError> {
        let db = &*self.db;
        let indent = purchase_indent::Entity::find_by_id(indent_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase indent {} not found", indent_id))
            })?;

        if !indent.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase indent {} is already inactive",
                indent_id
            )));
        }

        let mut active: purchase_indent::ActiveModel = indent.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await.map_err(|e| {
            error!("Failed to cancel purchase indent {}: {}", indent_id, e);
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::PurchaseIndentCancelled(indent_id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Purchase indent cancelled: {}", indent_id);
        Ok(updated)
    }

    /// Gets an indent with its lines.
    #[instrument(skip(self))]
    pub async fn get_purchase_indent(
        &self,
        indent_id: i64,
    ) -> Result<Option<(purchase_indent::Model, Vec<purchase_indent_item::Model>)>, ServiceError>
    {
        let db = &*self.db;
        let indent = purchase_indent::Entity::find_by_id(indent_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let Some(indent) = indent else {
            return Ok(None);
        };

        let lines = purchase_indent_item::Entity::find()
            .filter(purchase_indent_item::Column::PurchaseIndentId.eq(indent_id))
            .order_by_asc(purchase_indent_item::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Some((indent, lines)))
    }

    /// Lists indents with pagination and an optional status filter.
    #[instrument(skip(self))]
    pub async fn list_purchase_indents(
        &self,
        page: u64,
        limit: u64,
        status: Option<String>,
    ) -> Result<(Vec<purchase_indent::Model>, u64), ServiceError> {
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
        if let Some(ref status) = status {
            if IndentStatus::parse(status).is_none() {
                return Err(ServiceError::InvalidStatus(format!(
                    "Unknown indent status: {}",
                    status
                )));
            }
        }

        let db = &*self.db;
        let mut query = purchase_indent::Entity::find().order_by_asc(purchase_indent::Column::Id);
        if let Some(status) = status {
            query = query.filter(purchase_indent::Column::Status.eq(status));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count purchase indents: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let indents = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch purchase indents page {}: {}", page, e);
            ServiceError::DatabaseError(e)
        })?;

        Ok((indents, total))
    }

    fn validate_lines(&self, lines: &[IndentLineRequest]) -> Result<(), ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::ValidationError(
                "A purchase indent needs at least one line".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for line in lines {
            if !seen.insert(line.item_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Item {} appears more than once in the indent lines",
                    line.item_id
                )));
            }
        }
        Ok(())
    }

    fn ensure_pending_and_active(
        &self,
        indent: &purchase_indent::Model,
    ) -> Result<(), ServiceError> {
        if !indent.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase indent {} is inactive",
                indent.id
            )));
        }
        if indent.status != IndentStatus::Pending.as_str() {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase indent {} is {}, only pending indents can be changed",
                indent.id, indent.status
            )));
        }
        Ok(())
    }

    /// Line items must exist before they can be requested; beyond that the
    /// resolved state decides. The error names the item code and the state
    /// blocking it.
    async fn ensure_item_eligible(
        &self,
        item_id: i64,
        exclude_indent_id: Option<i64>,
    ) -> Result<(), ServiceError> {
        let db = &*self.db;
        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let state = self
            .item_state
            .resolve_state(item_id, exclude_indent_id)
            .await?;
        if state != ItemState::NotInStock {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} cannot be added to a purchase indent while {}",
                item.code,
                state.display_name()
            )));
        }
        Ok(())
    }

    async fn set_status(
        &self,
        indent_id: i64,
        new_status: IndentStatus,
    ) -> Result<purchase_indent::Model, ServiceError> {
        let db = &*self.db;
        let indent = purchase_indent::Entity::find_by_id(indent_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase indent {} not found", indent_id))
            })?;
        self.ensure_pending_and_active(&indent)?;

        let mut active: purchase_indent::ActiveModel = indent.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active.update(db).await.map_err(|e| {
            error!(
                "Failed to set purchase indent {} to {}: {}",
                indent_id, new_status, e
            );
            ServiceError::DatabaseError(e)
        })
    }
}
