use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::{
    entities::{
        item::{self, HolderType},
        movement::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::item_state::{ItemState, ItemStateService},
};

/// Service for physical movements: the QC queue and its decisions,
/// outward dispatch, and inward returns.
#[derive(Clone)]
pub struct MovementService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    item_state: Arc<ItemStateService>,
}

impl MovementService {
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

    /// Lists movements with pagination and an optional item filter, newest
    /// first.
    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        page: u64,
        limit: u64,
        item_id: Option<i64>,
    ) -> Result<(Vec<movement::Model>, u64), ServiceError> {
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
        let mut query = movement::Entity::find().order_by_desc(movement::Column::MovedAt);
        if let Some(item_id) = item_id {
            query = query.filter(movement::Column::ItemId.eq(item_id));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count movements: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let movements = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch movements page {}: {}", page, e);
            ServiceError::DatabaseError(e)
        })?;

        Ok((movements, total))
    }

    /// The QC queue: every movement still awaiting a quality decision,
    /// oldest first.
    #[instrument(skip(self))]
    pub async fn list_qc_pending(&self) -> Result<Vec<movement::Model>, ServiceError> {
        let db = &*self.db;
        movement::Entity::find()
            .filter(movement::Column::IsQcPending.eq(true))
            .order_by_asc(movement::Column::MovedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Accepts a QC-pending movement into stock. The movement is marked
    /// approved and the item takes up the supplied storage location.
    #[instrument(skip(self), fields(movement_id = %movement_id, location = %location))]
    pub async fn qc_approve(
        &self,
        movement_id: i64,
        location: String,
    ) -> Result<movement::Model, ServiceError> {
        let db = &*self.db;
        let (mov, item) = self.qc_pending_movement(movement_id).await?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let item_id = item.id;
        let mut mov_active: movement::ActiveModel = mov.into();
        mov_active.is_qc_pending = Set(false);
        mov_active.is_qc_approved = Set(true);
        mov_active.to_location = Set(Some(location.clone()));
        let updated = mov_active.update(&txn).await.map_err(|e| {
            error!("Failed to update movement {}: {}", movement_id, e);
            ServiceError::DatabaseError(e)
        })?;

        let mut item_active: item::ActiveModel = item.into();
        item_active.current_holder_type = Set(HolderType::Location.as_str().to_string());
        item_active.current_location = Set(Some(location));
        item_active.updated_at = Set(now);
        item_active.update(&txn).await.map_err(|e| {
            error!("Failed to update item {} after QC approval: {}", item_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::QcApproved {
                movement_id,
                item_id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "QC approved movement {} for item {}, item now in stock",
            movement_id, item_id
        );
        Ok(updated)
    }

    /// Rejects a QC-pending movement. A system-return movement is recorded
    /// and custody of the item goes back to the vendor.
    #[instrument(skip(self), fields(movement_id = %movement_id))]
    pub async fn qc_reject(
        &self,
        movement_id: i64,
        notes: Option<String>,
    ) -> Result<movement::Model, ServiceError> {
        let db = &*self.db;
        let (mov, item) = self.qc_pending_movement(movement_id).await?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let item_id = item.id;
        let reference_number = mov.reference_number.clone();
        let mut mov_active: movement::ActiveModel = mov.into();
        mov_active.is_qc_pending = Set(false);
        mov_active.is_qc_approved = Set(false);
        let updated = mov_active.update(&txn).await.map_err(|e| {
            error!("Failed to update movement {}: {}", movement_id, e);
            ServiceError::DatabaseError(e)
        })?;

        movement::ActiveModel {
            item_id: Set(item_id),
            movement_type: Set(MovementType::SystemReturn.as_str().to_string()),
            is_qc_pending: Set(false),
            is_qc_approved: Set(false),
            from_location: Set(None),
            to_location: Set(None),
            reference_number: Set(reference_number),
            notes: Set(notes),
            moved_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert system return movement: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut item_active: item::ActiveModel = item.into();
        item_active.current_holder_type = Set(HolderType::Vendor.as_str().to_string());
        item_active.current_location = Set(None);
        item_active.updated_at = Set(now);
        item_active.update(&txn).await.map_err(|e| {
            error!("Failed to update item {} after QC rejection: {}", item_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::QcRejected {
                movement_id,
                item_id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "QC rejected movement {} for item {}, item returned to vendor",
            movement_id, item_id
        );
        Ok(updated)
    }

    /// Dispatches an in-stock item out of the door. Records an outward
    /// movement and hands custody to the vendor side.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn dispatch_item(
        &self,
        item_id: i64,
        destination: String,
        notes: Option<String>,
    ) -> Result<movement::Model, ServiceError> {
        let db = &*self.db;
        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let state = self.item_state.resolve_state(item_id, None).await?;
        if state != ItemState::InStock {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is {} and cannot be dispatched",
                item.code,
                state.display_name()
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let created = movement::ActiveModel {
            item_id: Set(item_id),
            movement_type: Set(MovementType::Outward.as_str().to_string()),
            is_qc_pending: Set(false),
            is_qc_approved: Set(false),
            from_location: Set(item.current_location.clone()),
            to_location: Set(Some(destination)),
            reference_number: Set(None),
            notes: Set(notes),
            moved_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert outward movement: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut item_active: item::ActiveModel = item.into();
        item_active.current_holder_type = Set(HolderType::Vendor.as_str().to_string());
        item_active.current_location = Set(None);
        item_active.updated_at = Set(now);
        item_active.update(&txn).await.map_err(|e| {
            error!("Failed to update item {} after dispatch: {}", item_id, e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::ItemDispatched {
                item_id,
                movement_id: created.id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Item {} dispatched, movement {}", item_id, created.id);
        Ok(created)
    }

    /// Brings a dispatched item back in. Only items currently resolved as
    /// `Outward` qualify, and re-entry always goes through QC.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn return_item(
        &self,
        item_id: i64,
        notes: Option<String>,
    ) -> Result<movement::Model, ServiceError> {
        let db = &*self.db;
        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let state = self.item_state.resolve_state(item_id, None).await?;
        if state != ItemState::Outward {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is {} and cannot be returned",
                item.code,
                state.display_name()
            )));
        }

        let now = Utc::now();
        let created = movement::ActiveModel {
            item_id: Set(item_id),
            movement_type: Set(MovementType::Inward.as_str().to_string()),
            is_qc_pending: Set(true),
            is_qc_approved: Set(false),
            from_location: Set(None),
            to_location: Set(None),
            reference_number: Set(None),
            notes: Set(notes),
            moved_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!("Failed to insert inward movement: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::ItemReturned {
                item_id,
                movement_id: created.id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "Item {} returned into QC, movement {}",
            item_id, created.id
        );
        Ok(created)
    }

    /// Loads a movement and its item, failing unless the movement is
    /// still awaiting a QC decision.
    async fn qc_pending_movement(
        &self,
        movement_id: i64,
    ) -> Result<(movement::Model, item::Model), ServiceError> {
        let db = &*self.db;
        let mov = movement::Entity::find_by_id(movement_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Movement {} not found", movement_id)))?;
        if !mov.is_qc_pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Movement {} is not awaiting QC",
                movement_id
            )));
        }

        let item = item::Entity::find_by_id(mov.item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", mov.item_id)))?;

        Ok((mov, item))
    }
}
