use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::{
    entities::item::{self, HolderType, VALID_ITEM_TYPES},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Service for managing the item master.
#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ItemService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Registers a new item. Items start with no stock position; they
    /// enter the pipeline through a purchase indent.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn create_item(
        &self,
        code: String,
        name: String,
        item_type: String,
        description: Option<String>,
    ) -> Result<item::Model, ServiceError> {
        if !VALID_ITEM_TYPES.contains(&item_type.as_str()) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid item type: {}. Valid types are: {:?}",
                item_type, VALID_ITEM_TYPES
            )));
        }

        let db = &*self.db;
        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let existing = item::Entity::find()
            .filter(item::Column::Code.eq(&code))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Item with code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = item::ActiveModel {
            code: Set(code),
            name: Set(name),
            item_type: Set(item_type),
            description: Set(description),
            current_holder_type: Set(HolderType::NotInStock.as_str().to_string()),
            current_location: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let created = model.insert(&txn).await.map_err(|e| {
            error!("Failed to insert item: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::ItemCreated(created.id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Item created: {} ({})", created.id, created.code);
        Ok(created)
    }

    /// Updates the descriptive fields of an item. Custody fields are only
    /// touched by QC, dispatch, and job-work operations.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_item(
        &self,
        item_id: i64,
        name: Option<String>,
        item_type: Option<String>,
        description: Option<String>,
    ) -> Result<item::Model, ServiceError> {
        if let Some(ref item_type) = item_type {
            if !VALID_ITEM_TYPES.contains(&item_type.as_str()) {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid item type: {}. Valid types are: {:?}",
                    item_type, VALID_ITEM_TYPES
                )));
            }
        }

        let db = &*self.db;
        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let mut active: item::ActiveModel = item.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(item_type) = item_type {
            active.item_type = Set(item_type);
        }
        if let Some(description) = description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(|e| {
            error!("Failed to update item {}: {}", item_id, e);
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send(Event::ItemUpdated(updated.id))
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Item updated: {}", updated.id);
        Ok(updated)
    }

    /// Gets an item by id.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: i64) -> Result<Option<item::Model>, ServiceError> {
        let db = &*self.db;
        item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Gets an item by its caller-supplied code.
    #[instrument(skip(self))]
    pub async fn get_item_by_code(&self, code: &str) -> Result<Option<item::Model>, ServiceError> {
        let db = &*self.db;
        item::Entity::find()
            .filter(item::Column::Code.eq(code))
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists items with pagination and an optional type filter.
    #[instrument(skip(self))]
    pub async fn list_items(
        &self,
        page: u64,
        limit: u64,
        item_type: Option<String>,
    ) -> Result<(Vec<item::Model>, u64), ServiceError> {
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
        let mut query = item::Entity::find().order_by_asc(item::Column::Id);
        if let Some(item_type) = item_type {
            query = query.filter(item::Column::ItemType.eq(item_type));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count items: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch items page {}: {}", page, e);
            ServiceError::DatabaseError(e)
        })?;

        Ok((items, total))
    }
}
