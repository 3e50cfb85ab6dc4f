use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{error, info, instrument};

use crate::{
    entities::{
        item::{self, HolderType},
        job_work,
        movement::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::item_state::{ItemState, ItemStateService},
};

/// Service for job-work assignments: sending an in-stock item out to a
/// vendor for processing and bringing it back through QC.
#[derive(Clone)]
pub struct JobWorkService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    item_state: Arc<ItemStateService>,
}

impl JobWorkService {
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

    /// Sends an in-stock item out on job work. Records the open
    /// assignment, an outward movement, and the custody change in one
    /// transaction.
    #[instrument(skip(self), fields(item_id = %item_id, vendor = %vendor))]
    pub async fn assign_job_work(
        &self,
        item_id: i64,
        vendor: String,
        expected_return_date: Option<DateTime<Utc>>,
        remarks: Option<String>,
    ) -> Result<job_work::Model, ServiceError> {
        let db = &*self.db;
        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let state = self.item_state.resolve_state(item_id, None).await?;
        if state != ItemState::InStock {
            return Err(ServiceError::InvalidOperation(format!(
                "Item {} is {} and cannot be sent on job work",
                item.code,
                state.display_name()
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let now = Utc::now();
        let created = job_work::ActiveModel {
            item_id: Set(item_id),
            vendor: Set(vendor.clone()),
            expected_return_date: Set(expected_return_date),
            remarks: Set(remarks),
            issued_at: Set(now),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert job work: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        movement::ActiveModel {
            item_id: Set(item_id),
            movement_type: Set(MovementType::Outward.as_str().to_string()),
            is_qc_pending: Set(false),
            is_qc_approved: Set(false),
            from_location: Set(item.current_location.clone()),
            to_location: Set(Some(vendor)),
            reference_number: Set(None),
            notes: Set(None),
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
            error!(
                "Failed to update item {} after job work assignment: {}",
                item_id, e
            );
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::JobWorkAssigned {
                job_work_id: created.id,
                item_id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!("Job work {} assigned for item {}", created.id, item_id);
        Ok(created)
    }

    /// Completes a job-work assignment. The open row is deleted and the
    /// item comes back in through QC.
    #[instrument(skip(self), fields(job_work_id = %job_work_id))]
    pub async fn complete_job_work(
        &self,
        job_work_id: i64,
    ) -> Result<movement::Model, ServiceError> {
        let db = &*self.db;
        let job = job_work::Entity::find_by_id(job_work_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Job work {} not found", job_work_id))
            })?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let item_id = job.item_id;
        let vendor = job.vendor.clone();
        job_work::Entity::delete_by_id(job_work_id)
            .exec(&txn)
            .await
            .map_err(|e| {
                error!("Failed to delete job work {}: {}", job_work_id, e);
                ServiceError::DatabaseError(e)
            })?;

        let now = Utc::now();
        let created = movement::ActiveModel {
            item_id: Set(item_id),
            movement_type: Set(MovementType::Inward.as_str().to_string()),
            is_qc_pending: Set(true),
            is_qc_approved: Set(false),
            from_location: Set(Some(vendor)),
            to_location: Set(None),
            reference_number: Set(None),
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

        txn.commit().await.map_err(ServiceError::db_error)?;

        self.event_sender
            .send(Event::JobWorkCompleted {
                job_work_id,
                item_id,
            })
            .await
            .map_err(|e| ServiceError::EventError(format!("Failed to send event: {}", e)))?;

        info!(
            "Job work {} completed, item {} back into QC",
            job_work_id, item_id
        );
        Ok(created)
    }

    /// Gets an open job-work assignment by id.
    #[instrument(skip(self))]
    pub async fn get_job_work(
        &self,
        job_work_id: i64,
    ) -> Result<Option<job_work::Model>, ServiceError> {
        let db = &*self.db;
        job_work::Entity::find_by_id(job_work_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)
    }

    /// Lists open assignments with pagination and an optional item filter.
    #[instrument(skip(self))]
    pub async fn list_job_works(
        &self,
        page: u64,
        limit: u64,
        item_id: Option<i64>,
    ) -> Result<(Vec<job_work::Model>, u64), ServiceError> {
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
        let mut query = job_work::Entity::find().order_by_asc(job_work::Column::Id);
        if let Some(item_id) = item_id {
            query = query.filter(job_work::Column::ItemId.eq(item_id));
        }

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await.map_err(|e| {
            error!("Failed to count job works: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let jobs = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!("Failed to fetch job works page {}: {}", page, e);
            ServiceError::DatabaseError(e)
        })?;

        Ok((jobs, total))
    }
}
