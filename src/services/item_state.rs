use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    entities::{
        item::{self, HolderType},
        job_work, movement, purchase_indent, purchase_indent_item, purchase_order,
        purchase_order_item,
    },
    errors::ServiceError,
};

/// Indent statuses that keep an indent line open for state resolution.
/// Rejected indents never claim an item.
const OPEN_INDENT_STATUSES: &[&str] = &["pending", "approved"];

/// Lifecycle position of an item, derived on demand from the procurement,
/// QC, and job-work tables. The variants are terminal labels for a derived
/// read; no transitions are stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    NotInStock,
    InPo,
    InPi,
    InQc,
    InJobWork,
    Outward,
    InStock,
}

impl ItemState {
    /// Human-readable label for reports and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            ItemState::NotInStock => "Not In Stock",
            ItemState::InPo => "In PO",
            ItemState::InPi => "In PI",
            ItemState::InQc => "In QC",
            ItemState::InJobWork => "In Job Work",
            ItemState::Outward => "Outward",
            ItemState::InStock => "In Stock",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Read-only resolver for item lifecycle state.
///
/// Checks run in strict precedence order with an early return at the
/// first match: active purchase order, open purchase indent, pending QC
/// movement, job work, then the item's stored holder type. The resolver
/// holds no state between calls and never mutates the store. Eligibility
/// answers are plain reads: two concurrent callers can both pass
/// `can_add_to_purchase_indent` before either commit lands, and closing
/// that race is left to the callers' own transactions and constraints.
#[derive(Clone)]
pub struct ItemStateService {
    db: Arc<DatabaseConnection>,
}

impl ItemStateService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Resolves the current lifecycle state of an item.
    ///
    /// An id with no item row resolves to `NotInStock` rather than an
    /// error; callers rely on unknown ids being eligible-by-default. When
    /// `exclude_indent_id` is given, membership in that indent does not
    /// count, so an editor can re-validate lines against the indent it is
    /// editing.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn resolve_state(
        &self,
        item_id: i64,
        exclude_indent_id: Option<i64>,
    ) -> Result<ItemState, ServiceError> {
        let started = Instant::now();
        let state = self.resolve_state_inner(item_id, exclude_indent_id).await?;

        histogram!(
            "toolstock_state.resolve.duration",
            started.elapsed().as_secs_f64()
        );
        counter!("toolstock_state.resolve.total", 1, "state" => state.display_name());

        Ok(state)
    }

    async fn resolve_state_inner(
        &self,
        item_id: i64,
        exclude_indent_id: Option<i64>,
    ) -> Result<ItemState, ServiceError> {
        let db = &*self.db;

        let item = item::Entity::find_by_id(item_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let Some(item) = item else {
            debug!("item {} not found, defaulting to not in stock", item_id);
            return Ok(ItemState::NotInStock);
        };

        if self.has_active_order_line(item_id).await? {
            return Ok(ItemState::InPo);
        }

        if self
            .has_open_indent_line(item_id, exclude_indent_id)
            .await?
        {
            return Ok(ItemState::InPi);
        }

        if self.has_pending_qc_movement(item_id).await? {
            return Ok(ItemState::InQc);
        }

        if self.has_job_work(item_id).await? {
            return Ok(ItemState::InJobWork);
        }

        Ok(match HolderType::parse(&item.current_holder_type) {
            Some(HolderType::Vendor) => ItemState::Outward,
            Some(HolderType::Location) => ItemState::InStock,
            Some(HolderType::NotInStock) | None => ItemState::NotInStock,
        })
    }

    /// True when the item may be added to a purchase indent. Items with
    /// any pipeline presence or stock position do not qualify; only a
    /// resolved `NotInStock` does.
    pub async fn can_add_to_purchase_indent(
        &self,
        item_id: i64,
        exclude_indent_id: Option<i64>,
    ) -> Result<bool, ServiceError> {
        let state = self.resolve_state(item_id, exclude_indent_id).await?;
        Ok(state == ItemState::NotInStock)
    }

    /// True when the item sits at a storage location with no pipeline
    /// presence. Gates job-work assignment and outward dispatch.
    pub async fn is_in_stock(&self, item_id: i64) -> Result<bool, ServiceError> {
        let state = self.resolve_state(item_id, None).await?;
        Ok(state == ItemState::InStock)
    }

    /// Any purchase order line on an active order whose indent line
    /// references this item. The highest-precedence claim.
    async fn has_active_order_line(&self, item_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db;
        let count = purchase_order_item::Entity::find()
            .inner_join(purchase_indent_item::Entity)
            .filter(purchase_indent_item::Column::ItemId.eq(item_id))
            .inner_join(purchase_order::Entity)
            .filter(purchase_order::Column::IsActive.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(count > 0)
    }

    /// Any indent line for this item whose parent indent is active with a
    /// pending or approved status, is not the excluded indent, and has not
    /// itself graduated onto an active purchase order.
    ///
    /// That last condition cannot change the outcome of `resolve_state`,
    /// since the active-order branch runs first and returns early. It is
    /// kept to match the documented precedence rather than being cleaned
    /// up, and the tests pin it down directly.
    pub(crate) async fn has_open_indent_line(
        &self,
        item_id: i64,
        exclude_indent_id: Option<i64>,
    ) -> Result<bool, ServiceError> {
        let db = &*self.db;

        let mut query = purchase_indent_item::Entity::find()
            .filter(purchase_indent_item::Column::ItemId.eq(item_id))
            .inner_join(purchase_indent::Entity)
            .filter(purchase_indent::Column::IsActive.eq(true))
            .filter(purchase_indent::Column::Status.is_in(OPEN_INDENT_STATUSES.iter().copied()));
        if let Some(excluded) = exclude_indent_id {
            query = query.filter(purchase_indent_item::Column::PurchaseIndentId.ne(excluded));
        }

        let candidates: Vec<i64> = query
            .select_only()
            .column(purchase_indent_item::Column::Id)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        if candidates.is_empty() {
            return Ok(false);
        }

        let ordered: Vec<i64> = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseIndentItemId.is_in(candidates.clone()))
            .inner_join(purchase_order::Entity)
            .filter(purchase_order::Column::IsActive.eq(true))
            .select_only()
            .column(purchase_order_item::Column::PurchaseIndentItemId)
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(candidates.iter().any(|id| !ordered.contains(id)))
    }

    /// Any movement with the QC-pending flag set, regardless of type.
    async fn has_pending_qc_movement(&self, item_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db;
        let count = movement::Entity::find()
            .filter(movement::Column::ItemId.eq(item_id))
            .filter(movement::Column::IsQcPending.eq(true))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(count > 0)
    }

    /// Any job-work row at all; presence alone marks the item as out.
    async fn has_job_work(&self, item_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db;
        let count = job_work::Entity::find()
            .filter(job_work::Column::ItemId.eq(item_id))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, establish_connection_with_config, DbConfig};
    use sea_orm::{ActiveModelTrait, Set};

    // A pooled memory database hands every connection its own blank
    // store, so the pool is pinned to one connection.
    async fn memory_db() -> Arc<sea_orm::DatabaseConnection> {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = establish_connection_with_config(&config).await.unwrap();
        ensure_schema(&db).await.unwrap();
        Arc::new(db)
    }

    #[test]
    fn display_names_cover_every_state() {
        let expected = [
            (ItemState::NotInStock, "Not In Stock"),
            (ItemState::InPo, "In PO"),
            (ItemState::InPi, "In PI"),
            (ItemState::InQc, "In QC"),
            (ItemState::InJobWork, "In Job Work"),
            (ItemState::Outward, "Outward"),
            (ItemState::InStock, "In Stock"),
        ];
        for (state, label) in expected {
            assert_eq!(state.display_name(), label);
            assert_eq!(state.to_string(), label);
        }
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ItemState::InJobWork).unwrap(),
            "\"in_job_work\""
        );
        assert_eq!(
            serde_json::from_str::<ItemState>("\"in_po\"").unwrap(),
            ItemState::InPo
        );
    }

    #[test]
    fn open_statuses_exclude_rejected() {
        assert!(OPEN_INDENT_STATUSES.contains(&"pending"));
        assert!(OPEN_INDENT_STATUSES.contains(&"approved"));
        assert!(!OPEN_INDENT_STATUSES.contains(&"rejected"));
    }

    // Exercises the ordered-line filter on its own. resolve_state can
    // never reach the case where it matters, so the check is pinned here.
    #[tokio::test]
    async fn ordered_indent_lines_do_not_count_as_open() {
        let db = memory_db().await;
        let resolver = ItemStateService::new(db.clone());
        let now = chrono::Utc::now();

        let tool = item::ActiveModel {
            code: Set("D-100".to_string()),
            name: Set("Bracket die".to_string()),
            item_type: Set("die".to_string()),
            current_holder_type: Set(HolderType::NotInStock.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*db)
        .await
        .unwrap();

        let indent = purchase_indent::ActiveModel {
            indent_number: Set("PI-1".to_string()),
            status: Set("approved".to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*db)
        .await
        .unwrap();

        let line = purchase_indent_item::ActiveModel {
            purchase_indent_id: Set(indent.id),
            item_id: Set(tool.id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&*db)
        .await
        .unwrap();

        assert!(resolver.has_open_indent_line(tool.id, None).await.unwrap());

        let order = purchase_order::ActiveModel {
            order_number: Set("PO-1".to_string()),
            vendor: Set("Acme Foundry".to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*db)
        .await
        .unwrap();

        purchase_order_item::ActiveModel {
            purchase_order_id: Set(order.id),
            purchase_indent_item_id: Set(line.id),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&*db)
        .await
        .unwrap();

        // Once the line sits on an active order, the earlier branch wins
        // and the indent check itself no longer sees the line.
        assert_eq!(
            resolver.resolve_state(tool.id, None).await.unwrap(),
            ItemState::InPo
        );
        assert!(!resolver.has_open_indent_line(tool.id, None).await.unwrap());

        purchase_order::ActiveModel {
            id: Set(order.id),
            is_active: Set(false),
            ..Default::default()
        }
        .update(&*db)
        .await
        .unwrap();

        assert_eq!(
            resolver.resolve_state(tool.id, None).await.unwrap(),
            ItemState::InPi
        );
        assert!(resolver.has_open_indent_line(tool.id, None).await.unwrap());
    }
}
