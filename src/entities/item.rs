use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Master record for a die or pattern tracked by the service.
///
/// `current_holder_type` and `current_location` record where the physical
/// asset sits when no procurement, QC, or job-work record claims it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub item_type: String,
    pub description: Option<String>,
    pub current_holder_type: String,
    pub current_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_indent_item::Entity")]
    PurchaseIndentItems,
    #[sea_orm(has_many = "super::movement::Entity")]
    Movements,
    #[sea_orm(has_many = "super::job_work::Entity")]
    JobWorks,
}

impl Related<super::purchase_indent_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseIndentItems.def()
    }
}

impl Related<super::movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Movements.def()
    }
}

impl Related<super::job_work::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JobWorks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Item categories accepted on item creation.
pub const VALID_ITEM_TYPES: &[&str] = &["die", "pattern"];

/// Stored holder of an item, used as the fallback when no lifecycle
/// record claims it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderType {
    NotInStock,
    Vendor,
    Location,
}

impl HolderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderType::NotInStock => "not_in_stock",
            HolderType::Vendor => "vendor",
            HolderType::Location => "location",
        }
    }

    /// Parses a stored holder string. Unrecognized values return `None`;
    /// callers treat that the same as `not_in_stock`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_in_stock" => Some(HolderType::NotInStock),
            "vendor" => Some(HolderType::Vendor),
            "location" => Some(HolderType::Location),
            _ => None,
        }
    }
}

impl std::fmt::Display for HolderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holder_type_round_trips_through_storage_strings() {
        for holder in [HolderType::NotInStock, HolderType::Vendor, HolderType::Location] {
            assert_eq!(HolderType::parse(holder.as_str()), Some(holder));
        }
    }

    #[test]
    fn unknown_holder_strings_parse_to_none() {
        assert_eq!(HolderType::parse(""), None);
        assert_eq!(HolderType::parse("warehouse"), None);
        assert_eq!(HolderType::parse("VENDOR"), None);
    }
}
