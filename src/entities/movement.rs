use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Physical movement of an item. Inward receipts arrive with
/// `is_qc_pending` set and hold the item in QC until a quality decision
/// clears the flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub item_id: i64,
    pub movement_type: String,
    pub is_qc_pending: bool,
    pub is_qc_approved: bool,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub moved_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Direction of a movement. `SystemReturn` is recorded automatically when
/// QC rejects a receipt and the item goes back to the vendor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Inward,
    Outward,
    SystemReturn,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Inward => "inward",
            MovementType::Outward => "outward",
            MovementType::SystemReturn => "system_return",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inward" => Some(MovementType::Inward),
            "outward" => Some(MovementType::Outward),
            "system_return" => Some(MovementType::SystemReturn),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
