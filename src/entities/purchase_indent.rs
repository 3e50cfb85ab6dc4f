use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase indent header. `status` tracks the approval workflow while
/// `is_active` is an independent lifecycle flag: cancelling or fulfilling
/// an indent clears `is_active` without touching `status`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_indents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub indent_number: String,
    pub status: String,
    pub is_active: bool,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_indent_item::Entity")]
    PurchaseIndentItems,
}

impl Related<super::purchase_indent_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseIndentItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Approval workflow status of a purchase indent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentStatus {
    Pending,
    Approved,
    Rejected,
}

impl IndentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndentStatus::Pending => "pending",
            IndentStatus::Approved => "approved",
            IndentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(IndentStatus::Pending),
            "approved" => Some(IndentStatus::Approved),
            "rejected" => Some(IndentStatus::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for IndentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
