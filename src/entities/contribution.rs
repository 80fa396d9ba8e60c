//! Contribution entity - A member's deposit into a group's savings pool.
//!
//! `amount_minor` is the net amount after commission; the paired commission
//! row (see [`super::commission`]) holds the platform's cut, and
//! `amount_minor + commission_minor` reconstructs the gross amount exactly.
//! Rows are immutable after insert except for `status`, `synced` and
//! `sync_timestamp`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contribution database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributions")]
pub struct Model {
    /// Unique identifier for the contribution
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Contributing member
    pub user_id: i64,
    /// Group receiving the contribution
    pub group_id: i64,
    /// Net amount in minor units (gross minus commission)
    pub amount_minor: i64,
    /// Commission withheld, in minor units
    pub commission_minor: i64,
    /// Payment channel: `"mobile_money"`, `"bitcoin"` or `"usdt"`
    pub payment_method: String,
    /// Caller-supplied reference for matching against gateway records
    pub payment_reference: Option<String>,
    /// Free-form status string, `"pending"` on creation
    pub status: String,
    /// When the contribution was recorded locally
    pub created_at: DateTimeUtc,
    /// Whether the remote gateway has confirmed this record
    pub synced: bool,
    /// When the gateway confirmation happened
    pub sync_timestamp: Option<DateTimeUtc>,
}

/// Defines relationships between Contribution and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contribution belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each contribution belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
