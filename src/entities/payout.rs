//! Payout entity - A disbursement from a group's pool to a member.
//!
//! `status` is the state-machine field: `pending -> approved -> completed`,
//! with `failed` reachable from `pending` or `approved`. `completed` and
//! `failed` are terminal. Transitions are enforced in
//! [`crate::core::payout`] with guarded single-row updates.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payout database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payouts")]
pub struct Model {
    /// Unique identifier for the payout
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the funds are drawn from
    pub group_id: i64,
    /// Member receiving the payout
    pub user_id: i64,
    /// Net amount in minor units (gross minus commission)
    pub amount_minor: i64,
    /// Commission withheld, in minor units
    pub commission_minor: i64,
    /// Payment channel: `"mobile_money"`, `"bitcoin"` or `"usdt"`
    pub payment_method: String,
    /// Caller-supplied reference for matching against gateway records
    pub payment_reference: Option<String>,
    /// Current state-machine state
    pub status: PayoutStatus,
    /// Admin who approved the payout; None until approved
    pub approved_by: Option<i64>,
    /// When the payout was approved
    pub approved_at: Option<DateTimeUtc>,
    /// Audit reason recorded when the payout failed
    pub failure_reason: Option<String>,
    /// When the payout was recorded locally
    pub created_at: DateTimeUtc,
    /// Whether the remote gateway has confirmed this record
    pub synced: bool,
    /// When the gateway confirmation happened
    pub sync_timestamp: Option<DateTimeUtc>,
}

/// Lifecycle state of a payout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PayoutStatus {
    /// Created, awaiting admin approval
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved by an admin, awaiting completion
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Funds disbursed; terminal
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected or gateway failure; terminal
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PayoutStatus {
    /// Whether no further transition is possible out of this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Defines relationships between Payout and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payout belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// Each payout is addressed to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// The admin that approved this payout, if any
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ApprovedBy",
        to = "super::user::Column::Id"
    )]
    Approver,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
