//! Group entity - Represents a rotating savings group.
//!
//! A group owns memberships and, transitively, contributions and payouts for
//! reporting purposes, but deleting a group never cascades into financial
//! history: deletion is soft via `is_active`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Savings group database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    /// Unique identifier for the group
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group name, unique across all groups
    #[sea_orm(unique)]
    pub name: String,
    /// Free-text description
    pub description: Option<String>,
    /// User who administers this group, if any
    pub admin_user_id: Option<i64>,
    /// When the group was created
    pub created_at: DateTimeUtc,
    /// Soft delete flag - financial history is preserved when false
    pub is_active: bool,
}

/// Defines relationships between Group and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One group has many memberships
    #[sea_orm(has_many = "super::group_membership::Entity")]
    Memberships,
    /// One group has many contributions
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
    /// One group has many payouts
    #[sea_orm(has_many = "super::payout::Entity")]
    Payouts,
}

impl Related<super::group_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributions.def()
    }
}

impl Related<super::payout::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payouts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
