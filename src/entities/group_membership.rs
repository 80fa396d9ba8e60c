//! Group membership entity - The many-to-many link between users and groups.
//!
//! Unique on `(group_id, user_id)` (enforced by an index created in
//! [`crate::db::create_tables`]). Removing a member sets `is_active = false`
//! rather than deleting the row, preserving history; re-adding reactivates
//! the existing row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Group membership database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_members")]
pub struct Model {
    /// Unique identifier for the membership
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group this membership belongs to
    pub group_id: i64,
    /// Member user
    pub user_id: i64,
    /// When the user first joined the group
    pub joined_at: DateTimeUtc,
    /// Soft delete flag - false means the member was removed
    pub is_active: bool,
}

/// Defines relationships between GroupMembership and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each membership belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// Each membership belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
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
