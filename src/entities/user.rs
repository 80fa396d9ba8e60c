//! User entity - Represents registered members and administrators.
//!
//! Each user has a unique `username`, an Argon2id `password_hash`, a role,
//! optional profile fields, and authentication bookkeeping (`last_login`,
//! `login_attempts`). Users are soft-deleted via `is_active`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login name, unique across all users (active or not)
    #[sea_orm(unique)]
    pub username: String,
    /// Argon2id hash in PHC string format; the raw password is never stored
    pub password_hash: String,
    /// Role governing authorization: `admin` or `user`
    pub role: UserRole,
    /// Display name
    pub full_name: Option<String>,
    /// Mobile money number; validated by the payment gateway, not the core
    pub phone_number: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// When the user registered
    pub created_at: DateTimeUtc,
    /// Last successful authentication, None if the user never logged in
    pub last_login: Option<DateTimeUtc>,
    /// Soft delete flag - inactive users cannot authenticate
    pub is_active: bool,
    /// Consecutive failed logins; reset to 0 on success
    pub login_attempts: i32,
}

/// Role of a user within the application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum UserRole {
    /// Can approve payouts, manage groups and users
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Regular group member
    #[sea_orm(string_value = "user")]
    User,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many group memberships
    #[sea_orm(has_many = "super::group_membership::Entity")]
    Memberships,
    /// One user has many contributions
    #[sea_orm(has_many = "super::contribution::Entity")]
    Contributions,
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

impl ActiveModelBehavior for ActiveModel {}
