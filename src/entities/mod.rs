//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.
//!
//! Monetary columns are stored as `i64` minor units (two implied decimal
//! places); use [`crate::commission::from_minor_units`] to read them back as
//! decimals. Floating point is never used for money.

pub mod commission;
pub mod contribution;
pub mod group;
pub mod group_membership;
pub mod payout;
pub mod setting;
pub mod user;

// Re-export specific types to avoid conflicts
pub use commission::{Column as CommissionColumn, Entity as Commission, Model as CommissionModel};
pub use contribution::{
    Column as ContributionColumn, Entity as Contribution, Model as ContributionModel,
};
pub use group::{Column as GroupColumn, Entity as Group, Model as GroupModel};
pub use group_membership::{
    Column as GroupMembershipColumn, Entity as GroupMembership, Model as GroupMembershipModel,
};
pub use payout::{Column as PayoutColumn, Entity as Payout, Model as PayoutModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
