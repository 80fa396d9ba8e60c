//! Commission entity - The platform's cut of a contribution or payout.
//!
//! One row exists per contribution/payout, created in the same database
//! transaction as its source record. The sum of rows with
//! `transferred = false` is the amount owed to the platform operator;
//! `transferred` only ever moves false -> true.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Commission database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "commissions")]
pub struct Model {
    /// Unique identifier for the commission row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Which ledger table the source record lives in
    pub source: CommissionSource,
    /// Id of the source contribution or payout
    pub source_id: i64,
    /// Commission amount in minor units
    pub amount_minor: i64,
    /// Whether this commission has been transferred to the operator
    pub transferred: bool,
    /// When the transfer happened
    pub transfer_timestamp: Option<DateTimeUtc>,
    /// When the commission was recorded
    pub created_at: DateTimeUtc,
}

/// The ledger table a commission row was derived from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum CommissionSource {
    /// Derived from a contribution
    #[sea_orm(string_value = "contribution")]
    Contribution,
    /// Derived from a payout
    #[sea_orm(string_value = "payout")]
    Payout,
}

impl std::fmt::Display for CommissionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contribution => write!(f, "contribution"),
            Self::Payout => write!(f, "payout"),
        }
    }
}

/// Commission rows reference their source by `(source, source_id)` rather
/// than a foreign key, so no entity relationships are defined.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
