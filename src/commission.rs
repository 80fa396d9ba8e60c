//! Commission engine - pure commission math shared by contributions and
//! payouts.
//!
//! All call sites split a gross amount through [`split_gross`] so the
//! rounding policy (half-up to two decimal places) is identical everywhere
//! and `net + commission` always reconstructs the gross amount to the cent.
//! Storage uses `i64` minor units; [`to_minor_units`] / [`from_minor_units`]
//! convert at that boundary.

use crate::errors::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Result of splitting a gross amount into net and commission parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionSplit {
    /// Amount actually credited/disbursed (gross minus commission)
    pub net: Decimal,
    /// The platform's cut
    pub commission: Decimal,
}

/// Splits a gross amount into `(net, commission)` for the given rate.
///
/// `commission = round_half_up(gross * rate, 2)` and `net = gross -
/// commission`, so the two parts always sum back to the gross amount
/// exactly. Deterministic for identical inputs.
#[must_use]
pub fn split_gross(gross: Decimal, rate: Decimal) -> CommissionSplit {
    let commission =
        (gross * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    CommissionSplit {
        net: gross - commission,
        commission,
    }
}

/// Validates that an amount is positive and carries at most two decimal
/// places. Called before any ledger mutation.
pub fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation {
            message: format!("amount must be positive, got {amount}"),
        });
    }
    if amount != amount.round_dp(2) {
        return Err(Error::Validation {
            message: format!("amount {amount} has more than 2 decimal places"),
        });
    }
    Ok(())
}

/// Converts a decimal amount to stored minor units (cents).
///
/// Fails with a validation error if the amount has more than two decimal
/// places or does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    let scaled = amount * Decimal::ONE_HUNDRED;
    if scaled != scaled.trunc() {
        return Err(Error::Validation {
            message: format!("amount {amount} has more than 2 decimal places"),
        });
    }
    scaled.to_i64().ok_or_else(|| Error::Validation {
        message: format!("amount {amount} is out of range"),
    })
}

/// Converts stored minor units back to a decimal amount.
#[must_use]
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}
