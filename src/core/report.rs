//! Aggregate reporting for the dashboard surface.

use crate::{
    commission::from_minor_units,
    entities::{
        Commission, Contribution, Group, Payout, User, commission, contribution, group, payout,
        payout::PayoutStatus, user,
    },
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, QuerySelect, Select, prelude::*};

/// A point-in-time snapshot of the whole ledger.
///
/// Built from several independent aggregate queries, so the numbers are not
/// guaranteed to be transactionally consistent with each other. Good enough
/// for a dashboard, not for settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingsSummary {
    /// Sum of all contribution net amounts
    pub total_contributions: Decimal,
    /// Sum of net amounts of completed payouts only
    pub total_payouts: Decimal,
    /// Sum of all commission rows, transferred or not
    pub total_commissions: Decimal,
    pub active_users: u64,
    pub active_groups: u64,
    pub pending_payouts: u64,
}

async fn sum_column<E, C>(db: &DatabaseConnection, query: Select<E>, column: C) -> Result<Decimal>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let total: Option<Option<i64>> = query
        .select_only()
        .column_as(column.sum(), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(from_minor_units(total.flatten().unwrap_or(0)))
}

/// Computes the ledger-wide totals shown on the dashboard.
pub async fn savings_summary(db: &DatabaseConnection) -> Result<SavingsSummary> {
    let total_contributions =
        sum_column(db, Contribution::find(), contribution::Column::AmountMinor).await?;
    let total_payouts = sum_column(
        db,
        Payout::find().filter(payout::Column::Status.eq(PayoutStatus::Completed)),
        payout::Column::AmountMinor,
    )
    .await?;
    let total_commissions =
        sum_column(db, Commission::find(), commission::Column::AmountMinor).await?;

    let active_users = User::find()
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let active_groups = Group::find()
        .filter(group::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let pending_payouts = Payout::find()
        .filter(payout::Column::Status.eq(PayoutStatus::Pending))
        .count(db)
        .await?;

    Ok(SavingsSummary {
        total_contributions,
        total_payouts,
        total_commissions,
        active_users,
        active_groups,
        pending_payouts,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::payout::{approve_payout, complete_payout, record_payout};
    use crate::core::user::Session;
    use crate::core::{contribution::record_contribution, group::create_group};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_empty_ledger_summary() -> Result<()> {
        let (db, _config) = setup_test_env().await?;
        let summary = savings_summary(&db).await?;
        assert_eq!(summary.total_contributions, dec!(0));
        assert_eq!(summary.total_payouts, dec!(0));
        assert_eq!(summary.total_commissions, dec!(0));
        assert_eq!(summary.active_users, 0);
        assert_eq!(summary.active_groups, 0);
        assert_eq!(summary.pending_payouts, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_counts_only_completed_payouts() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;
        let admin = create_test_admin(&db, &config, "root").await?;
        let session = Session::from(&admin);
        create_group(&db, "Second", None, None).await?;

        record_contribution(&db, &config, user.id, group.id, dec!(50000), "bitcoin", None).await?;
        record_contribution(&db, &config, user.id, group.id, dec!(10000), "usdt", None).await?;

        // One completed, one still pending
        let done =
            record_payout(&db, &config, group.id, user.id, dec!(20000), "bitcoin", None).await?;
        approve_payout(&db, &session, done.id).await?;
        complete_payout(&db, done.id).await?;
        record_payout(&db, &config, group.id, user.id, dec!(30000), "bitcoin", None).await?;

        let summary = savings_summary(&db).await?;
        // Nets: 49500 + 9900 contributions, 19800 completed payout
        assert_eq!(summary.total_contributions, dec!(59400));
        assert_eq!(summary.total_payouts, dec!(19800));
        // 1% of 50000 + 10000 + 20000 + 30000
        assert_eq!(summary.total_commissions, dec!(1100));
        assert_eq!(summary.active_users, 2);
        assert_eq!(summary.active_groups, 2);
        assert_eq!(summary.pending_payouts, 1);
        Ok(())
    }
}
