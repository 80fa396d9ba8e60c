//! Commission ledger queries and operator transfers.

use crate::{
    commission::from_minor_units,
    entities::{Commission, commission, commission::CommissionSource},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use tracing::info;

/// Inserts the commission row paired with a contribution or payout. Always
/// called inside the source record's transaction.
pub(crate) async fn insert_commission_row<C: ConnectionTrait>(
    conn: &C,
    source: CommissionSource,
    source_id: i64,
    amount_minor: i64,
    now: DateTimeUtc,
) -> Result<commission::Model> {
    commission::ActiveModel {
        source: Set(source),
        source_id: Set(source_id),
        amount_minor: Set(amount_minor),
        transferred: Set(false),
        transfer_timestamp: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}

/// Total commission not yet transferred to the platform operator.
pub async fn untransferred_total(db: &DatabaseConnection) -> Result<Decimal> {
    let total: Option<Option<i64>> = Commission::find()
        .select_only()
        .column_as(commission::Column::AmountMinor.sum(), "total")
        .filter(commission::Column::Transferred.eq(false))
        .into_tuple()
        .one(db)
        .await?;
    Ok(from_minor_units(total.flatten().unwrap_or(0)))
}

/// Marks every untransferred commission as transferred, stamping the
/// transfer time. Returns how many rows were settled. Already-transferred
/// rows are untouched, so repeating the call is harmless.
pub async fn mark_commissions_transferred(db: &DatabaseConnection) -> Result<u64> {
    let result = Commission::update_many()
        .col_expr(commission::Column::Transferred, Expr::value(true))
        .col_expr(
            commission::Column::TransferTimestamp,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(commission::Column::Transferred.eq(false))
        .exec(db)
        .await?;
    if result.rows_affected > 0 {
        info!("Settled {} commission rows", result.rows_affected);
    }
    Ok(result.rows_affected)
}

/// Full commission history, newest first.
pub async fn commission_history(db: &DatabaseConnection) -> Result<Vec<commission::Model>> {
    Commission::find()
        .order_by_desc(commission::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}
