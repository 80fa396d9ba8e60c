//! Payout recording and the approval state machine.
//!
//! Transitions are enforced with guarded single-row updates: every state
//! change is an `UPDATE .. WHERE id = ? AND status = ?`, and zero rows
//! affected means the payout was not in the expected state. Two concurrent
//! approvals of the same payout therefore cannot both succeed.

use crate::{
    commission::{self, split_gross},
    config::AppConfig,
    core::user::Session,
    entities::{
        Payout, User, commission::CommissionSource, payout, payout::PayoutStatus, user,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Records a payout from a group's pool to a member, in `pending` state.
///
/// Like contributions, the payout and its commission row are inserted in one
/// transaction. The payout waits for admin approval before it can complete.
pub async fn record_payout(
    db: &DatabaseConnection,
    config: &AppConfig,
    group_id: i64,
    user_id: i64,
    gross: Decimal,
    payment_method: &str,
    payment_reference: Option<String>,
) -> Result<payout::Model> {
    config.validate_gross(gross)?;

    crate::core::group::get_active_group(db, group_id).await?;
    User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

    let split = split_gross(gross, config.commission_rate);
    let amount_minor = commission::to_minor_units(split.net)?;
    let commission_minor = commission::to_minor_units(split.commission)?;
    let now = chrono::Utc::now();

    let txn = db.begin().await?;

    let payout = payout::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id),
        amount_minor: Set(amount_minor),
        commission_minor: Set(commission_minor),
        payment_method: Set(payment_method.to_string()),
        payment_reference: Set(payment_reference),
        status: Set(PayoutStatus::Pending),
        approved_by: Set(None),
        approved_at: Set(None),
        failure_reason: Set(None),
        created_at: Set(now),
        synced: Set(false),
        sync_timestamp: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    crate::core::commission::insert_commission_row(
        &txn,
        CommissionSource::Payout,
        payout.id,
        commission_minor,
        now,
    )
    .await?;

    txn.commit().await?;

    info!(
        "Recorded payout {} for user {user_id} from group {group_id}: net {}",
        payout.id, split.net
    );
    Ok(payout)
}

async fn get_payout(db: &DatabaseConnection, payout_id: i64) -> Result<payout::Model> {
    Payout::find_by_id(payout_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "payout",
            id: payout_id.to_string(),
        })
}

/// Approves a pending payout. Admin-only.
///
/// # Errors
/// `Forbidden` for a non-admin session, `NotFound` for an unknown payout,
/// `InvalidTransition` if the payout is not `pending`.
pub async fn approve_payout(
    db: &DatabaseConnection,
    session: &Session,
    payout_id: i64,
) -> Result<payout::Model> {
    session.require_admin()?;
    let payout = get_payout(db, payout_id).await?;

    let result = Payout::update_many()
        .col_expr(payout::Column::Status, Expr::value(PayoutStatus::Approved))
        .col_expr(payout::Column::ApprovedBy, Expr::value(Some(session.user_id)))
        .col_expr(
            payout::Column::ApprovedAt,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(payout::Column::Id.eq(payout_id))
        .filter(payout::Column::Status.eq(PayoutStatus::Pending))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InvalidTransition {
            from: payout.status,
            action: "approve",
        });
    }

    info!("Payout {payout_id} approved by '{}'", session.username);
    get_payout(db, payout_id).await
}

/// Completes an approved payout, meaning the funds have been disbursed.
/// Completion also marks the payout synced.
pub async fn complete_payout(db: &DatabaseConnection, payout_id: i64) -> Result<payout::Model> {
    let payout = get_payout(db, payout_id).await?;

    let result = Payout::update_many()
        .col_expr(payout::Column::Status, Expr::value(PayoutStatus::Completed))
        .col_expr(payout::Column::Synced, Expr::value(true))
        .col_expr(
            payout::Column::SyncTimestamp,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(payout::Column::Id.eq(payout_id))
        .filter(payout::Column::Status.eq(PayoutStatus::Approved))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InvalidTransition {
            from: payout.status,
            action: "complete",
        });
    }

    info!("Payout {payout_id} completed");
    get_payout(db, payout_id).await
}

/// Fails a payout from `pending` or `approved`, recording the reason for
/// audit. Terminal states are untouchable.
pub async fn fail_payout(
    db: &DatabaseConnection,
    payout_id: i64,
    reason: &str,
) -> Result<payout::Model> {
    let payout = get_payout(db, payout_id).await?;

    let result = Payout::update_many()
        .col_expr(payout::Column::Status, Expr::value(PayoutStatus::Failed))
        .col_expr(
            payout::Column::FailureReason,
            Expr::value(Some(reason.to_string())),
        )
        .filter(payout::Column::Id.eq(payout_id))
        .filter(
            payout::Column::Status
                .is_in([PayoutStatus::Pending, PayoutStatus::Approved]),
        )
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::InvalidTransition {
            from: payout.status,
            action: "fail",
        });
    }

    info!("Payout {payout_id} failed: {reason}");
    get_payout(db, payout_id).await
}

/// Payouts awaiting approval, oldest first.
pub async fn pending_payouts(db: &DatabaseConnection) -> Result<Vec<payout::Model>> {
    Payout::find()
        .filter(payout::Column::Status.eq(PayoutStatus::Pending))
        .order_by_asc(payout::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All payouts from a group, newest first.
pub async fn payouts_for_group(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<payout::Model>> {
    Payout::find()
        .filter(payout::Column::GroupId.eq(group_id))
        .order_by_desc(payout::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Approved-but-unsynced payouts, oldest first - the payout half of the
/// reconciliation queue. Pending payouts are excluded: nothing should reach
/// the gateway before an admin has signed off.
pub async fn unsynced_payouts(db: &DatabaseConnection) -> Result<Vec<payout::Model>> {
    Payout::find()
        .filter(payout::Column::Synced.eq(false))
        .filter(payout::Column::Status.eq(PayoutStatus::Approved))
        .order_by_asc(payout::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks one approved payout as confirmed by the gateway, without changing
/// its status. Guarded on `synced = false`; returns whether this call
/// performed the flip.
pub async fn mark_payout_synced(db: &DatabaseConnection, payout_id: i64) -> Result<bool> {
    let result = Payout::update_many()
        .col_expr(payout::Column::Synced, Expr::value(true))
        .col_expr(
            payout::Column::SyncTimestamp,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(payout::Column::Id.eq(payout_id))
        .filter(payout::Column::Synced.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}
