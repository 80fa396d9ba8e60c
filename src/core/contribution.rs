//! Contribution recording and queries.
//!
//! `record_contribution` is the commission-bearing write path: the
//! contribution row and its paired commission row are inserted in one
//! database transaction, so neither can ever exist without the other.

use crate::{
    commission::{self, split_gross},
    config::AppConfig,
    entities::{
        Contribution, User, commission::CommissionSource, contribution, group_membership, user,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Records a member's contribution to a group.
///
/// The gross amount is split into net and commission via the Commission
/// Engine; the contribution stores the net amount and a commission row is
/// created atomically with it. The new record starts `synced = false` and is
/// picked up by the next reconciliation drain.
///
/// # Errors
/// `Validation` for an out-of-range gross amount, `NotFound` if the user or
/// group is absent or inactive.
pub async fn record_contribution(
    db: &DatabaseConnection,
    config: &AppConfig,
    user_id: i64,
    group_id: i64,
    gross: Decimal,
    payment_method: &str,
    payment_reference: Option<String>,
) -> Result<contribution::Model> {
    config.validate_gross(gross)?;

    User::find_by_id(user_id)
        .filter(user::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;
    crate::core::group::get_active_group(db, group_id).await?;

    let split = split_gross(gross, config.commission_rate);
    let amount_minor = commission::to_minor_units(split.net)?;
    let commission_minor = commission::to_minor_units(split.commission)?;
    let now = chrono::Utc::now();

    // Contribution and commission rows must appear together or not at all.
    let txn = db.begin().await?;

    let contribution = contribution::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group_id),
        amount_minor: Set(amount_minor),
        commission_minor: Set(commission_minor),
        payment_method: Set(payment_method.to_string()),
        payment_reference: Set(payment_reference),
        status: Set("pending".to_string()),
        created_at: Set(now),
        synced: Set(false),
        sync_timestamp: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    crate::core::commission::insert_commission_row(
        &txn,
        CommissionSource::Contribution,
        contribution.id,
        commission_minor,
        now,
    )
    .await?;

    txn.commit().await?;

    info!(
        "Recorded contribution {} for user {user_id} in group {group_id}: net {} commission {}",
        contribution.id, split.net, split.commission
    );
    Ok(contribution)
}

/// All contributions by a user, newest first.
pub async fn contributions_for_user(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<contribution::Model>> {
    Contribution::find()
        .filter(contribution::Column::UserId.eq(user_id))
        .order_by_desc(contribution::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All contributions into a group, newest first.
pub async fn contributions_for_group(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<contribution::Model>> {
    Contribution::find()
        .filter(contribution::Column::GroupId.eq(group_id))
        .order_by_desc(contribution::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Contributions not yet confirmed by the gateway, oldest first. This query
/// IS the reconciliation queue for contributions.
pub async fn unsynced_contributions(db: &DatabaseConnection) -> Result<Vec<contribution::Model>> {
    Contribution::find()
        .filter(contribution::Column::Synced.eq(false))
        .order_by_asc(contribution::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks one contribution as confirmed by the gateway. Guarded on
/// `synced = false` so a concurrent drain cannot double-apply; returns
/// whether this call performed the flip.
pub async fn mark_contribution_synced(db: &DatabaseConnection, contribution_id: i64) -> Result<bool> {
    use sea_orm::sea_query::Expr;
    let result = Contribution::update_many()
        .col_expr(contribution::Column::Synced, Expr::value(true))
        .col_expr(
            contribution::Column::SyncTimestamp,
            Expr::value(Some(chrono::Utc::now())),
        )
        .filter(contribution::Column::Id.eq(contribution_id))
        .filter(contribution::Column::Synced.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Active-membership check used by callers that want to restrict
/// contributions to group members. The original application allowed
/// contributions from any user; this is a separate query so callers can opt
/// in to the stricter rule.
pub async fn is_group_member(db: &DatabaseConnection, user_id: i64, group_id: i64) -> Result<bool> {
    use sea_orm::PaginatorTrait;
    let count = crate::entities::GroupMembership::find()
        .filter(group_membership::Column::GroupId.eq(group_id))
        .filter(group_membership::Column::UserId.eq(user_id))
        .filter(group_membership::Column::IsActive.eq(true))
        .count(db)
        .await?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::commission::from_minor_units;
    use crate::entities::{Commission, commission as commission_entity};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::PaginatorTrait;

    #[tokio::test]
    async fn test_record_contribution_splits_amounts() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;

        let contribution = record_contribution(
            &db,
            &config,
            user.id,
            group.id,
            dec!(50000),
            "mobile_money",
            Some("REF-1".to_string()),
        )
        .await?;

        assert_eq!(from_minor_units(contribution.amount_minor), dec!(49500));
        assert_eq!(from_minor_units(contribution.commission_minor), dec!(500));
        assert_eq!(contribution.status, "pending");
        assert!(!contribution.synced);
        assert!(contribution.sync_timestamp.is_none());

        // Paired commission row exists
        let commissions = Commission::find()
            .filter(commission_entity::Column::SourceId.eq(contribution.id))
            .filter(
                commission_entity::Column::Source
                    .eq(crate::entities::commission::CommissionSource::Contribution),
            )
            .all(&db)
            .await?;
        assert_eq!(commissions.len(), 1);
        assert_eq!(from_minor_units(commissions[0].amount_minor), dec!(500));
        assert!(!commissions[0].transferred);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_bad_amounts_before_mutation() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;

        for gross in [dec!(0), dec!(-100), dec!(1.005), dec!(10)] {
            let result = record_contribution(
                &db,
                &config,
                user.id,
                group.id,
                gross,
                "mobile_money",
                None,
            )
            .await;
            assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        }

        assert_eq!(Contribution::find().count(&db).await?, 0);
        assert_eq!(Commission::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user_or_group() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;

        let result =
            record_contribution(&db, &config, 999, group.id, dec!(5000), "bitcoin", None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound { entity: "user", .. }
        ));

        let result =
            record_contribution(&db, &config, user.id, 999, dec!(5000), "bitcoin", None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "group",
                ..
            }
        ));

        assert_eq!(Contribution::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupted_insert_leaves_no_partial_rows() -> Result<()> {
        // Simulates a failure between the contribution insert and the
        // commission insert: the enclosing transaction rolls back and
        // neither row survives.
        let (db, config, user, group) = setup_with_group().await?;
        let split = split_gross(dec!(50000), config.commission_rate);

        let txn = db.begin().await?;
        contribution::ActiveModel {
            user_id: Set(user.id),
            group_id: Set(group.id),
            amount_minor: Set(commission::to_minor_units(split.net)?),
            commission_minor: Set(commission::to_minor_units(split.commission)?),
            payment_method: Set("mobile_money".to_string()),
            payment_reference: Set(None),
            status: Set("pending".to_string()),
            created_at: Set(chrono::Utc::now()),
            synced: Set(false),
            sync_timestamp: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.rollback().await?;

        assert_eq!(Contribution::find().count(&db).await?, 0);
        assert_eq!(Commission::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_queries_scope_by_user_and_group() -> Result<()> {
        let (db, config, alice, family) = setup_with_group().await?;
        let bob = create_test_user(&db, &config, "bob").await?;
        let other = crate::core::group::create_group(&db, "Other", None, None).await?;

        record_contribution(&db, &config, alice.id, family.id, dec!(5000), "bitcoin", None).await?;
        record_contribution(&db, &config, bob.id, family.id, dec!(6000), "usdt", None).await?;
        record_contribution(&db, &config, alice.id, other.id, dec!(7000), "bitcoin", None).await?;

        assert_eq!(contributions_for_user(&db, alice.id).await?.len(), 2);
        assert_eq!(contributions_for_user(&db, bob.id).await?.len(), 1);
        assert_eq!(contributions_for_group(&db, family.id).await?.len(), 2);
        assert_eq!(contributions_for_group(&db, other.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_synced_is_guarded() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;
        let contribution = record_contribution(
            &db,
            &config,
            user.id,
            group.id,
            dec!(5000),
            "mobile_money",
            None,
        )
        .await?;

        assert!(mark_contribution_synced(&db, contribution.id).await?);
        // Second flip is a no-op
        assert!(!mark_contribution_synced(&db, contribution.id).await?);

        let reloaded = Contribution::find_by_id(contribution.id)
            .one(&db)
            .await?
            .unwrap();
        assert!(reloaded.synced);
        assert!(reloaded.sync_timestamp.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_is_group_member() -> Result<()> {
        let (db, config, user, group) = setup_with_group().await?;
        let outsider = create_test_user(&db, &config, "mallory").await?;

        assert!(is_group_member(&db, user.id, group.id).await?);
        assert!(!is_group_member(&db, outsider.id, group.id).await?);
        Ok(())
    }
}
