//! Full-workflow integration test over the public API: registration through
//! contribution, payout approval, reconciliation and commission settlement.

use ajo_ledger::{
    config::AppConfig,
    core::{
        commission, contribution, group, payout,
        report,
        user::{self, Session, UserProfile},
    },
    db,
    entities::user::UserRole,
    errors::Result,
    gateway::OfflineGateway,
    sync::Reconciler,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn money(minor: i64) -> Decimal {
    ajo_ledger::commission::from_minor_units(minor)
}

#[tokio::test]
async fn test_family_group_savings_round() -> Result<()> {
    let db = db::init_db("sqlite::memory:").await?;
    let config = AppConfig::default();

    // Cast: Bob administers the Family group, Alice saves in it.
    let bob = user::create_user(
        &db,
        &config,
        "bob",
        "hunter2-but-longer",
        UserRole::Admin,
        UserProfile::default(),
    )
    .await?;
    let alice = user::create_user(
        &db,
        &config,
        "alice",
        "alice-password",
        UserRole::User,
        UserProfile {
            full_name: Some("Alice N.".to_string()),
            phone_number: Some("+256700000001".to_string()),
            email: None,
        },
    )
    .await?;

    let family = group::create_group(&db, "Family", None, Some(bob.id)).await?;
    group::add_user_to_group(&db, alice.id, family.id).await?;

    // Alice contributes 50,000 via mobile money; 1% commission withheld.
    let recorded = contribution::record_contribution(
        &db,
        &config,
        alice.id,
        family.id,
        dec!(50000),
        "mobile_money",
        None,
    )
    .await?;
    assert_eq!(money(recorded.amount_minor), dec!(49500));
    assert_eq!(money(recorded.commission_minor), dec!(500));
    assert_eq!(recorded.status, "pending");
    assert!(!recorded.synced);

    // It is Alice's turn: a 20,000 payout is requested and approved by Bob.
    let requested = payout::record_payout(
        &db,
        &config,
        family.id,
        alice.id,
        dec!(20000),
        "mobile_money",
        None,
    )
    .await?;
    assert_eq!(money(requested.amount_minor), dec!(19800));
    assert_eq!(money(requested.commission_minor), dec!(200));

    let bob_session = Session::from(&bob);
    let approved = payout::approve_payout(&db, &bob_session, requested.id).await?;
    assert_eq!(approved.approved_by, Some(bob.id));

    let completed = payout::complete_payout(&db, requested.id).await?;
    assert!(completed.synced);

    // Offline cycles leave the contribution queued and never error.
    let reconciler = Reconciler::new(&config);
    for _ in 0..3 {
        let outcome = reconciler
            .drain(&db, &OfflineGateway)
            .await?
            .expect("no concurrent drain in this test");
        assert_eq!(outcome.attempted, 0);
    }
    let status = reconciler.status(&db).await?;
    assert_eq!(status.pending, 1);

    // Dashboard totals line up with everything above.
    let summary = report::savings_summary(&db).await?;
    assert_eq!(summary.total_contributions, dec!(49500));
    assert_eq!(summary.total_payouts, dec!(19800));
    assert_eq!(summary.total_commissions, dec!(700));
    assert_eq!(summary.active_users, 2);
    assert_eq!(summary.active_groups, 1);
    assert_eq!(summary.pending_payouts, 0);

    // Operator settles the accrued commission.
    assert_eq!(commission::untransferred_total(&db).await?, dec!(700));
    assert_eq!(commission::mark_commissions_transferred(&db).await?, 2);
    assert_eq!(commission::untransferred_total(&db).await?, dec!(0));

    // Alice can come back later and see her history.
    let alice_again = user::authenticate(&db, "alice", "alice-password").await?;
    let history = contribution::contributions_for_user(&db, alice_again.id).await?;
    assert_eq!(history.len(), 1);
    Ok(())
}
