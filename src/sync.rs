//! Offline/online reconciliation.
//!
//! The reconciliation queue has no table of its own: it is the set of rows
//! with `synced = 0` in `contributions` plus approved-but-unsynced rows in
//! `payouts`. A drain walks that queue once, asking the gateway to confirm
//! each record; whatever fails simply stays in the queue for the next cycle.
//!
//! Mutual exclusion between drains is a process-local `AtomicBool` - this
//! crate assumes a single process owns the database file.

use crate::{
    commission::from_minor_units,
    config::AppConfig,
    core::{contribution, payout, setting},
    entities,
    errors::Result,
    gateway::{PaymentGateway, PendingRecord, RecordKind},
};
use sea_orm::DatabaseConnection;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tally of one completed drain cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainOutcome {
    /// Records handed to the gateway this cycle
    pub attempted: usize,
    /// Confirmed and marked synced
    pub succeeded: usize,
    /// Gateway error or timeout; still queued
    pub failed: usize,
}

/// Snapshot for the "N pending, last attempt ..." display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    /// Unsynced records currently in the queue
    pub pending: u64,
    /// Outcome of the most recent completed drain, if any
    pub last_outcome: Option<DrainOutcome>,
}

/// Drives the reconciliation queue against a [`PaymentGateway`].
pub struct Reconciler {
    in_progress: AtomicBool,
    shutdown: AtomicBool,
    gateway_timeout: Duration,
    sync_interval: Duration,
    last_outcome: Mutex<Option<DrainOutcome>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            gateway_timeout: config.gateway_timeout(),
            sync_interval: config.sync_interval(),
            last_outcome: Mutex::new(None),
        }
    }

    /// Requests that the current and any future drain stop between records.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Runs one drain cycle.
    ///
    /// Returns `None` without touching the queue if another drain is already
    /// in progress. An offline gateway yields a completed cycle with zero
    /// attempts - being offline is the normal case, not an error.
    pub async fn drain(
        &self,
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
    ) -> Result<Option<DrainOutcome>> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            debug!("Drain already in progress, skipping");
            return Ok(None);
        }
        let result = self.drain_inner(db, gateway).await;
        self.in_progress.store(false, Ordering::SeqCst);

        let outcome = result?;
        *self
            .last_outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(outcome);
        Ok(Some(outcome))
    }

    async fn drain_inner(
        &self,
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
    ) -> Result<DrainOutcome> {
        if !gateway.is_online().await {
            debug!("Gateway offline, deferring reconciliation");
            return Ok(DrainOutcome::default());
        }

        let mut queue: Vec<PendingRecord> = Vec::new();
        for c in contribution::unsynced_contributions(db).await? {
            queue.push(PendingRecord {
                kind: RecordKind::Contribution,
                id: c.id,
                amount: from_minor_units(c.amount_minor),
                method: c.payment_method,
                reference: c.payment_reference,
            });
        }
        for p in payout::unsynced_payouts(db).await? {
            queue.push(PendingRecord {
                kind: RecordKind::Payout,
                id: p.id,
                amount: from_minor_units(p.amount_minor),
                method: p.payment_method,
                reference: p.payment_reference,
            });
        }

        let mut outcome = DrainOutcome::default();
        for record in &queue {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested, stopping drain early");
                break;
            }
            outcome.attempted += 1;

            match tokio::time::timeout(self.gateway_timeout, gateway.confirm(record)).await {
                Ok(Ok(ack)) => {
                    let flipped = match record.kind {
                        RecordKind::Contribution => {
                            contribution::mark_contribution_synced(db, record.id).await?
                        }
                        RecordKind::Payout => payout::mark_payout_synced(db, record.id).await?,
                    };
                    if flipped {
                        outcome.succeeded += 1;
                        debug!(
                            "Synced {} {} (gateway ref {})",
                            record.kind, record.id, ack.reference
                        );
                    } else {
                        // Another writer flipped it first; this drain did not
                        // sync it, so it does not get credit.
                        outcome.failed += 1;
                        warn!("{} {} was already synced", record.kind, record.id);
                    }
                }
                Ok(Err(e)) => {
                    outcome.failed += 1;
                    warn!("Gateway rejected {} {}: {e}", record.kind, record.id);
                }
                Err(_) => {
                    outcome.failed += 1;
                    warn!(
                        "Gateway timed out after {:?} confirming {} {}",
                        self.gateway_timeout, record.kind, record.id
                    );
                }
            }
        }

        self.cache_gateway_snapshots(db, gateway).await;

        info!(
            "Drain complete: {} attempted, {} succeeded, {} failed",
            outcome.attempted, outcome.succeeded, outcome.failed
        );
        Ok(outcome)
    }

    /// Caches exchange rates and the gateway balance into `settings` so the
    /// app can show last-known values while offline. Failures here are
    /// logged and swallowed; stale cache beats a failed drain.
    async fn cache_gateway_snapshots(&self, db: &DatabaseConnection, gateway: &dyn PaymentGateway) {
        match gateway.exchange_rates().await {
            Ok(rates) => {
                for (pair, rate) in rates {
                    let key = format!("exchange_rate_{pair}");
                    if let Err(e) = setting::set_setting(db, &key, &rate.to_string()).await {
                        warn!("Failed to cache {key}: {e}");
                    }
                }
            }
            Err(e) => debug!("No exchange rates this cycle: {e}"),
        }
        match gateway.balance().await {
            Ok(balance) => {
                if let Err(e) = setting::set_setting(db, "gateway_balance", &balance.to_string()).await
                {
                    warn!("Failed to cache gateway balance: {e}");
                }
            }
            Err(e) => debug!("No balance snapshot this cycle: {e}"),
        }
        if let Err(e) =
            setting::set_setting(db, "last_sync_at", &chrono::Utc::now().to_rfc3339()).await
        {
            warn!("Failed to stamp last sync time: {e}");
        }
    }

    /// Drains on a fixed interval until [`shutdown`](Self::shutdown) is
    /// called. The first drain happens one full interval after start.
    pub async fn run_periodic(
        &self,
        db: &DatabaseConnection,
        gateway: &dyn PaymentGateway,
    ) -> Result<()> {
        let mut interval = tokio::time::interval(self.sync_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        interval.tick().await; // first tick fires immediately

        loop {
            interval.tick().await;
            if self.shutdown.load(Ordering::SeqCst) {
                info!("Reconciler stopped");
                return Ok(());
            }
            if let Err(e) = self.drain(db, gateway).await {
                warn!("Drain cycle failed: {e}");
            }
        }
    }

    /// Queue depth plus the outcome of the last completed drain.
    pub async fn status(&self, db: &DatabaseConnection) -> Result<SyncStatus> {
        use crate::entities::{contribution as c, payout as p, payout::PayoutStatus};
        use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

        let pending_contributions = entities::Contribution::find()
            .filter(c::Column::Synced.eq(false))
            .count(db)
            .await?;
        let pending_payouts = entities::Payout::find()
            .filter(p::Column::Synced.eq(false))
            .filter(p::Column::Status.eq(PayoutStatus::Approved))
            .count(db)
            .await?;

        let last_outcome = *self
            .last_outcome
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(SyncStatus {
            pending: pending_contributions + pending_payouts,
            last_outcome,
        })
    }
}
