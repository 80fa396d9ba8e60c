//! Payment gateway seam.
//!
//! The core never talks to the remote payment API directly; it goes through
//! the [`PaymentGateway`] trait so the ledger stays fully functional when the
//! gateway is unreachable. Every method is fallible and latency-bearing -
//! callers must never assume synchronous success.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Which ledger table an unsynced record comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Contribution,
    Payout,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contribution => write!(f, "contribution"),
            Self::Payout => write!(f, "payout"),
        }
    }
}

/// Plain-data projection of an unsynced ledger record, handed to the gateway
/// for confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRecord {
    /// Source table
    pub kind: RecordKind,
    /// Local row id
    pub id: i64,
    /// Net amount
    pub amount: Decimal,
    /// Payment channel: `"mobile_money"`, `"bitcoin"` or `"usdt"`
    pub method: String,
    /// Caller-supplied payment reference, if any
    pub reference: Option<String>,
}

/// Acknowledgement returned by the gateway for a confirmed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayAck {
    /// Gateway-side reference for the confirmed record
    pub reference: String,
    /// When the gateway confirmed it
    pub confirmed_at: DateTime<Utc>,
}

/// The remote payment API, seen from the core.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether the gateway is currently reachable. A cheap probe; drains
    /// short-circuit when this returns false.
    async fn is_online(&self) -> bool;

    /// Confirms a locally-recorded contribution or payout with the gateway.
    async fn confirm(&self, record: &PendingRecord) -> Result<GatewayAck>;

    /// Current exchange rates, keyed by pair (e.g. `"BTC_UGX"`).
    async fn exchange_rates(&self) -> Result<HashMap<String, Decimal>>;

    /// Current gateway account balance.
    async fn balance(&self) -> Result<Decimal>;
}

/// Gateway used when no remote API is configured: always offline, every call
/// fails with [`Error::GatewayUnavailable`]. Locally-recorded entries simply
/// stay unsynced until a real gateway is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGateway;

#[async_trait]
impl PaymentGateway for OfflineGateway {
    async fn is_online(&self) -> bool {
        false
    }

    async fn confirm(&self, _record: &PendingRecord) -> Result<GatewayAck> {
        Err(Error::GatewayUnavailable {
            message: "no payment gateway configured".to_string(),
        })
    }

    async fn exchange_rates(&self) -> Result<HashMap<String, Decimal>> {
        Err(Error::GatewayUnavailable {
            message: "no payment gateway configured".to_string(),
        })
    }

    async fn balance(&self) -> Result<Decimal> {
        Err(Error::GatewayUnavailable {
            message: "no payment gateway configured".to_string(),
        })
    }
}
