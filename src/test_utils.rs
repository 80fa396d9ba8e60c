//! Shared fixtures for unit tests: a fresh in-memory database per test and
//! a scriptable payment gateway.

use crate::{
    config::AppConfig,
    core::{group, user},
    db,
    entities::user::UserRole,
    errors::{Error, Result},
    gateway::{GatewayAck, PaymentGateway, PendingRecord, RecordKind},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::DatabaseConnection;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Fresh in-memory database with all tables created, plus default config.
pub async fn setup_test_env() -> Result<(DatabaseConnection, AppConfig)> {
    let db = db::init_db("sqlite::memory:").await?;
    Ok((db, AppConfig::default()))
}

pub async fn create_test_user(
    db: &DatabaseConnection,
    config: &AppConfig,
    username: &str,
) -> Result<crate::entities::user::Model> {
    user::create_user(
        db,
        config,
        username,
        TEST_PASSWORD,
        UserRole::User,
        user::UserProfile {
            full_name: Some(username.to_string()),
            ..Default::default()
        },
    )
    .await
}

pub async fn create_test_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
    username: &str,
) -> Result<crate::entities::user::Model> {
    user::create_user(
        db,
        config,
        username,
        TEST_PASSWORD,
        UserRole::Admin,
        user::UserProfile {
            full_name: Some(username.to_string()),
            ..Default::default()
        },
    )
    .await
}

/// Database plus the most common cast: user "alice" as a member of group
/// "Family".
pub async fn setup_with_group() -> Result<(
    DatabaseConnection,
    AppConfig,
    crate::entities::user::Model,
    crate::entities::group::Model,
)> {
    let (db, config) = setup_test_env().await?;
    let user = create_test_user(&db, &config, "alice").await?;
    let group = group::create_group(&db, "Family", None, None).await?;
    group::add_user_to_group(&db, user.id, group.id).await?;
    Ok((db, config, user, group))
}

/// An always-online gateway that records what it confirms. Individual
/// records can be scripted to fail, and a response delay can be injected to
/// exercise timeouts.
pub struct MockGateway {
    delay: Duration,
    fail: HashSet<(RecordKind, i64)>,
    confirmed: Mutex<Vec<PendingRecord>>,
}

impl MockGateway {
    #[must_use]
    pub fn online() -> Self {
        Self {
            delay: Duration::ZERO,
            fail: HashSet::new(),
            confirmed: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Scripts one record to be rejected by `confirm`.
    #[must_use]
    pub fn failing(mut self, kind: RecordKind, id: i64) -> Self {
        self.fail.insert((kind, id));
        self
    }

    /// Everything successfully confirmed so far, in order.
    pub fn confirmed(&self) -> Vec<PendingRecord> {
        self.confirmed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn is_online(&self) -> bool {
        true
    }

    async fn confirm(&self, record: &PendingRecord) -> Result<GatewayAck> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.contains(&(record.kind, record.id)) {
            return Err(Error::GatewayUnavailable {
                message: format!("scripted failure for {} {}", record.kind, record.id),
            });
        }
        self.confirmed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(record.clone());
        Ok(GatewayAck {
            reference: format!("MOCK-{}-{}", record.kind, record.id),
            confirmed_at: chrono::Utc::now(),
        })
    }

    async fn exchange_rates(&self) -> Result<HashMap<String, Decimal>> {
        Ok(HashMap::from([
            ("BTC_UGX".to_string(), dec!(158000000)),
            ("USDT_UGX".to_string(), dec!(3750)),
        ]))
    }

    async fn balance(&self) -> Result<Decimal> {
        Ok(dec!(500000))
    }
}
