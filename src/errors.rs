//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Ledger operations
//! surface a typed failure to the immediate caller; the reconciliation loop is
//! the one place where [`Error::GatewayUnavailable`] is treated as expected
//! and retried instead of propagated.

use crate::entities::payout::PayoutStatus;
use thiserror::Error;

/// All failure modes surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad input, rejected before any mutation (e.g. a non-positive amount).
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A unique constraint (username, group name, membership) was violated.
    /// The offending operation is a no-op.
    #[error("{entity} already exists: {key}")]
    DuplicateKey { entity: &'static str, key: String },

    /// A referenced id is absent or soft-deleted.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Payout state machine misuse; carries the status that was observed.
    #[error("cannot {action} a payout in state '{from}'")]
    InvalidTransition {
        from: PayoutStatus,
        action: &'static str,
    },

    /// Authentication failed. Deliberately does not distinguish an unknown
    /// username from a wrong password.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The session's user lacks the role required for the operation.
    #[error("user '{username}' is not authorized for this operation")]
    Forbidden { username: String },

    /// The remote payment gateway is unreachable or rejected the call.
    /// Transient and retryable.
    #[error("Payment gateway unavailable: {message}")]
    GatewayUnavailable { message: String },

    /// Malformed or out-of-range configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Argon2 hashing or hash-parsing failure.
    #[error("Password hashing error: {message}")]
    PasswordHash { message: String },

    /// Unexpected storage engine failure. Fatal to the operation, not to the
    /// process.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure (configuration file, database path).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
