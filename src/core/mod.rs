//! Core business logic - framework-agnostic ledger operations.
//!
//! Callers (GUI, CLI, tests) invoke these functions with a
//! `DatabaseConnection`; everything returns plain data or a typed error from
//! [`crate::errors`]. Nothing here knows about the presentation layer or the
//! gateway wire protocol.

pub mod commission;
pub mod contribution;
pub mod group;
pub mod payout;
pub mod report;
pub mod setting;
pub mod user;
