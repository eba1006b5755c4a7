//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `TransactionEngine`, the entry point for credit
//! purchases. Settlement runs in an actor-like worker fed through `tokio`
//! channels, which keeps it independent of the caller's lifetime.

pub mod engine;
pub mod keyed_lock;
pub mod settlement;
pub mod wallets;
pub mod webhooks;
