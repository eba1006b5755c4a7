//! Domain layer: ledger entities, value objects, and the ports the
//! application layer drives.

pub mod partner;
pub mod ports;
pub mod transaction;
pub mod wallet;
pub mod webhook;
