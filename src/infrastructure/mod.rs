//! Adapters implementing the domain ports.

pub mod in_memory;
pub mod jwt;
pub mod notifier;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::ports::{IdempotencyIndexArc, TransactionStoreArc, WalletStoreArc};
use in_memory::{InMemoryIdempotencyIndex, InMemoryTransactionStore, InMemoryWalletStore};
use std::sync::Arc;

/// The three ledger ports, backed by the same storage engine.
#[derive(Clone)]
pub struct Ledger {
    pub wallets: WalletStoreArc,
    pub transactions: TransactionStoreArc,
    pub idempotency: IdempotencyIndexArc,
}

impl Ledger {
    pub fn in_memory() -> Self {
        Self {
            wallets: Arc::new(InMemoryWalletStore::new()),
            transactions: Arc::new(InMemoryTransactionStore::new()),
            idempotency: Arc::new(InMemoryIdempotencyIndex::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb<P: AsRef<std::path::Path>>(path: P) -> crate::error::Result<Self> {
        let store = rocksdb::RocksDBStore::open(path)?;
        Ok(Self {
            wallets: Arc::new(store.clone()),
            transactions: Arc::new(store.clone()),
            idempotency: Arc::new(store),
        })
    }
}
