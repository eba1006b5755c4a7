use crate::domain::ports::{
    IdempotencyIndex, TransactionMutation, TransactionStore, WalletMutation, WalletStore,
};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::domain::wallet::Wallet;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Column Family for storing wallets.
pub const CF_WALLETS: &str = "wallets";
/// Column Family for storing transactions.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for idempotency key associations.
pub const CF_IDEMPOTENCY: &str = "idempotency";

const LOCK_STRIPES: usize = 64;

/// A persistent ledger implementation using RocksDB.
///
/// Wallets, transactions and idempotency keys live in separate Column
/// Families as JSON values. RocksDB gives no read-modify-write primitive, so
/// every mutation of a key runs under one of `LOCK_STRIPES` mutexes chosen
/// by hashing the column family and key: one entity is always serialized,
/// unrelated entities rarely contend.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    stripes: Arc<Vec<Mutex<()>>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_WALLETS, CF_TRANSACTIONS, CF_IDEMPOTENCY]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, families)?;
        let stripes = (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect();

        Ok(Self {
            db: Arc::new(db),
            stripes: Arc::new(stripes),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::InternalError(format!("column family {name} not found")))
    }

    fn lock(&self, cf: &str, key: &str) -> Result<MutexGuard<'_, ()>> {
        let mut hasher = DefaultHasher::new();
        cf.hash(&mut hasher);
        key.hash(&mut hasher);
        let stripe = (hasher.finish() as usize) % self.stripes.len();
        self.stripes[stripe]
            .lock()
            .map_err(|_| PaymentError::InternalError("ledger lock poisoned".to_string()))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, key: &str) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(self.cf(cf)?, key.as_bytes(), bytes)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str) -> Result<Vec<T>> {
        let mut values = Vec::new();
        for item in self.db.iterator_cf(self.cf(cf)?, IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }
}

#[async_trait]
impl WalletStore for RocksDBStore {
    async fn get(&self, wallet_id: &str) -> Result<Option<Wallet>> {
        self.read(CF_WALLETS, wallet_id)
    }

    async fn update(&self, wallet: Wallet) -> Result<()> {
        let _guard = self.lock(CF_WALLETS, &wallet.id)?;
        if self.read::<Wallet>(CF_WALLETS, &wallet.id)?.is_none() {
            return Err(PaymentError::WalletNotFound(wallet.id));
        }
        self.write(CF_WALLETS, &wallet.id, &wallet)
    }

    async fn modify(&self, wallet_id: &str, mutation: WalletMutation) -> Result<Wallet> {
        let _guard = self.lock(CF_WALLETS, wallet_id)?;
        let mut wallet: Wallet = self
            .read(CF_WALLETS, wallet_id)?
            .ok_or_else(|| PaymentError::WalletNotFound(wallet_id.to_string()))?;
        mutation(&mut wallet)?;
        self.write(CF_WALLETS, wallet_id, &wallet)?;
        Ok(wallet)
    }

    async fn insert(&self, wallet: Wallet) -> Result<()> {
        let _guard = self.lock(CF_WALLETS, &wallet.id)?;
        self.write(CF_WALLETS, &wallet.id, &wallet)
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Wallet>> {
        let wallets: Vec<Wallet> = self.scan(CF_WALLETS)?;
        Ok(wallets.into_iter().filter(|w| w.user_id == user_id).collect())
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        // Keys are wallet ids, so iteration order is already sorted by id.
        self.scan(CF_WALLETS)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        let _guard = self.lock(CF_TRANSACTIONS, &tx.id)?;
        if self.db.get_pinned_cf(self.cf(CF_TRANSACTIONS)?, tx.id.as_bytes())?.is_some() {
            return Err(PaymentError::DuplicateTransaction(tx.id));
        }
        self.write(CF_TRANSACTIONS, &tx.id, &tx)
    }

    async fn get(&self, tx_id: &str) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, tx_id)
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        let _guard = self.lock(CF_TRANSACTIONS, &tx.id)?;
        if self.db.get_pinned_cf(self.cf(CF_TRANSACTIONS)?, tx.id.as_bytes())?.is_none() {
            return Err(PaymentError::TransactionNotFound(tx.id));
        }
        self.write(CF_TRANSACTIONS, &tx.id, &tx)
    }

    async fn modify(&self, tx_id: &str, mutation: TransactionMutation) -> Result<Transaction> {
        let _guard = self.lock(CF_TRANSACTIONS, tx_id)?;
        let mut tx: Transaction = self
            .read(CF_TRANSACTIONS, tx_id)?
            .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))?;
        mutation(&mut tx)?;
        self.write(CF_TRANSACTIONS, tx_id, &tx)?;
        Ok(tx)
    }
}

#[async_trait]
impl IdempotencyIndex for RocksDBStore {
    async fn resolve(&self, key: &str) -> Result<Option<TransactionId>> {
        self.read(CF_IDEMPOTENCY, key)
    }

    async fn associate(&self, key: &str, tx_id: &str) -> Result<TransactionId> {
        let _guard = self.lock(CF_IDEMPOTENCY, key)?;
        if let Some(existing) = self.read::<TransactionId>(CF_IDEMPOTENCY, key)? {
            return Ok(existing);
        }
        self.write(CF_IDEMPOTENCY, key, &tx_id)?;
        Ok(tx_id.to_string())
    }
}
