use crate::domain::partner::Partner;
use crate::domain::ports::{
    IdempotencyIndex, PartnerStore, TransactionMutation, TransactionStore, WalletMutation,
    WalletStore, WebhookStore,
};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::domain::wallet::Wallet;
use crate::domain::webhook::Webhook;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory wallet store.
///
/// Backed by a sharded `DashMap`: a mutation holds the write lock of the
/// wallet's shard only, so writes to one wallet are serialized while writes
/// to wallets in other shards proceed in parallel.
#[derive(Default, Clone)]
pub struct InMemoryWalletStore {
    wallets: Arc<DashMap<String, Wallet>>,
}

impl InMemoryWalletStore {
    /// Creates a new, empty in-memory wallet store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for InMemoryWalletStore {
    async fn get(&self, wallet_id: &str) -> Result<Option<Wallet>> {
        Ok(self.wallets.get(wallet_id).map(|w| w.clone()))
    }

    async fn update(&self, wallet: Wallet) -> Result<()> {
        let mut entry = self
            .wallets
            .get_mut(&wallet.id)
            .ok_or_else(|| PaymentError::WalletNotFound(wallet.id.clone()))?;
        *entry = wallet;
        Ok(())
    }

    async fn modify(&self, wallet_id: &str, mutation: WalletMutation) -> Result<Wallet> {
        let mut entry = self
            .wallets
            .get_mut(wallet_id)
            .ok_or_else(|| PaymentError::WalletNotFound(wallet_id.to_string()))?;
        let mut next = entry.clone();
        mutation(&mut next)?;
        *entry = next.clone();
        Ok(next)
    }

    async fn insert(&self, wallet: Wallet) -> Result<()> {
        self.wallets.insert(wallet.id.clone(), wallet);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Wallet>> {
        let mut wallets: Vec<Wallet> = self
            .wallets
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.clone())
            .collect();
        wallets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(wallets)
    }

    async fn all(&self) -> Result<Vec<Wallet>> {
        let mut wallets: Vec<Wallet> = self.wallets.iter().map(|w| w.clone()).collect();
        wallets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(wallets)
    }
}

/// A thread-safe in-memory transaction store, sharded like
/// [`InMemoryWalletStore`].
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    transactions: Arc<DashMap<TransactionId, Transaction>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn create(&self, tx: Transaction) -> Result<()> {
        match self.transactions.entry(tx.id.clone()) {
            Entry::Occupied(_) => Err(PaymentError::DuplicateTransaction(tx.id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                Ok(())
            }
        }
    }

    async fn get(&self, tx_id: &str) -> Result<Option<Transaction>> {
        Ok(self.transactions.get(tx_id).map(|t| t.clone()))
    }

    async fn update(&self, tx: Transaction) -> Result<()> {
        let mut entry = self
            .transactions
            .get_mut(&tx.id)
            .ok_or_else(|| PaymentError::TransactionNotFound(tx.id.clone()))?;
        *entry = tx;
        Ok(())
    }

    async fn modify(&self, tx_id: &str, mutation: TransactionMutation) -> Result<Transaction> {
        let mut entry = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))?;
        let mut next = entry.clone();
        mutation(&mut next)?;
        *entry = next.clone();
        Ok(next)
    }
}

/// Idempotency keys mapped to transaction ids.
///
/// Uses `Arc<RwLock<HashMap<..>>>`; `associate` takes the write lock so
/// concurrent callers for one key are serialized and the first one wins.
#[derive(Default, Clone)]
pub struct InMemoryIdempotencyIndex {
    keys: Arc<RwLock<HashMap<String, TransactionId>>>,
}

impl InMemoryIdempotencyIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyIndex for InMemoryIdempotencyIndex {
    async fn resolve(&self, key: &str) -> Result<Option<TransactionId>> {
        let keys = self.keys.read().await;
        Ok(keys.get(key).cloned())
    }

    async fn associate(&self, key: &str, tx_id: &str) -> Result<TransactionId> {
        let mut keys = self.keys.write().await;
        Ok(keys
            .entry(key.to_string())
            .or_insert_with(|| tx_id.to_string())
            .clone())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPartnerStore {
    partners: Arc<RwLock<HashMap<String, Partner>>>,
}

impl InMemoryPartnerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PartnerStore for InMemoryPartnerStore {
    async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Partner>> {
        let partners = self.partners.read().await;
        Ok(partners.values().find(|p| p.client_id == client_id).cloned())
    }

    async fn find_by_id(&self, partner_id: &str) -> Result<Option<Partner>> {
        let partners = self.partners.read().await;
        Ok(partners.get(partner_id).cloned())
    }

    async fn insert(&self, partner: Partner) -> Result<()> {
        let mut partners = self.partners.write().await;
        partners.insert(partner.id.clone(), partner);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryWebhookStore {
    webhooks: Arc<RwLock<HashMap<String, Webhook>>>,
}

impl InMemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn create(&self, webhook: Webhook) -> Result<()> {
        let mut webhooks = self.webhooks.write().await;
        if webhooks.contains_key(&webhook.id) {
            return Err(PaymentError::InvalidRequest(format!(
                "webhook {} already exists",
                webhook.id
            )));
        }
        webhooks.insert(webhook.id.clone(), webhook);
        Ok(())
    }

    async fn find_by_partner(&self, partner_id: &str) -> Result<Vec<Webhook>> {
        let webhooks = self.webhooks.read().await;
        let mut found: Vec<Webhook> = webhooks
            .values()
            .filter(|w| w.partner_id == partner_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }
}
