use super::partner::{AccessToken, Partner, PartnerCredentials, PartnerIdentity};
use super::transaction::{Transaction, TransactionId};
use super::wallet::Wallet;
use super::webhook::Webhook;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-check-write applied to a single wallet inside its critical section.
/// Returning an error leaves the stored wallet untouched.
pub type WalletMutation = Box<dyn FnOnce(&mut Wallet) -> Result<()> + Send>;

/// Same contract as [`WalletMutation`], for transactions.
pub type TransactionMutation = Box<dyn FnOnce(&mut Transaction) -> Result<()> + Send>;

/// Wallet half of the ledger. Every operation is atomic for one wallet id;
/// nothing spans several wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    async fn get(&self, wallet_id: &str) -> Result<Option<Wallet>>;
    /// Replaces a known wallet. Fails with `WalletNotFound` instead of inserting.
    async fn update(&self, wallet: Wallet) -> Result<()>;
    async fn modify(&self, wallet_id: &str, mutation: WalletMutation) -> Result<Wallet>;
    /// Provisioning entry point, upserts.
    async fn insert(&self, wallet: Wallet) -> Result<()>;
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Wallet>>;
    async fn all(&self) -> Result<Vec<Wallet>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Fails with `DuplicateTransaction` if the id is taken.
    async fn create(&self, tx: Transaction) -> Result<()>;
    async fn get(&self, tx_id: &str) -> Result<Option<Transaction>>;
    /// Fails with `TransactionNotFound` if the id is unknown.
    async fn update(&self, tx: Transaction) -> Result<()>;
    async fn modify(&self, tx_id: &str, mutation: TransactionMutation) -> Result<Transaction>;
}

#[async_trait]
pub trait IdempotencyIndex: Send + Sync {
    async fn resolve(&self, key: &str) -> Result<Option<TransactionId>>;
    /// Write-once association. Returns the id that owns the key afterwards,
    /// which is `tx_id` only for the first caller.
    async fn associate(&self, key: &str, tx_id: &str) -> Result<TransactionId>;
}

#[async_trait]
pub trait PartnerStore: Send + Sync {
    async fn find_by_client_id(&self, client_id: &str) -> Result<Option<Partner>>;
    async fn find_by_id(&self, partner_id: &str) -> Result<Option<Partner>>;
    async fn insert(&self, partner: Partner) -> Result<()>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credentials: &PartnerCredentials) -> Result<AccessToken>;
    async fn verify(&self, token: &str) -> Result<PartnerIdentity>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Fails with `InvalidRequest` if the id is taken.
    async fn create(&self, webhook: Webhook) -> Result<()>;
    async fn find_by_partner(&self, partner_id: &str) -> Result<Vec<Webhook>>;
}

/// Sink for terminal transaction states (webhooks live behind this).
#[async_trait]
pub trait TransactionNotifier: Send + Sync {
    async fn notify(&self, tx: &Transaction) -> Result<()>;
}

pub type WalletStoreArc = Arc<dyn WalletStore>;
pub type TransactionStoreArc = Arc<dyn TransactionStore>;
pub type IdempotencyIndexArc = Arc<dyn IdempotencyIndex>;
pub type PartnerStoreArc = Arc<dyn PartnerStore>;
pub type AuthenticatorArc = Arc<dyn Authenticator>;
pub type TransactionNotifierArc = Arc<dyn TransactionNotifier>;
pub type WebhookStoreArc = Arc<dyn WebhookStore>;
