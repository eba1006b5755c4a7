use super::keyed_lock::KeyedLocks;
use super::settlement::{SettlementDispatcher, Settler};
use crate::domain::partner::PartnerIdentity;
use crate::domain::ports::{
    IdempotencyIndexArc, TransactionNotifierArc, TransactionStoreArc, WalletStoreArc,
};
use crate::domain::transaction::Transaction;
use crate::domain::wallet::Amount;
use crate::error::{PaymentError, Result};
use crate::infrastructure::Ledger;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A partner's request to debit a customer wallet.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub user_id: String,
    pub wallet_id: String,
    /// Decimal string, parsed exactly.
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl CreateTransactionRequest {
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("userId", &self.user_id),
            ("walletId", &self.wallet_id),
            ("amount", &self.amount),
            ("currency", &self.currency),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::InvalidRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// The key as sent; blank keys count as absent.
    fn key(&self) -> Option<&str> {
        self.idempotency_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

/// The entry point for credit purchases.
///
/// `create_transaction` validates synchronously and returns the PENDING
/// transaction; the debit happens later in a detached settlement task.
pub struct TransactionEngine {
    wallets: WalletStoreArc,
    transactions: TransactionStoreArc,
    idempotency: IdempotencyIndexArc,
    settler: Arc<Settler>,
    dispatcher: SettlementDispatcher,
    key_locks: KeyedLocks,
}

impl TransactionEngine {
    /// Creates the engine and spawns its settlement worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(ledger: Ledger, notifier: TransactionNotifierArc, settlement_timeout: Duration) -> Self {
        let settler = Arc::new(Settler::new(
            ledger.wallets.clone(),
            ledger.transactions.clone(),
            notifier,
            settlement_timeout,
        ));
        let dispatcher = SettlementDispatcher::start(settler.clone());
        Self {
            wallets: ledger.wallets,
            transactions: ledger.transactions,
            idempotency: ledger.idempotency,
            settler,
            dispatcher,
            key_locks: KeyedLocks::new(),
        }
    }

    pub async fn create_transaction(
        &self,
        partner: &PartnerIdentity,
        request: CreateTransactionRequest,
    ) -> Result<Transaction> {
        let Some(key) = request.key().map(str::to_owned) else {
            request.validate()?;
            return self.submit(partner, request, None).await;
        };

        // Held from lookup to association so one key yields one transaction.
        let _guard = self.key_locks.lock(&key).await;
        if let Some(existing) = self.replay(&key).await? {
            info!(idempotency_key = %key, transaction_id = %existing.id, "idempotent replay");
            return Ok(existing);
        }
        request.validate()?;
        self.submit(partner, request, Some(&key)).await
    }

    pub async fn get_transaction(&self, tx_id: &str) -> Result<Transaction> {
        self.transactions
            .get(tx_id)
            .await?
            .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))
    }

    /// Waits for every settlement scheduled so far. Not part of the request
    /// path; batch callers use it before reading final states.
    pub async fn wait_idle(&self) -> Result<()> {
        self.dispatcher.wait_idle().await
    }

    async fn replay(&self, key: &str) -> Result<Option<Transaction>> {
        match self.idempotency.resolve(key).await? {
            Some(tx_id) => Ok(Some(self.get_transaction(&tx_id).await?)),
            None => Ok(None),
        }
    }

    async fn submit(
        &self,
        partner: &PartnerIdentity,
        request: CreateTransactionRequest,
        idempotency_key: Option<&str>,
    ) -> Result<Transaction> {
        let wallet = self
            .wallets
            .get(&request.wallet_id)
            .await?
            .ok_or_else(|| PaymentError::WalletNotFound(request.wallet_id.clone()))?;

        if wallet.user_id != request.user_id {
            return Err(PaymentError::WalletOwnershipMismatch {
                wallet_id: wallet.id,
                user_id: request.user_id,
            });
        }
        wallet.ensure_active()?;

        let amount = Amount::parse(&request.amount)?;
        if wallet.currency != request.currency {
            return Err(PaymentError::InvalidRequest(format!(
                "currency {} does not match wallet currency {}",
                request.currency, wallet.currency
            )));
        }
        // Snapshot check only; settlement re-checks under the wallet lock.
        wallet.ensure_funds(amount)?;

        let tx = Transaction::credit_purchase(
            wallet.id,
            request.user_id,
            partner.wallet_id.clone(),
            amount,
            request.currency,
            request.metadata,
        )
        .with_partner(partner.partner_id.clone());
        self.transactions.create(tx.clone()).await?;

        if let Some(key) = idempotency_key {
            match self.idempotency.associate(key, &tx.id).await {
                Ok(owner) if owner == tx.id => {}
                Ok(owner) => {
                    // Another writer claimed the key first; its transaction stands.
                    warn!(idempotency_key = %key, owner = %owner, transaction_id = %tx.id, "idempotency key already taken");
                    self.settler
                        .fail(&tx.id, format!("idempotency key already used by {owner}"))
                        .await?;
                    return self.get_transaction(&owner).await;
                }
                Err(e) => {
                    self.settler
                        .fail(&tx.id, format!("could not record idempotency key: {e}"))
                        .await?;
                    return Err(e);
                }
            }
        }

        info!(
            transaction_id = %tx.id,
            wallet_id = %tx.source_wallet_id,
            partner_id = %partner.partner_id,
            amount = %tx.amount,
            "transaction created"
        );

        if let Err(e) = self.dispatcher.schedule(tx.id.clone()) {
            return self.settler.fail(&tx.id, e.to_string()).await;
        }
        Ok(tx)
    }
}
