#![allow(dead_code)]

use async_trait::async_trait;
use credit_purchase::application::engine::{CreateTransactionRequest, TransactionEngine};
use credit_purchase::domain::partner::PartnerIdentity;
use credit_purchase::domain::ports::TransactionNotifier;
use credit_purchase::domain::transaction::{Transaction, TransactionStatus};
use credit_purchase::domain::wallet::{Balance, Wallet, WalletStatus};
use credit_purchase::error::Result;
use credit_purchase::infrastructure::Ledger;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WALLET_ID: &str = "wlt_usd_abc123";
pub const USER_ID: &str = "usr_123";

/// Remembers every terminal state it is told about.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<(String, TransactionStatus)>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<(String, TransactionStatus)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionNotifier for RecordingNotifier {
    async fn notify(&self, tx: &Transaction) -> Result<()> {
        self.seen.lock().unwrap().push((tx.id.clone(), tx.status));
        Ok(())
    }
}

pub fn partner() -> PartnerIdentity {
    PartnerIdentity {
        partner_id: "partner_bella".into(),
        client_id: "bella_mobile_prod".into(),
        wallet_id: "wlt_partner_bella".into(),
    }
}

pub fn request(amount: &str, key: Option<&str>) -> CreateTransactionRequest {
    CreateTransactionRequest {
        user_id: USER_ID.into(),
        wallet_id: WALLET_ID.into(),
        amount: amount.into(),
        currency: "USD".into(),
        idempotency_key: key.map(str::to_string),
        ..Default::default()
    }
}

pub async fn ledger_with(balance: Decimal, status: WalletStatus) -> Ledger {
    let ledger = Ledger::in_memory();
    ledger
        .wallets
        .insert(Wallet::new(WALLET_ID, USER_ID, "USD", Balance::new(balance)).with_status(status))
        .await
        .unwrap();
    ledger
}

pub fn start_engine(ledger: &Ledger, notifier: Arc<RecordingNotifier>) -> TransactionEngine {
    TransactionEngine::start(ledger.clone(), notifier, Duration::from_secs(5))
}

pub async fn balance(ledger: &Ledger) -> Balance {
    ledger.wallets.get(WALLET_ID).await.unwrap().unwrap().balance
}
