//! Asynchronous settlement of pending purchases.
//!
//! [`Settler`] performs one settlement: the debit is re-validated inside the
//! wallet's critical section, so a stale balance check at request time can
//! never overdraw the wallet. [`SettlementDispatcher`] runs settlements as
//! detached tokio tasks owned by an actor, so they outlive the request that
//! scheduled them.

use crate::domain::ports::{TransactionNotifierArc, TransactionStoreArc, WalletStoreArc};
use crate::domain::transaction::{Transaction, TransactionId};
use crate::domain::wallet::{Amount, Wallet};
use crate::error::{PaymentError, Result};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{self, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

pub struct Settler {
    wallets: WalletStoreArc,
    transactions: TransactionStoreArc,
    notifier: TransactionNotifierArc,
    timeout: Duration,
}

impl Settler {
    pub fn new(
        wallets: WalletStoreArc,
        transactions: TransactionStoreArc,
        notifier: TransactionNotifierArc,
        timeout: Duration,
    ) -> Self {
        Self {
            wallets,
            transactions,
            notifier,
            timeout,
        }
    }

    /// Drives a transaction to a terminal state.
    ///
    /// Already-terminal transactions are returned untouched. The debit runs
    /// in its own task and is never cancelled: once the timeout fires, a
    /// debit that has not started is refused and one that commits late is
    /// credited back.
    pub async fn settle(&self, tx_id: &str) -> Result<Transaction> {
        let tx = self
            .transactions
            .get(tx_id)
            .await?
            .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))?;

        if tx.status.is_terminal() {
            debug!(transaction_id = %tx.id, status = %tx.status, "already settled, skipping");
            return Ok(tx);
        }

        let abandoned = Arc::new(AtomicBool::new(false));
        let mut debit = self.spawn_debit(&tx, abandoned.clone());

        match tokio::time::timeout(self.timeout, &mut debit).await {
            Ok(Ok(Ok(wallet))) => {
                debug!(wallet_id = %wallet.id, balance = %wallet.balance, "wallet debited");
                self.complete(&tx).await
            }
            Ok(Ok(Err(e))) => self.fail(&tx.id, e.to_string()).await,
            Ok(Err(join_error)) => {
                error!(transaction_id = %tx.id, error = %join_error, "debit task aborted");
                self.fail(&tx.id, "debit task aborted").await
            }
            Err(_) => {
                abandoned.store(true, Ordering::SeqCst);
                let failed = self
                    .fail(
                        &tx.id,
                        format!("settlement timed out after {}ms", self.timeout.as_millis()),
                    )
                    .await;
                self.reverse_late_debit(&tx, debit);
                failed
            }
        }
    }

    fn spawn_debit(&self, tx: &Transaction, abandoned: Arc<AtomicBool>) -> JoinHandle<Result<Wallet>> {
        let wallets = self.wallets.clone();
        let wallet_id = tx.source_wallet_id.clone();
        let amount = tx.amount;
        tokio::spawn(async move {
            wallets
                .modify(
                    &wallet_id,
                    Box::new(move |wallet| {
                        if abandoned.load(Ordering::SeqCst) {
                            return Err(PaymentError::SettlementFailure(
                                "debit abandoned after timeout".into(),
                            ));
                        }
                        wallet.debit(amount)
                    }),
                )
                .await
        })
    }

    /// Watches a debit that outlived the timeout and credits it back if it
    /// committed after all.
    fn reverse_late_debit(&self, tx: &Transaction, debit: JoinHandle<Result<Wallet>>) {
        let wallets = self.wallets.clone();
        let tx_id = tx.id.clone();
        let wallet_id = tx.source_wallet_id.clone();
        let amount = tx.amount;
        tokio::spawn(async move {
            match debit.await {
                Ok(Ok(_)) => {
                    warn!(transaction_id = %tx_id, "debit committed after timeout, reversing");
                    reverse_debit(&wallets, &tx_id, &wallet_id, amount).await;
                }
                Ok(Err(e)) => debug!(transaction_id = %tx_id, error = %e, "late debit refused"),
                Err(e) => error!(transaction_id = %tx_id, error = %e, "late debit task aborted"),
            }
        });
    }

    /// Marks a transaction FAILED. A no-op when it is already terminal.
    pub async fn fail(&self, tx_id: &str, reason: impl Into<String>) -> Result<Transaction> {
        let reason = reason.into();
        let recorded = reason.clone();
        let now = Utc::now();
        match self
            .transactions
            .modify(tx_id, Box::new(move |tx| tx.mark_failed(recorded, now)))
            .await
        {
            Ok(failed) => {
                warn!(transaction_id = %tx_id, reason = %reason, "transaction failed");
                self.notify(&failed).await;
                Ok(failed)
            }
            Err(PaymentError::SettlementFailure(_)) => {
                debug!(transaction_id = %tx_id, "already terminal, failure not recorded");
                self.transactions
                    .get(tx_id)
                    .await?
                    .ok_or_else(|| PaymentError::TransactionNotFound(tx_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn complete(&self, tx: &Transaction) -> Result<Transaction> {
        let now = Utc::now();
        match self
            .transactions
            .modify(&tx.id, Box::new(move |t| t.mark_success(now)))
            .await
        {
            Ok(done) => {
                info!(
                    transaction_id = %done.id,
                    wallet_id = %done.source_wallet_id,
                    amount = %done.amount,
                    "transaction settled"
                );
                self.notify(&done).await;
                Ok(done)
            }
            Err(e) => {
                // The debit is committed but the transaction cannot say so:
                // put the money back before failing it.
                error!(transaction_id = %tx.id, error = %e, "could not record settlement, reversing debit");
                reverse_debit(&self.wallets, &tx.id, &tx.source_wallet_id, tx.amount).await;
                self.fail(&tx.id, format!("could not record settlement: {e}"))
                    .await
            }
        }
    }

    async fn notify(&self, tx: &Transaction) {
        if let Err(e) = self.notifier.notify(tx).await {
            warn!(transaction_id = %tx.id, error = %e, "notification failed");
        }
    }
}

/// Exact credit undoing a committed debit.
async fn reverse_debit(wallets: &WalletStoreArc, tx_id: &str, wallet_id: &str, amount: Amount) {
    let reversal = wallets
        .modify(
            wallet_id,
            Box::new(move |wallet| {
                wallet.credit(amount);
                Ok(())
            }),
        )
        .await;
    if let Err(e) = reversal {
        error!(
            transaction_id = %tx_id,
            wallet_id = %wallet_id,
            error = %e,
            "debit reversal failed"
        );
    }
}

enum Command {
    Settle(TransactionId),
    Drain(oneshot::Sender<()>),
}

/// Handle to the settlement actor.
///
/// The actor drops jobs for transactions that are already being settled, so
/// duplicate scheduling of one id never runs two settlements at once.
#[derive(Clone)]
pub struct SettlementDispatcher {
    commands: mpsc::UnboundedSender<Command>,
}

impl SettlementDispatcher {
    /// Spawns the actor on the current tokio runtime.
    pub fn start(settler: Arc<Settler>) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(settler, rx));
        Self { commands }
    }

    pub fn schedule(&self, tx_id: TransactionId) -> Result<()> {
        self.commands
            .send(Command::Settle(tx_id))
            .map_err(|_| PaymentError::SettlementFailure("settlement worker is not running".into()))
    }

    /// Resolves once every job scheduled before this call has finished.
    pub async fn wait_idle(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.commands
            .send(Command::Drain(done))
            .map_err(|_| PaymentError::SettlementFailure("settlement worker is not running".into()))?;
        rx.await
            .map_err(|_| PaymentError::SettlementFailure("settlement worker stopped".into()))
    }
}

/// Jobs in flight, keyed both ways so a crashed job still frees its id.
#[derive(Default)]
struct InFlight {
    ids: HashSet<TransactionId>,
    tasks: HashMap<task::Id, TransactionId>,
}

impl InFlight {
    fn start(&mut self, jobs: &mut JoinSet<()>, settler: &Arc<Settler>, tx_id: TransactionId) {
        if !self.ids.insert(tx_id.clone()) {
            debug!(transaction_id = %tx_id, "settlement already in flight");
            return;
        }
        let handle = jobs.spawn(settle_job(settler.clone(), tx_id.clone()));
        self.tasks.insert(handle.id(), tx_id);
    }

    fn reap(&mut self, joined: std::result::Result<(task::Id, ()), task::JoinError>) {
        let id = match joined {
            Ok((id, ())) => id,
            Err(e) => {
                error!(error = %e, "settlement job crashed");
                e.id()
            }
        };
        if let Some(tx_id) = self.tasks.remove(&id) {
            self.ids.remove(&tx_id);
        }
    }
}

async fn run(settler: Arc<Settler>, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut jobs: JoinSet<()> = JoinSet::new();
    let mut in_flight = InFlight::default();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Settle(tx_id)) => in_flight.start(&mut jobs, &settler, tx_id),
                Some(Command::Drain(done)) => {
                    while let Some(joined) = jobs.join_next_with_id().await {
                        in_flight.reap(joined);
                    }
                    let _ = done.send(());
                }
                None => break,
            },
            Some(joined) = jobs.join_next_with_id(), if !jobs.is_empty() => {
                in_flight.reap(joined);
            }
        }
    }

    while let Some(joined) = jobs.join_next_with_id().await {
        in_flight.reap(joined);
    }
}

/// One settlement in its own task, so a panic is contained and still ends
/// in a terminal state.
async fn settle_job(settler: Arc<Settler>, tx_id: TransactionId) {
    let job = tokio::spawn({
        let settler = settler.clone();
        let tx_id = tx_id.clone();
        async move { settler.settle(&tx_id).await }
    });

    let failure = match job.await {
        Ok(Ok(_)) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(join_error) => {
            error!(transaction_id = %tx_id, error = %join_error, "settlement task aborted");
            Some("settlement task aborted".to_string())
        }
    };

    if let Some(reason) = failure
        && let Err(e) = settler.fail(&tx_id, reason).await
    {
        error!(transaction_id = %tx_id, error = %e, "transaction left pending");
    }
}
