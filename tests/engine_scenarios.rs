mod common;

use common::*;
use credit_purchase::domain::transaction::TransactionStatus;
use credit_purchase::domain::wallet::{Balance, WalletStatus};
use credit_purchase::error::PaymentError;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_purchase_debits_wallet() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Active).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = start_engine(&ledger, notifier.clone());

    let tx = engine
        .create_transaction(&partner(), request("40.00", None))
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert!(tx.completed_at.is_none());

    engine.wait_idle().await.unwrap();

    let settled = engine.get_transaction(&tx.id).await.unwrap();
    assert_eq!(settled.status, TransactionStatus::Success);
    assert!(settled.completed_at.is_some());
    assert_eq!(balance(&ledger).await.to_string(), "60.00");
    assert_eq!(notifier.seen(), vec![(tx.id, TransactionStatus::Success)]);
}

#[tokio::test]
async fn test_replayed_key_debits_once() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Active).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = start_engine(&ledger, notifier.clone());

    let first = engine
        .create_transaction(&partner(), request("40.00", Some("K")))
        .await
        .unwrap();
    let second = engine
        .create_transaction(&partner(), request("40.00", Some("K")))
        .await
        .unwrap();
    engine.wait_idle().await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(balance(&ledger).await, Balance::new(dec!(60.00)));
    assert_eq!(notifier.seen().len(), 1);
}

#[tokio::test]
async fn test_replay_wins_over_changed_body() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Active).await;
    let engine = start_engine(&ledger, Arc::new(RecordingNotifier::default()));

    let first = engine
        .create_transaction(&partner(), request("10.00", Some("K")))
        .await
        .unwrap();
    engine.wait_idle().await.unwrap();

    // Same key, different amount: the stored transaction is returned as is
    let replay = engine
        .create_transaction(&partner(), request("99.00", Some("K")))
        .await
        .unwrap();
    assert_eq!(replay.id, first.id);
    assert_eq!(replay.amount.to_string(), "10.00");
    assert_eq!(replay.status, TransactionStatus::Success);
    assert_eq!(balance(&ledger).await.to_string(), "90.00");
}

#[tokio::test]
async fn test_inactive_wallet_creates_nothing() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Inactive).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = start_engine(&ledger, notifier.clone());

    let err = engine
        .create_transaction(&partner(), request("40.00", Some("K")))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::WalletInactive(_)));
    assert_eq!(err.code(), "WALLET_INACTIVE");

    engine.wait_idle().await.unwrap();
    assert!(ledger.idempotency.resolve("K").await.unwrap().is_none());
    assert!(notifier.seen().is_empty());
    assert_eq!(balance(&ledger).await.to_string(), "100.00");
}

#[tokio::test]
async fn test_frozen_wallet_rejected() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Frozen).await;
    let engine = start_engine(&ledger, Arc::new(RecordingNotifier::default()));

    assert!(matches!(
        engine.create_transaction(&partner(), request("1", None)).await,
        Err(PaymentError::WalletInactive(_))
    ));
}

#[tokio::test]
async fn test_wallet_frozen_before_settlement_fails_transaction() {
    let ledger = ledger_with(dec!(100.00), WalletStatus::Active).await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = start_engine(&ledger, notifier.clone());

    // Freeze inside the same critical section the debit will use, before the
    // settlement worker gets a chance to run.
    let tx = engine
        .create_transaction(&partner(), request("40.00", None))
        .await
        .unwrap();
    ledger
        .wallets
        .modify(
            WALLET_ID,
            Box::new(|wallet| {
                wallet.status = WalletStatus::Frozen;
                Ok(())
            }),
        )
        .await
        .unwrap();
    engine.wait_idle().await.unwrap();

    let settled = engine.get_transaction(&tx.id).await.unwrap();
    // Either the debit ran first or the freeze did; never both outcomes.
    match settled.status {
        TransactionStatus::Success => {
            assert_eq!(balance(&ledger).await.to_string(), "60.00");
        }
        TransactionStatus::Failed => {
            assert!(settled.failure_reason.unwrap().contains("not active"));
            assert_eq!(balance(&ledger).await.to_string(), "100.00");
        }
        TransactionStatus::Pending => panic!("transaction left pending"),
    }
    assert_eq!(notifier.seen().len(), 1);
}

#[tokio::test]
async fn test_exact_decimal_arithmetic() {
    let ledger = ledger_with(dec!(1500.50), WalletStatus::Active).await;
    let engine = start_engine(&ledger, Arc::new(RecordingNotifier::default()));

    engine
        .create_transaction(&partner(), request("500.25", None))
        .await
        .unwrap();
    engine
        .create_transaction(&partner(), request("0.10", None))
        .await
        .unwrap();
    engine
        .create_transaction(&partner(), request("0.20", None))
        .await
        .unwrap();
    engine.wait_idle().await.unwrap();

    assert_eq!(balance(&ledger).await.to_string(), "999.95");
}
