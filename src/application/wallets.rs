use crate::domain::ports::WalletStoreArc;
use crate::domain::wallet::{Amount, Wallet};
use crate::error::{PaymentError, Result};
use tracing::info;

/// Wallet queries and the explicit credit operation.
pub struct WalletService {
    wallets: WalletStoreArc,
}

impl WalletService {
    pub fn new(wallets: WalletStoreArc) -> Self {
        Self { wallets }
    }

    pub async fn wallet(&self, wallet_id: &str) -> Result<Wallet> {
        self.wallets
            .get(wallet_id)
            .await?
            .ok_or_else(|| PaymentError::WalletNotFound(wallet_id.to_string()))
    }

    pub async fn wallets_for_user(&self, user_id: &str) -> Result<Vec<Wallet>> {
        self.wallets.find_by_user(user_id).await
    }

    pub async fn all(&self) -> Result<Vec<Wallet>> {
        self.wallets.all().await
    }

    pub async fn credit(&self, wallet_id: &str, amount: &str) -> Result<Wallet> {
        let amount = Amount::parse(amount)?;
        let wallet = self
            .wallets
            .modify(
                wallet_id,
                Box::new(move |wallet| {
                    wallet.credit(amount);
                    Ok(())
                }),
            )
            .await?;
        info!(wallet_id = %wallet.id, amount = %amount, balance = %wallet.balance, "wallet credited");
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::WalletStore;
    use crate::domain::wallet::Balance;
    use crate::infrastructure::in_memory::InMemoryWalletStore;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn service() -> WalletService {
        let store = InMemoryWalletStore::new();
        store
            .insert(Wallet::new("wlt_usd", "usr_1", "USD", Balance::new(dec!(1.10))))
            .await
            .unwrap();
        store
            .insert(Wallet::new("wlt_eur", "usr_1", "EUR", Balance::ZERO))
            .await
            .unwrap();
        WalletService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_credit_is_exact() {
        let service = service().await;
        let wallet = service.credit("wlt_usd", "0.20").await.unwrap();
        assert_eq!(wallet.balance.to_string(), "1.30");
        assert_eq!(service.wallet("wlt_usd").await.unwrap(), wallet);
    }

    #[tokio::test]
    async fn test_credit_rejects_bad_input() {
        let service = service().await;
        assert!(matches!(
            service.credit("wlt_usd", "0").await,
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            service.credit("wlt_nope", "1").await,
            Err(PaymentError::WalletNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wallets_for_user() {
        let service = service().await;
        let wallets = service.wallets_for_user("usr_1").await.unwrap();
        assert_eq!(wallets.len(), 2);
        assert!(service.wallets_for_user("usr_2").await.unwrap().is_empty());
    }
}
