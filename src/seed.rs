//! Demo partner and wallets used when no seed data is supplied.

use crate::domain::partner::Partner;
use crate::domain::ports::{PartnerStore, WalletStore};
use crate::domain::wallet::{Balance, Wallet};
use crate::error::Result;
use rust_decimal_macros::dec;

pub const DEMO_PARTNER_ID: &str = "partner_bella";
pub const DEMO_CLIENT_ID: &str = "bella_mobile_prod";
pub const DEMO_CLIENT_SECRET: &str = "secret_bella_123";
pub const DEMO_PARTNER_WALLET: &str = "wlt_partner_bella";

pub fn demo_partner() -> Partner {
    Partner::new(
        DEMO_PARTNER_ID,
        "Bella Mobile",
        DEMO_CLIENT_ID,
        DEMO_CLIENT_SECRET,
        DEMO_PARTNER_WALLET,
    )
}

pub fn demo_wallets() -> Vec<Wallet> {
    vec![
        Wallet::new("wlt_usd_abc123", "usr_123", "USD", Balance::new(dec!(1500.50))),
        Wallet::new(DEMO_PARTNER_WALLET, DEMO_PARTNER_ID, "USD", Balance::new(dec!(0.00))),
    ]
}

pub async fn seed_partners(partners: &dyn PartnerStore) -> Result<()> {
    partners.insert(demo_partner()).await
}

/// Inserts `wallets` unless the store already holds data.
pub async fn seed_wallets(store: &dyn WalletStore, wallets: Vec<Wallet>) -> Result<usize> {
    if !store.all().await?.is_empty() {
        return Ok(0);
    }
    let count = wallets.len();
    for wallet in wallets {
        store.insert(wallet).await?;
    }
    Ok(count)
}
