use crate::domain::wallet::{Balance, Wallet, WalletStatus};
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

/// Balance is kept as text so its scale survives (`100.00` stays `100.00`).
#[derive(Debug, Deserialize)]
struct WalletRecord {
    id: String,
    user_id: String,
    currency: String,
    balance: String,
    status: WalletStatus,
}

/// Reads wallet seeds: `id, user_id, currency, balance, status`.
pub struct WalletReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> WalletReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);
        Self { reader }
    }

    pub fn wallets(self) -> impl Iterator<Item = Result<Wallet>> {
        self.reader.into_deserialize().map(|row| {
            let record: WalletRecord = row?;
            let balance = Balance::parse(&record.balance)?;
            Ok(Wallet::new(record.id, record.user_id, record.currency, balance)
                .with_status(record.status))
        })
    }
}
