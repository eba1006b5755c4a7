use crate::domain::transaction::Transaction;
use crate::domain::wallet::Wallet;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Response<'a> {
    Transaction(&'a Transaction),
    Error { code: &'static str, message: String },
    Wallet(&'a Wallet),
}

/// Writes one JSON document per line: `{"transaction": ..}`,
/// `{"error": {"code", "message"}}` or `{"wallet": ..}`.
pub struct ResponseWriter<W: Write> {
    out: W,
}

impl<W: Write> ResponseWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_transaction(&mut self, tx: &Transaction) -> Result<()> {
        self.write(&Response::Transaction(tx))
    }

    pub fn write_error(&mut self, error: &PaymentError) -> Result<()> {
        self.write(&Response::Error {
            code: error.code(),
            message: error.to_string(),
        })
    }

    pub fn write_wallet(&mut self, wallet: &Wallet) -> Result<()> {
        self.write(&Response::Wallet(wallet))
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.out.flush()?)
    }

    fn write(&mut self, response: &Response<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.out, response)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}
