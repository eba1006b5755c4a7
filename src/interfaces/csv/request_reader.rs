use crate::application::engine::CreateTransactionRequest;
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;

/// One CSV row: `user_id, wallet_id, amount, currency, idempotency_key, metadata`.
///
/// `metadata` is a `key=value;key=value` list.
#[derive(Debug, Deserialize)]
struct RequestRecord {
    user_id: String,
    wallet_id: String,
    amount: String,
    currency: String,
    #[serde(default)]
    idempotency_key: Option<String>,
    #[serde(default)]
    metadata: Option<String>,
}

impl TryFrom<RequestRecord> for CreateTransactionRequest {
    type Error = PaymentError;

    fn try_from(record: RequestRecord) -> Result<Self> {
        Ok(Self {
            user_id: record.user_id,
            wallet_id: record.wallet_id,
            amount: record.amount,
            currency: record.currency,
            metadata: parse_metadata(record.metadata.as_deref().unwrap_or(""))?,
            idempotency_key: record.idempotency_key.filter(|k| !k.is_empty()),
        })
    }
}

fn parse_metadata(raw: &str) -> Result<BTreeMap<String, String>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| {
                    PaymentError::InvalidRequest(format!("malformed metadata entry '{pair}'"))
                })
        })
        .collect()
}

/// Reads purchase requests from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and tolerating short rows so the
/// optional trailing columns can be left out.
pub struct RequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily yields one result per data row.
    pub fn requests(self) -> impl Iterator<Item = Result<CreateTransactionRequest>> {
        self.reader.into_deserialize().map(|row| {
            let record: RequestRecord = row?;
            CreateTransactionRequest::try_from(record)
        })
    }
}
