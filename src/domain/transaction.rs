use super::wallet::Amount;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

pub type TransactionId = String;

const ID_PREFIX: &str = "txn_purchase_";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Success | TransactionStatus::Failed)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    #[default]
    CreditPurchase,
}

/// A credit purchase debiting a customer wallet on behalf of a partner.
///
/// Created `Pending` and driven to exactly one terminal state. `completed_at`
/// is written on that first terminal transition and never again.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "transactionId")]
    pub id: TransactionId,
    pub source_wallet_id: String,
    pub user_id: String,
    pub destination_wallet_id: String,
    pub amount: Amount,
    pub currency: String,
    pub status: TransactionStatus,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Partner on whose behalf the purchase was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn credit_purchase(
        source_wallet_id: impl Into<String>,
        user_id: impl Into<String>,
        destination_wallet_id: impl Into<String>,
        amount: Amount,
        currency: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("{ID_PREFIX}{}", Uuid::new_v4().simple()),
            source_wallet_id: source_wallet_id.into(),
            user_id: user_id.into(),
            destination_wallet_id: destination_wallet_id.into(),
            amount,
            currency: currency.into(),
            status: TransactionStatus::Pending,
            kind: TransactionType::CreditPurchase,
            failure_reason: None,
            partner_id: None,
            metadata,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn with_partner(mut self, partner_id: impl Into<String>) -> Self {
        self.partner_id = Some(partner_id.into());
        self
    }

    pub fn mark_success(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.finish(TransactionStatus::Success, at)
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>, at: DateTime<Utc>) -> Result<()> {
        self.finish(TransactionStatus::Failed, at)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    fn finish(&mut self, status: TransactionStatus, at: DateTime<Utc>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(PaymentError::SettlementFailure(format!(
                "transaction {} is already {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.updated_at = at;
        self.completed_at = Some(at);
        Ok(())
    }
}
