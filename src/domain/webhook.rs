use super::transaction::{Transaction, TransactionStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const TRANSACTION_COMPLETED: &str = "transaction.completed";
pub const TRANSACTION_FAILED: &str = "transaction.failed";

/// Events a webhook may subscribe to.
pub const KNOWN_EVENTS: [&str; 2] = [TRANSACTION_COMPLETED, TRANSACTION_FAILED];

/// Event raised by a terminal transaction, `None` while it is pending.
pub fn event_type(status: TransactionStatus) -> Option<&'static str> {
    match status {
        TransactionStatus::Success => Some(TRANSACTION_COMPLETED),
        TransactionStatus::Failed => Some(TRANSACTION_FAILED),
        TransactionStatus::Pending => None,
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    Active,
    Inactive,
}

/// A partner's subscription to transaction events.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    pub partner_id: String,
    pub url: String,
    pub events: Vec<String>,
    /// Signing secret, never echoed back.
    #[serde(skip_serializing)]
    pub secret: String,
    pub status: WebhookStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn new(
        partner_id: impl Into<String>,
        url: impl Into<String>,
        secret: impl Into<String>,
        events: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("whk_{}", Uuid::new_v4().simple()),
            partner_id: partner_id.into(),
            url: url.into(),
            events,
            secret: secret.into(),
            status: WebhookStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn wants(&self, event: &str) -> bool {
        self.status == WebhookStatus::Active && self.events.iter().any(|e| e == event)
    }
}

/// Payload handed to the delivery channel.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: &'static str,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl WebhookEvent {
    pub fn for_transaction(event_type: &'static str, tx: &Transaction) -> Result<Self> {
        Ok(Self {
            event_id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type,
            timestamp: Utc::now(),
            data: serde_json::to_value(tx)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_subscriptions_match() {
        let mut hook = Webhook::new(
            "partner_bella",
            "https://bella.example/hooks",
            "whsec",
            vec![TRANSACTION_FAILED.to_string()],
        );
        assert!(hook.id.starts_with("whk_"));
        assert!(hook.wants(TRANSACTION_FAILED));
        assert!(!hook.wants(TRANSACTION_COMPLETED));

        hook.status = WebhookStatus::Inactive;
        assert!(!hook.wants(TRANSACTION_FAILED));
    }

    #[test]
    fn test_secret_never_serialized() {
        let hook = Webhook::new("p", "https://x.example", "whsec_123", vec![]);
        let json = serde_json::to_string(&hook).unwrap();
        assert!(!json.contains("whsec_123"));
        assert!(json.contains("\"partnerId\":\"p\""));
    }

    #[test]
    fn test_pending_raises_no_event() {
        assert_eq!(event_type(TransactionStatus::Pending), None);
        assert_eq!(event_type(TransactionStatus::Success), Some(TRANSACTION_COMPLETED));
    }
}
