use crate::domain::ports::{TransactionNotifier, WebhookStoreArc};
use crate::domain::transaction::Transaction;
use crate::domain::webhook::{self, Webhook, WebhookEvent};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Emits one structured event per terminal transaction.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl TransactionNotifier for LogNotifier {
    async fn notify(&self, tx: &Transaction) -> Result<()> {
        info!(
            event = webhook::event_type(tx.status).unwrap_or("transaction.pending"),
            transaction_id = %tx.id,
            destination_wallet_id = %tx.destination_wallet_id,
            amount = %tx.amount,
            "notification"
        );
        Ok(())
    }
}

/// Routes terminal transactions to the purchasing partner's webhooks.
///
/// Each matching subscription gets a [`WebhookEvent`] handed to the log; the
/// HTTP delivery channel lives outside this crate.
pub struct WebhookNotifier {
    webhooks: WebhookStoreArc,
}

impl WebhookNotifier {
    pub fn new(webhooks: WebhookStoreArc) -> Self {
        Self { webhooks }
    }

    /// Events owed to subscribers for `tx`, one per matching webhook.
    pub async fn events_for(&self, tx: &Transaction) -> Result<Vec<(Webhook, WebhookEvent)>> {
        let (Some(event_type), Some(partner_id)) =
            (webhook::event_type(tx.status), tx.partner_id.as_deref())
        else {
            return Ok(Vec::new());
        };

        let mut events = Vec::new();
        for hook in self.webhooks.find_by_partner(partner_id).await? {
            if hook.wants(event_type) {
                events.push((hook, WebhookEvent::for_transaction(event_type, tx)?));
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl TransactionNotifier for WebhookNotifier {
    async fn notify(&self, tx: &Transaction) -> Result<()> {
        LogNotifier.notify(tx).await?;
        for (hook, event) in self.events_for(tx).await? {
            info!(
                webhook_id = %hook.id,
                url = %hook.url,
                event_id = %event.event_id,
                event = event.event_type,
                transaction_id = %tx.id,
                "webhook event queued"
            );
        }
        Ok(())
    }
}
