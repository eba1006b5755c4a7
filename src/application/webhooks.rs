use crate::domain::ports::WebhookStoreArc;
use crate::domain::webhook::{KNOWN_EVENTS, Webhook};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct RegisterWebhookRequest {
    pub url: String,
    pub events: Vec<String>,
    #[serde(default)]
    pub secret: String,
}

/// Registration and listing of partner webhooks.
pub struct WebhookService {
    webhooks: WebhookStoreArc,
}

impl WebhookService {
    pub fn new(webhooks: WebhookStoreArc) -> Self {
        Self { webhooks }
    }

    pub async fn register(&self, partner_id: &str, request: RegisterWebhookRequest) -> Result<Webhook> {
        let url = request.url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(PaymentError::InvalidRequest(format!(
                "webhook url '{url}' is not an http(s) URL"
            )));
        }
        if request.events.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "at least one event is required".into(),
            ));
        }
        if let Some(unknown) = request
            .events
            .iter()
            .find(|e| !KNOWN_EVENTS.contains(&e.as_str()))
        {
            return Err(PaymentError::InvalidRequest(format!("unknown event '{unknown}'")));
        }

        let webhook = Webhook::new(partner_id, url, request.secret, request.events);
        self.webhooks.create(webhook.clone()).await?;
        info!(webhook_id = %webhook.id, partner_id = %partner_id, url = %webhook.url, "webhook registered");
        Ok(webhook)
    }

    pub async fn list(&self, partner_id: &str) -> Result<Vec<Webhook>> {
        self.webhooks.find_by_partner(partner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::{TRANSACTION_COMPLETED, TRANSACTION_FAILED};
    use crate::infrastructure::in_memory::InMemoryWebhookStore;
    use std::sync::Arc;

    fn service() -> WebhookService {
        WebhookService::new(Arc::new(InMemoryWebhookStore::new()))
    }

    fn request(url: &str, events: &[&str]) -> RegisterWebhookRequest {
        RegisterWebhookRequest {
            url: url.into(),
            events: events.iter().map(|e| e.to_string()).collect(),
            secret: "whsec".into(),
        }
    }

    #[tokio::test]
    async fn test_register_and_list() {
        let service = service();
        let hook = service
            .register(
                "partner_bella",
                request("https://bella.example/hooks", &[TRANSACTION_COMPLETED, TRANSACTION_FAILED]),
            )
            .await
            .unwrap();

        let listed = service.list("partner_bella").await.unwrap();
        assert_eq!(listed, vec![hook]);
        assert!(service.list("partner_other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = service();
        for bad in [
            request("", &[TRANSACTION_FAILED]),
            request("ftp://bella.example", &[TRANSACTION_FAILED]),
            request("https://bella.example", &[]),
            request("https://bella.example", &["wallet.created"]),
        ] {
            assert!(matches!(
                service.register("partner_bella", bad).await,
                Err(PaymentError::InvalidRequest(_))
            ));
        }
        assert!(service.list("partner_bella").await.unwrap().is_empty());
    }
}
