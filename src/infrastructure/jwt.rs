use crate::domain::partner::{AccessToken, PartnerCredentials, PartnerIdentity};
use crate::domain::ports::{Authenticator, PartnerStoreArc};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// JWT claims carried by a partner bearer token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // partner id
    pub client_id: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and verifies HS256 bearer tokens for partners.
pub struct JwtAuthenticator {
    partners: PartnerStoreArc,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtAuthenticator {
    pub fn new(partners: PartnerStoreArc, secret: &str, ttl: Duration) -> Self {
        Self {
            partners,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, credentials: &PartnerCredentials) -> Result<AccessToken> {
        let partner = self
            .partners
            .find_by_client_id(&credentials.api_key)
            .await?
            .ok_or(PaymentError::InvalidCredentials)?;

        if partner.client_secret != credentials.api_secret || !partner.is_active() {
            debug!(client_id = %credentials.api_key, "rejected partner credentials");
            return Err(PaymentError::InvalidCredentials);
        }

        let now = Utc::now();
        let claims = Claims {
            sub: partner.id.clone(),
            client_id: partner.client_id.clone(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };
        let token = self.sign(&claims)?;
        info!(partner_id = %partner.id, "issued access token");

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer",
            expires_in: self.ttl.num_seconds(),
        })
    }

    async fn verify(&self, token: &str) -> Result<PartnerIdentity> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| PaymentError::InvalidToken)?;

        let partner = self
            .partners
            .find_by_id(&data.claims.sub)
            .await?
            .filter(|p| p.is_active())
            .ok_or(PaymentError::InvalidToken)?;

        Ok(partner.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::partner::{Partner, PartnerStatus};
    use crate::domain::ports::PartnerStore;
    use crate::infrastructure::in_memory::InMemoryPartnerStore;
    use std::sync::Arc;

    const SECRET: &str = "test-secret";

    async fn setup() -> (JwtAuthenticator, InMemoryPartnerStore) {
        let partners = InMemoryPartnerStore::new();
        partners
            .insert(Partner::new(
                "partner_bella",
                "Bella Mobile",
                "bella_mobile_prod",
                "secret_bella_123",
                "wlt_partner_bella",
            ))
            .await
            .unwrap();
        let auth = JwtAuthenticator::new(Arc::new(partners.clone()), SECRET, Duration::hours(1));
        (auth, partners)
    }

    fn credentials(key: &str, secret: &str) -> PartnerCredentials {
        PartnerCredentials {
            api_key: key.to_string(),
            api_secret: secret.to_string(),
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify() {
        let (auth, _) = setup().await;
        let token = auth
            .authenticate(&credentials("bella_mobile_prod", "secret_bella_123"))
            .await
            .unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);

        let identity = auth.verify(&token.access_token).await.unwrap();
        assert_eq!(identity.partner_id, "partner_bella");
        assert_eq!(identity.wallet_id, "wlt_partner_bella");
    }

    #[tokio::test]
    async fn test_rejects_bad_credentials() {
        let (auth, _) = setup().await;
        assert!(matches!(
            auth.authenticate(&credentials("bella_mobile_prod", "wrong")).await,
            Err(PaymentError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate(&credentials("unknown", "secret_bella_123")).await,
            Err(PaymentError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_rejects_inactive_partner() {
        let (auth, partners) = setup().await;
        let mut partner = partners.find_by_id("partner_bella").await.unwrap().unwrap();
        let token = auth
            .authenticate(&credentials("bella_mobile_prod", "secret_bella_123"))
            .await
            .unwrap();

        partner.status = PartnerStatus::Inactive;
        partners.insert(partner).await.unwrap();

        assert!(matches!(
            auth.verify(&token.access_token).await,
            Err(PaymentError::InvalidToken)
        ));
        assert!(matches!(
            auth.authenticate(&credentials("bella_mobile_prod", "secret_bella_123"))
                .await,
            Err(PaymentError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_rejects_tampered_and_expired_tokens() {
        let (auth, _) = setup().await;
        assert!(matches!(
            auth.verify("not-a-token").await,
            Err(PaymentError::InvalidToken)
        ));

        let other = JwtAuthenticator::new(
            Arc::new(InMemoryPartnerStore::new()),
            "other-secret",
            Duration::hours(1),
        );
        let now = Utc::now().timestamp() as usize;
        let foreign = other
            .sign(&Claims {
                sub: "partner_bella".into(),
                client_id: "bella_mobile_prod".into(),
                iat: now,
                exp: now + 3600,
            })
            .unwrap();
        assert!(matches!(
            auth.verify(&foreign).await,
            Err(PaymentError::InvalidToken)
        ));

        let expired = auth
            .sign(&Claims {
                sub: "partner_bella".into(),
                client_id: "bella_mobile_prod".into(),
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert!(matches!(
            auth.verify(&expired).await,
            Err(PaymentError::InvalidToken)
        ));
    }
}
