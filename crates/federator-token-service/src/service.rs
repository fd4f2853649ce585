//! Token acquisition (client-credentials grant against the IdP) and verification
//! (JWKS-backed signature check) for both sides of the data plane: the client fetches a
//! bearer token to call producer servers, the server verifies one on every inbound call.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use federator_common::FederatorError;
use jsonwebtoken::{decode, decode_header, Validation};
use serde::Deserialize;

use crate::claims::Claims;
use crate::jwks::JwksCache;

/// Tokens are treated as stale this far before their real expiry, so a token that's
/// about to expire mid-call is never handed out as "fresh".
const EXPIRY_SKEW: Duration = Duration::from_secs(5);

#[async_trait]
pub trait TokenService: Send + Sync {
    /// Acquire a bearer token to present to a producer server. Returns the cached token
    /// if it's still fresh; otherwise fetches a new one, caching it for `expires_in`
    /// seconds. Implementations retry once (after sleeping `backoff`) on a transient
    /// failure before surfacing the error.
    async fn fetch_token(&self) -> Result<String, FederatorError>;

    /// Verify an inbound bearer token's signature and expiry, returning its claims.
    async fn verify_token(&self, token: &str) -> Result<Claims, FederatorError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct IdpTokenService {
    token_url: String,
    client_id: String,
    client_secret: String,
    audience: Option<String>,
    http: reqwest::Client,
    jwks: Arc<JwksCache>,
    expected_issuer: Option<String>,
    backoff: Duration,
    cached_token: Mutex<Option<CachedToken>>,
}

impl IdpTokenService {
    pub fn new(
        token_url: impl Into<String>,
        jwks_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: Option<String>,
        expected_issuer: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self::with_backoff(
            token_url,
            jwks_url,
            client_id,
            client_secret,
            audience,
            expected_issuer,
            request_timeout,
            Duration::from_millis(500),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_backoff(
        token_url: impl Into<String>,
        jwks_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: Option<String>,
        expected_issuer: Option<String>,
        request_timeout: Duration,
        backoff: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("federator-token-service")
            .timeout(request_timeout)
            .build()
            .expect("failed to construct reqwest client for token service");

        let jwks = Arc::new(JwksCache::new(jwks_url, http.clone(), Duration::from_secs(300)));

        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience,
            http,
            jwks,
            expected_issuer,
            backoff,
            cached_token: Mutex::new(None),
        }
    }

    fn cached_if_fresh(&self) -> Option<String> {
        let guard = self.cached_token.lock().expect("poisoned token cache");
        guard.as_ref().and_then(|cached| {
            (Instant::now() + EXPIRY_SKEW < cached.expires_at).then(|| cached.token.clone())
        })
    }

    fn store(&self, token: &str, expires_in: u64) {
        let mut guard = self.cached_token.lock().expect("poisoned token cache");
        *guard = Some(CachedToken {
            token: token.to_string(),
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        });
    }

    async fn request_token(&self) -> Result<TokenResponse, FederatorError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        if let Some(audience) = &self.audience {
            form.push(("audience", audience.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| FederatorError::TokenFetch {
                management_node_id: self.client_id.clone(),
                source: e.into(),
            })?;

        let response = response
            .error_for_status()
            .map_err(|e| FederatorError::TokenFetch {
                management_node_id: self.client_id.clone(),
                source: e.into(),
            })?;

        response.json().await.map_err(|e| FederatorError::TokenFetch {
            management_node_id: self.client_id.clone(),
            source: e.into(),
        })
    }
}

#[async_trait]
impl TokenService for IdpTokenService {
    async fn fetch_token(&self) -> Result<String, FederatorError> {
        if let Some(token) = self.cached_if_fresh() {
            return Ok(token);
        }

        let body = match self.request_token().await {
            Ok(body) => body,
            Err(first_err) => {
                tracing::warn!(error = %first_err, "token fetch failed, retrying once");
                tokio::time::sleep(self.backoff).await;
                self.request_token().await.map_err(|_| first_err)?
            }
        };

        self.store(&body.access_token, body.expires_in);
        Ok(body.access_token)
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, FederatorError> {
        let header = decode_header(token)
            .map_err(|e| FederatorError::TokenInvalid(format!("malformed token header: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| FederatorError::TokenInvalid("token header is missing kid".to_string()))?;

        let key = self.jwks.key_for(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = true;
        if let Some(issuer) = &self.expected_issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        }

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| FederatorError::TokenInvalid(e.to_string()))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_empty_before_first_fetch() {
        let service = IdpTokenService::new(
            "https://idp.example/token",
            "https://idp.example/jwks",
            "client",
            "secret",
            None,
            None,
            Duration::from_secs(5),
        );
        assert!(service.cached_if_fresh().is_none());
    }

    #[test]
    fn stored_token_is_served_until_near_expiry() {
        let service = IdpTokenService::new(
            "https://idp.example/token",
            "https://idp.example/jwks",
            "client",
            "secret",
            None,
            None,
            Duration::from_secs(5),
        );
        service.store("token-a", 60);
        assert_eq!(service.cached_if_fresh().as_deref(), Some("token-a"));
    }

    #[test]
    fn token_within_expiry_skew_is_not_served_as_fresh() {
        let service = IdpTokenService::new(
            "https://idp.example/token",
            "https://idp.example/jwks",
            "client",
            "secret",
            None,
            None,
            Duration::from_secs(5),
        );
        service.store("token-a", 1);
        assert!(service.cached_if_fresh().is_none());
    }
}
