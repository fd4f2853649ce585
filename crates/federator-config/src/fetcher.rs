//! HTTP fetcher for a single management node's configuration document, wired through a
//! [`CircuitBreaker`] and the token service. Status-code handling:
//!
//! - `2xx` — parse the body as `T`.
//! - `401` — the cached token may have expired between issuance and use; fetch a fresh
//!   token and retry exactly once before giving up.
//! - other `4xx` — fatal, not retried (a malformed request won't fix itself).
//! - `5xx` — retryable; returned as an error for the caller's retry policy to act on.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use federator_common::FederatorError;
use federator_token_service::TokenService;
use serde::de::DeserializeOwned;

use crate::circuit_breaker::CircuitBreaker;

pub struct ManagementNodeFetcher<T> {
    base_url: String,
    http: reqwest::Client,
    token_service: Arc<dyn TokenService>,
    circuit_breaker: Arc<CircuitBreaker>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ManagementNodeFetcher<T> {
    pub fn new(
        base_url: impl Into<String>,
        token_service: Arc<dyn TokenService>,
        circuit_breaker: Arc<CircuitBreaker>,
        request_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("federator-config")
            .timeout(request_timeout)
            .build()
            .expect("failed to construct reqwest client for management node fetcher");

        Self {
            base_url: base_url.into(),
            http,
            token_service,
            circuit_breaker,
            _marker: PhantomData,
        }
    }

    pub async fn fetch(&self, path: &str) -> Result<T, FederatorError> {
        self.circuit_breaker.guard()?;
        let result = self.fetch_once(path, false).await;
        match &result {
            Ok(_) => self.circuit_breaker.record_success(),
            Err(err) if err.retry_class() == federator_common::RetryClass::Fatal => {
                // A fatal client error (4xx other than 401) is a misconfiguration, not an
                // availability problem; don't count it against the breaker.
            }
            Err(_) => self.circuit_breaker.record_failure(),
        }
        result
    }

    fn fetch_once<'a>(
        &'a self,
        path: &'a str,
        is_retry: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, FederatorError>> + Send + 'a>>
    {
        Box::pin(async move {
            let token = self.token_service.fetch_token().await?;
            let url = format!("{}{}", self.base_url, path);

            let response = self
                .http
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| FederatorError::ManagementPlaneUnreachable(e.into()))?;

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(|e| FederatorError::ManagementPlane {
                        status: status.as_u16(),
                        message: format!("malformed response body: {e}"),
                    });
            }

            let message = response.text().await.unwrap_or_default();

            if status.as_u16() == 401 && !is_retry {
                tracing::warn!(%url, "management node rejected token, retrying once with a fresh token");
                return self.fetch_once(path, true).await;
            }

            Err(FederatorError::ManagementPlane {
                status: status.as_u16(),
                message,
            })
        })
    }
}
