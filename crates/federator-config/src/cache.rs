//! Read-through cache in front of [`ManagementNodeFetcher`]: a cache hit returns without
//! ever contacting the management plane; a miss fetches under retry + circuit breaker,
//! populates the cache, and returns the fresh document. The same cache entry doubles as
//! the last-known-good fallback when every retry on a refresh is exhausted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use federator_common::{FederatorError, ManagementNodeId, RetryClass, RetryPolicy};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::fetcher::ManagementNodeFetcher;
use crate::service::ConfigService;

pub struct CachedConfigService<T> {
    fetcher: ManagementNodeFetcher<T>,
    path: String,
    retry_policy: RetryPolicy,
    cache: RwLock<HashMap<ManagementNodeId, Arc<T>>>,
}

impl<T> CachedConfigService<T> {
    pub fn new(fetcher: ManagementNodeFetcher<T>, path: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self {
            fetcher,
            path: path.into(),
            retry_policy,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch under retry + circuit breaker, falling back to whatever is already cached
    /// for `node_id` (set by a previous successful fetch) once every attempt is
    /// exhausted.
    async fn fetch_with_retry(&self, node_id: &ManagementNodeId) -> Result<Arc<T>, FederatorError>
    where
        T: DeserializeOwned,
    {
        let mut last_err = None;

        for attempt in 0..self.retry_policy.max_attempts() {
            match self.fetcher.fetch(&self.path).await {
                Ok(value) => {
                    let value = Arc::new(value);
                    self.cache.write().await.insert(node_id.clone(), value.clone());
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = err.retry_class() == RetryClass::Retryable;
                    last_err = Some(err);
                    if !retryable {
                        break;
                    }
                    if attempt + 1 < self.retry_policy.max_attempts() {
                        tokio::time::sleep(self.retry_policy.jittered_delay(attempt)).await;
                    }
                }
            }
        }

        if let Some(cached) = self.cache.read().await.get(node_id).cloned() {
            tracing::warn!(
                management_node_id = %node_id,
                "config fetch exhausted retries, serving last-known-good"
            );
            return Ok(cached);
        }

        Err(last_err.unwrap_or_else(|| {
            FederatorError::Configuration(format!("no config ever fetched for {node_id}"))
        }))
    }
}

#[async_trait]
impl<T> ConfigService<T> for CachedConfigService<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    async fn get_config(&self, node_id: &ManagementNodeId) -> Result<Arc<T>, FederatorError> {
        if let Some(cached) = self.cache.read().await.get(node_id).cloned() {
            return Ok(cached);
        }
        self.fetch_with_retry(node_id).await
    }

    async fn get_cached_configuration(&self, node_id: &ManagementNodeId) -> Option<Arc<T>> {
        self.cache.read().await.get(node_id).cloned()
    }

    async fn refresh_configurations(&self, node_id: &ManagementNodeId) -> Result<Arc<T>, FederatorError> {
        self.fetch_with_retry(node_id).await
    }

    async fn clear_cache(&self, node_id: &ManagementNodeId) {
        self.cache.write().await.remove(node_id);
    }
}
