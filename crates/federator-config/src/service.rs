//! The generic configuration-service seam every job type fetches its management-plane
//! document through: dynamic producer/consumer config, topic descriptors, file
//! descriptors all flow through the same read-through cache and retry/circuit-breaker
//! stack, parameterised only by the document type.

use std::sync::Arc;

use async_trait::async_trait;
use federator_common::{FederatorError, ManagementNodeId};

#[async_trait]
pub trait ConfigService<T>: Send + Sync {
    /// Read-through: a cache hit under `node_id` returns immediately without contacting
    /// the management plane; a miss fetches (under retry + circuit breaker), populates
    /// the cache, and returns the freshly fetched document.
    async fn get_config(&self, node_id: &ManagementNodeId) -> Result<Arc<T>, FederatorError>;

    /// The cached document for `node_id`, if any, without ever contacting the plane.
    async fn get_cached_configuration(&self, node_id: &ManagementNodeId) -> Option<Arc<T>>;

    /// Force a fetch from the management plane, bypassing any cached value, and refresh
    /// the cache with the result.
    async fn refresh_configurations(&self, node_id: &ManagementNodeId) -> Result<Arc<T>, FederatorError>;

    /// Drop the cached document for `node_id`, if any.
    async fn clear_cache(&self, node_id: &ManagementNodeId);
}
