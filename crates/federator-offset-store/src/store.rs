//! The `OffsetStore` trait: the durable key/value surface every job uses to remember how
//! far it got (a topic offset, a file byte position) and to stash small pieces of derived
//! state (the last-seen management-plane ETag, a cached token). Two key spaces, same
//! backend: offsets are read on every job tick, values are read far less often.

use async_trait::async_trait;
use federator_common::FederatorError;

#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// The last committed offset for `key`, or `None` if the job has never committed one.
    async fn get_offset(&self, key: &str) -> Result<Option<String>, FederatorError>;

    /// Durably record `value` as the new offset for `key`. Must be safe to call after
    /// every successfully forwarded record; implementations should make this cheap.
    async fn set_offset(&self, key: &str, value: &str) -> Result<(), FederatorError>;

    /// Read an arbitrary named value (not subject to the offset naming convention).
    async fn get_value(&self, key: &str) -> Result<Option<String>, FederatorError>;

    /// Write an arbitrary named value.
    async fn set_value(&self, key: &str, value: &str) -> Result<(), FederatorError>;

    /// A cheap round-trip used at startup to fail fast if the backend is unreachable,
    /// rather than discovering it on the first job tick.
    async fn ping(&self) -> Result<(), FederatorError>;
}
