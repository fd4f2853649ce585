//! Management-plane configuration fetching: a hand-rolled sliding-window circuit
//! breaker, an HTTP fetcher with the 401/4xx/5xx handling policy, and a read-through
//! cache that degrades to the last-known-good document under sustained failure.

pub mod cache;
pub mod circuit_breaker;
pub mod fetcher;
pub mod service;

pub use cache::CachedConfigService;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use fetcher::ManagementNodeFetcher;
pub use service::ConfigService;
