//! An in-process offset store for local development and tests. Nothing survives a
//! restart; production deployments use [`crate::redis_store::RedisOffsetStore`].

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use federator_common::FederatorError;

use crate::store::OffsetStore;

#[derive(Default)]
pub struct InMemoryOffsetStore {
    offsets: RwLock<HashMap<String, String>>,
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OffsetStore for InMemoryOffsetStore {
    async fn get_offset(&self, key: &str) -> Result<Option<String>, FederatorError> {
        Ok(self
            .offsets
            .read()
            .expect("poisoned offset map")
            .get(key)
            .cloned())
    }

    async fn set_offset(&self, key: &str, value: &str) -> Result<(), FederatorError> {
        self.offsets
            .write()
            .expect("poisoned offset map")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, FederatorError> {
        Ok(self
            .values
            .read()
            .expect("poisoned value map")
            .get(key)
            .cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), FederatorError> {
        self.values
            .write()
            .expect("poisoned value map")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn ping(&self) -> Result<(), FederatorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_offset_is_none() {
        let store = InMemoryOffsetStore::new();
        assert_eq!(store.get_offset("topic-a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryOffsetStore::new();
        store.set_offset("topic-a", "1024").await.unwrap();
        assert_eq!(store.get_offset("topic-a").await.unwrap(), Some("1024".to_string()));

        store.set_value("etag", "W/\"abc\"").await.unwrap();
        assert_eq!(store.get_value("etag").await.unwrap(), Some("W/\"abc\"".to_string()));
    }
}
