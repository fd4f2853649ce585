//! Redis-backed offset store. Offsets live under an `offset:` prefix and values under a
//! `value:` prefix in the same keyspace, mirroring the two-namespace split the trait
//! exposes. Every call runs under a fixed timeout so a stalled Redis connection fails a
//! job tick instead of hanging it.

use std::time::Duration;

use async_trait::async_trait;
use federator_common::FederatorError;
use redis::AsyncCommands;
use tokio::time::timeout;

use crate::encryption::Cipher;
use crate::store::OffsetStore;

const REDIS_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RedisOffsetStore {
    client: redis::Client,
    cipher: Option<Cipher>,
}

impl RedisOffsetStore {
    pub fn new(addr: &str, cipher: Option<Cipher>) -> Result<Self, FederatorError> {
        let client = redis::Client::open(addr)
            .map_err(|e| FederatorError::Configuration(format!("invalid redis url: {e}")))?;
        Ok(Self { client, cipher })
    }

    fn offset_key(key: &str) -> String {
        format!("offset:{key}")
    }

    fn value_key(key: &str) -> String {
        format!("value:{key}")
    }

    async fn read(&self, redis_key: String) -> Result<Option<String>, FederatorError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?;

        let fut = conn.get::<_, Option<String>>(redis_key);
        let raw = timeout(REDIS_TIMEOUT, fut)
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?;

        match (raw, &self.cipher) {
            (Some(encoded), Some(cipher)) => Ok(Some(cipher.decrypt(&encoded)?)),
            (Some(plain), None) => Ok(Some(plain)),
            (None, _) => Ok(None),
        }
    }

    async fn write(&self, redis_key: String, value: &str) -> Result<(), FederatorError> {
        let payload = match &self.cipher {
            Some(cipher) => cipher.encrypt(value)?,
            None => value.to_string(),
        };

        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?;

        let fut = conn.set::<_, _, ()>(redis_key, payload);
        timeout(REDIS_TIMEOUT, fut)
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))
    }
}

#[async_trait]
impl OffsetStore for RedisOffsetStore {
    async fn get_offset(&self, key: &str) -> Result<Option<String>, FederatorError> {
        self.read(Self::offset_key(key)).await
    }

    async fn set_offset(&self, key: &str, value: &str) -> Result<(), FederatorError> {
        self.write(Self::offset_key(key), value).await
    }

    async fn get_value(&self, key: &str) -> Result<Option<String>, FederatorError> {
        self.read(Self::value_key(key)).await
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), FederatorError> {
        self.write(Self::value_key(key), value).await
    }

    async fn ping(&self) -> Result<(), FederatorError> {
        let mut conn = self
            .client
            .get_async_connection()
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?;
        let cmd = redis::cmd("PING");
        let fut = cmd.query_async::<_, String>(&mut conn);
        timeout(REDIS_TIMEOUT, fut)
            .await
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?
            .map_err(|e| FederatorError::OffsetStoreUnreachable(e.into()))?;
        Ok(())
    }
}
