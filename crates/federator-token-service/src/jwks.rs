//! A small JWKS cache: fetch the key set from the IdP's `jwks_uri`, keep it around for a
//! TTL, and refetch on a cache miss in case the IdP rotated keys since the last fetch.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use federator_common::FederatorError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

struct Cached {
    fetched_at: Instant,
    keys: HashMap<String, DecodingKey>,
}

pub struct JwksCache {
    jwks_url: String,
    ttl: Duration,
    http: reqwest::Client,
    cached: Mutex<Option<Cached>>,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>, http: reqwest::Client, ttl: Duration) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            ttl,
            http,
            cached: Mutex::new(None),
        }
    }

    /// Look up the decoding key for `kid`, refreshing the cache if it is stale or the
    /// key is missing from the cached set (covers key rotation between fetches).
    pub async fn key_for(&self, kid: &str) -> Result<DecodingKey, FederatorError> {
        if let Some(key) = self.cached_key(kid) {
            return Ok(key);
        }
        self.refresh().await?;
        self.cached_key(kid)
            .ok_or_else(|| FederatorError::TokenInvalid(format!("unknown signing key id: {kid}")))
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        let guard = self.cached.lock().expect("poisoned jwks cache");
        let cached = guard.as_ref()?;
        if cached.fetched_at.elapsed() > self.ttl {
            return None;
        }
        cached.keys.get(kid).cloned()
    }

    async fn refresh(&self) -> Result<(), FederatorError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| FederatorError::TokenFetch {
                management_node_id: "jwks".to_string(),
                source: e.into(),
            })?;

        let jwk_set: JwkSet = response
            .error_for_status()
            .map_err(|e| FederatorError::TokenFetch {
                management_node_id: "jwks".to_string(),
                source: e.into(),
            })?
            .json()
            .await
            .map_err(|e| FederatorError::TokenInvalid(format!("malformed jwks response: {e}")))?;

        let mut keys = HashMap::with_capacity(jwk_set.keys.len());
        for jwk in jwk_set.keys {
            let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
                .map_err(|e| FederatorError::TokenInvalid(format!("malformed jwk: {e}")))?;
            keys.insert(jwk.kid, key);
        }

        *self.cached.lock().expect("poisoned jwks cache") = Some(Cached {
            fetched_at: Instant::now(),
            keys,
        });
        Ok(())
    }
}
