//! Redis-backed cache store.
//!
//! One set per cache key holding snapshot ids, one string key per snapshot
//! holding its serialized JSON. Membership order on reads is whatever the
//! server iterates, which is deliberately not the query's sort order.

use crate::cache::CacheStore;
use crate::config::RedisConfig;
use async_trait::async_trait;
use hostdex_core::{HostdexError, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Redis-backed [`CacheStore`].
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect to the cache store.
    ///
    /// # Errors
    ///
    /// Returns [`HostdexError::CacheStore`] if the URL is invalid or the
    /// connection cannot be established.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Wrap an existing connection manager.
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn set_len(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        conn.scard(key)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .sadd(key, member)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;
        debug!(key, "deleted cache set");
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .expire(key, ttl.as_secs().try_into().unwrap_or(i64::MAX))
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;
        Ok(())
    }

    async fn put_json(&self, id: &str, doc: &Value, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(doc)?;
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(id, payload, ttl.as_secs())
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;
        Ok(())
    }

    async fn get_json(&self, id: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn
            .get(id)
            .await
            .map_err(|e| HostdexError::CacheStore(e.to_string()))?;

        match payload {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }
}
