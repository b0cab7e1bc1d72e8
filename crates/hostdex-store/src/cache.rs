//! The cache-store seam.

use async_trait::async_trait;
use hostdex_core::Result;
use serde_json::Value;
use std::time::Duration;

/// TTL key-value service holding cached result sets.
///
/// Two key families: named sets of snapshot ids (one per cache key), and
/// per-id JSON snapshots. Both expire independently; the engine refreshes
/// both TTLs on every population pass.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Number of members in the named set (0 if absent or expired).
    async fn set_len(&self, key: &str) -> Result<u64>;

    /// All members of the named set, in the store's native iteration order.
    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    /// Add a member to the named set, creating it if needed.
    async fn set_add(&self, key: &str, member: &str) -> Result<()>;

    /// Delete the named set.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Reset the key's TTL.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Write a JSON snapshot under an id, with its own TTL.
    async fn put_json(&self, id: &str, doc: &Value, ttl: Duration) -> Result<()>;

    /// Read a JSON snapshot by id; `None` once expired or never written.
    async fn get_json(&self, id: &str) -> Result<Option<Value>>;
}
