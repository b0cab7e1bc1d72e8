//! The cache-aside coordinator.
//!
//! Every lookup resolves to a `QuerySpec` plus cache key, then takes one of
//! two paths. Cold (no cached members): populate the cache as a side
//! effect, then independently re-run the query for the response — the cold
//! answer is always the freshly executed, correctly sorted result, at the
//! cost of running the query twice per miss. Warm: hydrate each member id
//! back into its snapshot, in the cache's native set order rather than the
//! spec's sort.
//!
//! Population is not exclusive. Concurrent misses on one key each execute
//! and each write members; membership is additive and snapshots immutable,
//! so racing costs duplicates, never corruption.

use hostdex_core::{feeds, resolve, resolve_text, Condition, QuerySpec, Result};
use hostdex_store::{CacheStore, DocumentStore};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifetime of a cached result set and of each snapshot in it.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cached lookup service over a document store and a cache store.
#[derive(Clone)]
pub struct SearchService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    documents: Arc<dyn DocumentStore>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl SearchService {
    /// Create a service with the default 24-hour cache TTL.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self::with_ttl(documents, cache, DEFAULT_CACHE_TTL)
    }

    /// Create a service with a custom cache TTL.
    #[must_use]
    pub fn with_ttl(
        documents: Arc<dyn DocumentStore>,
        cache: Arc<dyn CacheStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                documents,
                cache,
                ttl,
            }),
        }
    }

    /// Look up records matching a condition.
    ///
    /// Unresolvable-but-wellformed input (malformed `loc` coordinates)
    /// returns an empty vec. An empty vec is also the not-found outcome;
    /// neither is an error.
    ///
    /// # Errors
    ///
    /// Propagates hard validation failures (`port`, `before`/`after`) and
    /// backing-store failures. No retries.
    pub async fn lookup(&self, condition: Condition, raw: &str) -> Result<Vec<Value>> {
        let Some(resolved) = resolve(condition, raw)? else {
            debug!(condition = %condition, raw, "unresolvable value, empty result");
            return Ok(Vec::new());
        };
        self.fetch_cached(&resolved.spec, &resolved.cache_key).await
    }

    /// [`lookup`](Self::lookup) with a condition name from the routing
    /// layer.
    ///
    /// # Errors
    ///
    /// Additionally returns [`hostdex_core::HostdexError::UnknownCondition`]
    /// for names outside the condition table.
    pub async fn lookup_named(&self, name: &str, raw: &str) -> Result<Vec<Value>> {
        let condition = Condition::from_str(name)?;
        self.lookup(condition, raw).await
    }

    /// Free-text search over the indexed text fields, relevance-sorted.
    pub async fn search(&self, query: &str) -> Result<Vec<Value>> {
        let resolved = resolve_text(query);
        self.fetch_cached(&resolved.spec, &resolved.cache_key).await
    }

    /// Most recently updated records that have not failed a scan.
    pub async fn latest_dns(&self) -> Result<Vec<Value>> {
        self.fetch_cached(&feeds::latest_dns(), feeds::LATEST_DNS_KEY)
            .await
    }

    /// Most recently seen announced prefixes with country codes.
    pub async fn latest_cidr(&self) -> Result<Vec<Value>> {
        self.fetch_cached(&feeds::latest_cidr(), feeds::LATEST_CIDR_KEY)
            .await
    }

    /// Most recently seen ASNs with country codes.
    pub async fn latest_asn(&self) -> Result<Vec<Value>> {
        self.fetch_cached(&feeds::latest_asn(), feeds::LATEST_ASN_KEY)
            .await
    }

    /// Most recently seen A records, one entry per address.
    ///
    /// Each address in a record's `a_record` array becomes its own
    /// `{a_record, country_code}` entry; records without the array never
    /// appear (the feed filters on its presence).
    pub async fn latest_ipv4(&self) -> Result<Vec<Value>> {
        let docs = self
            .fetch_cached(&feeds::latest_ipv4(), feeds::LATEST_IPV4_KEY)
            .await?;

        let mut out = Vec::new();
        for doc in docs {
            let country = doc.get("country_code").cloned().unwrap_or(Value::Null);
            if let Some(addresses) = doc.get("a_record").and_then(Value::as_array) {
                for address in addresses {
                    out.push(json!({
                        "a_record": address,
                        "country_code": country,
                    }));
                }
            }
        }
        Ok(out)
    }

    /// Force repopulation of a condition's cached result set: the existing
    /// entry is deleted and rebuilt from a fresh query.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`lookup`](Self::lookup).
    pub async fn refresh(&self, condition: Condition, raw: &str) -> Result<()> {
        let Some(resolved) = resolve(condition, raw)? else {
            return Ok(());
        };
        self.populate(&resolved.spec, &resolved.cache_key, true)
            .await
    }

    /// Cache-aside read: cold path populates then re-executes, warm path
    /// hydrates members.
    async fn fetch_cached(&self, spec: &QuerySpec, key: &str) -> Result<Vec<Value>> {
        let members = self.inner.cache.set_len(key).await?;

        if members == 0 {
            debug!(key, "cache miss, populating");
            self.populate(spec, key, false).await?;
            // The response comes from a second, independent execution, not
            // from reading back what was just written.
            return self.inner.documents.run(spec).await;
        }

        debug!(key, members, "cache hit, hydrating");
        let ids = self.inner.cache.set_members(key).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.inner.cache.get_json(&id).await? {
                Some(snapshot) => out.push(snapshot),
                // A member can outlive its snapshot when a racing
                // population refreshed the set after this snapshot was
                // written. Skip it; the set itself expires soon enough.
                None => warn!(key, id = %id, "snapshot missing for cached member"),
            }
        }
        Ok(out)
    }

    /// Execute the query and fan its documents out into the cache: one
    /// snapshot per document under a fresh unique id, each id added to the
    /// key's member set. Both TTLs are refreshed on every pass.
    async fn populate(&self, spec: &QuerySpec, key: &str, reset: bool) -> Result<()> {
        if reset {
            self.inner.cache.delete(key).await?;
        }

        let docs = self.inner.documents.run(spec).await?;
        debug!(key, count = docs.len(), reset, "populating cache");

        for doc in &docs {
            let id = Uuid::new_v4().to_string();
            self.inner.cache.put_json(&id, doc, self.inner.ttl).await?;
            self.inner.cache.set_add(key, &id).await?;
            self.inner.cache.expire(key, self.inner.ttl).await?;
        }

        Ok(())
    }
}
