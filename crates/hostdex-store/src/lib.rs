//! Backing-store clients for hostdex.
//!
//! Two seams, each with a production backend and an in-memory double:
//!
//! - [`DocumentStore`]: runs a `QuerySpec` against the record collection.
//!   Backed by MongoDB ([`MongoDocumentStore`]) or memory
//!   ([`MemoryDocumentStore`]).
//! - [`CacheStore`]: TTL sets of snapshot ids plus per-id JSON snapshots.
//!   Backed by Redis ([`RedisCacheStore`]) or memory ([`MemoryCacheStore`]).
//!
//! Both clients are handed to the engine explicitly; nothing here is
//! process-global.

#![doc(html_root_url = "https://docs.rs/hostdex-store/0.1.0")]

mod cache;
mod config;
mod document;
mod memory;
mod mongo;
mod redis_store;

pub use cache::CacheStore;
pub use config::{MongoConfig, RedisConfig};
pub use document::DocumentStore;
pub use memory::{MemoryCacheStore, MemoryDocumentStore};
pub use mongo::{build_pipeline, MongoDocumentStore};
pub use redis_store::RedisCacheStore;
