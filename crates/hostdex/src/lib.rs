//! Cached search engine for host/network records.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hostdex::{Condition, MongoConfig, MongoDocumentStore, RedisCacheStore, RedisConfig, SearchService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> hostdex::Result<()> {
//!     let documents = Arc::new(MongoDocumentStore::connect(&MongoConfig::default()).await?);
//!     documents.ensure_indexes().await?;
//!     let cache = Arc::new(RedisCacheStore::connect(&RedisConfig::default()).await?);
//!
//!     let service = SearchService::new(documents, cache);
//!
//!     // Condition lookup: normalized, cached for 24 hours.
//!     let hosts = service.lookup(Condition::Asn, "AS1234").await?;
//!     println!("{} records", hosts.len());
//!
//!     // Free-text search, relevance-sorted.
//!     let hits = service.search("nginx").await?;
//!     println!("{} hits", hits.len());
//!
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/hostdex/0.1.0")]

// Re-export core types
pub use hostdex_core::*;

// Re-export store clients
pub use hostdex_store::{
    CacheStore, DocumentStore, MemoryCacheStore, MemoryDocumentStore, MongoConfig,
    MongoDocumentStore, RedisCacheStore, RedisConfig,
};

// Re-export the engine
pub use hostdex_engine::SearchService;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
