//! Cache-aside lookup engine for hostdex.
//!
//! [`SearchService`] ties the condition table to the two store seams:
//! condition lookups, free-text search, and the "latest" feeds, each served
//! through a 24-hour cache-aside layer in front of the document store.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostdex_engine::SearchService;
//! use hostdex_core::Condition;
//! use hostdex_store::{MongoConfig, MongoDocumentStore, RedisCacheStore, RedisConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> hostdex_core::Result<()> {
//! let documents = Arc::new(MongoDocumentStore::connect(&MongoConfig::default()).await?);
//! let cache = Arc::new(RedisCacheStore::connect(&RedisConfig::default()).await?);
//! let service = SearchService::new(documents, cache);
//!
//! let hits = service.lookup(Condition::Asn, "AS1234").await?;
//! println!("{} records", hits.len());
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/hostdex-engine/0.1.0")]

mod service;

pub use service::SearchService;
