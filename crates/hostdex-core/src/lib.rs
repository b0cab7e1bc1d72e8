//! Core types for the hostdex cached record-search engine.
//!
//! This crate holds the pure, I/O-free part of the system:
//!
//! - **Conditions**: the closed [`Condition`] table and its resolver,
//!   turning a symbolic condition plus raw value into a [`QuerySpec`]
//! - **Query model**: the backend-neutral [`QuerySpec`]/[`MatchExpr`]
//!   descriptor both store backends execute
//! - **Feeds**: fixed specs for the parameterless "latest" feeds
//! - **Key sanitization**: deterministic cache-key fragments
//! - **Errors**: [`HostdexError`] and the [`Result`] alias

#![doc(html_root_url = "https://docs.rs/hostdex-core/0.1.0")]

mod condition;
mod error;
pub mod feeds;
mod query;
mod sanitize;

pub use condition::{resolve, resolve_text, Condition, ResolvedQuery};
pub use error::{HostdexError, Result};
pub use query::{
    ExecutionMode, MatchExpr, Projection, QuerySpec, Sort, CONDITION_LIMIT, DISPLAY_DATE_FIELDS,
    DISPLAY_TIME_FORMAT, FEED_LIMIT, MAX_GEO_DISTANCE_M,
};
pub use sanitize::sanitize_key;
