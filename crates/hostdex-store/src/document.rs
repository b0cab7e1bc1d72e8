//! The document-store seam.

use async_trait::async_trait;
use hostdex_core::{QuerySpec, Result};
use serde_json::Value;

/// Executes a [`QuerySpec`] against the record collection.
///
/// Implementations run the uniform pipeline shape — match stage, result
/// cap, computed display fields, projection, sort — and return the result
/// documents as JSON-serializable values, ordered by the spec's sort.
///
/// The client is injected into the engine rather than held as ambient
/// process state, so tests can swap in the in-memory implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run the query and collect its documents.
    ///
    /// # Errors
    ///
    /// Returns [`hostdex_core::HostdexError::DocumentStore`] if the backing
    /// store is unreachable or rejects the query. No retries are attempted.
    async fn run(&self, spec: &QuerySpec) -> Result<Vec<Value>>;
}
