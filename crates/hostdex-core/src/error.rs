use thiserror::Error;

/// Result type alias for hostdex operations
pub type Result<T> = std::result::Result<T, HostdexError>;

/// Errors that can occur while resolving or serving a lookup
#[derive(Error, Debug)]
pub enum HostdexError {
    /// The condition name is not part of the condition table
    #[error("unknown condition: {0}")]
    UnknownCondition(String),

    /// The raw value could not be normalized for its condition
    #[error("invalid value {value:?} for condition `{condition}`: {reason}")]
    InvalidValue {
        /// Condition the value was supplied for
        condition: &'static str,
        /// The offending raw value
        value: String,
        /// Why normalization failed
        reason: String,
    },

    /// The document store rejected or failed a query
    #[error("document store error: {0}")]
    DocumentStore(String),

    /// The cache store rejected or failed an operation
    #[error("cache store error: {0}")]
    CacheStore(String),

    /// Snapshot (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl HostdexError {
    /// Returns true if the error is a caller-input problem rather than a
    /// backing-store failure
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownCondition(_) | Self::InvalidValue { .. }
        )
    }

    /// Returns true if the error came from a backing store
    #[must_use]
    pub const fn is_store_error(&self) -> bool {
        matches!(self, Self::DocumentStore(_) | Self::CacheStore(_))
    }
}
