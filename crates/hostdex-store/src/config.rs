//! Backing-store client configuration.

/// Configuration for the MongoDB-backed document store.
#[derive(Debug, Clone)]
pub struct MongoConfig {
    /// Connection URI
    pub uri: String,

    /// Database name
    pub database: String,

    /// Collection holding the host/network records
    pub collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: String::from("mongodb://127.0.0.1:27017"),
            database: String::from("hostdex"),
            collection: String::from("dns"),
        }
    }
}

impl MongoConfig {
    /// Create a configuration for the given connection URI
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Set the database name
    #[must_use]
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = name.into();
        self
    }

    /// Set the collection name
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }
}

/// Configuration for the Redis-backed cache store.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://127.0.0.1:6379"),
        }
    }
}

impl RedisConfig {
    /// Create a configuration for the given connection URL
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}
