//! The canonical query descriptor produced by condition resolution.
//!
//! A [`QuerySpec`] is backend-neutral: the Mongo store translates it into a
//! literal aggregation pipeline, the in-memory store interprets it directly.
//! Both run the same five-stage shape — match, limit, computed display
//! fields, projection, sort (sort deliberately last, after the cap).

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Result cap for condition-based and free-text lookups.
pub const CONDITION_LIMIT: i64 = 30;

/// Result cap for the "latest" feeds.
pub const FEED_LIMIT: i64 = 200;

/// Maximum radius for near-point searches, in meters.
pub const MAX_GEO_DISTANCE_M: f64 = 50_000.0;

/// Display format for the computed human-readable timestamps.
pub const DISPLAY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stored date fields and the computed display field each one feeds.
///
/// Attached on every execution, regardless of what the caller asked for.
pub const DISPLAY_DATE_FIELDS: &[(&str, &str)] = &[
    ("created", "created_formatted"),
    ("updated", "updated_formatted"),
    ("domain_crawled", "domain_crawled_formatted"),
    ("header_scan_failed", "header_scan_failed_formatted"),
    ("ssl.not_after", "ssl.not_after_formatted"),
    ("ssl.not_before", "ssl.not_before_formatted"),
];

/// One query against the record collection, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// What to match.
    pub match_expr: MatchExpr,
    /// Which fields survive into the response.
    pub projection: Projection,
    /// Final ordering of the capped result set.
    pub sort: Sort,
    /// Result cap, applied before the sort.
    pub limit: i64,
    /// Which aggregation shape runs the match stage.
    pub mode: ExecutionMode,
}

impl QuerySpec {
    /// Standard recency-sorted condition query: match, drop `_id`,
    /// newest-first, capped at [`CONDITION_LIMIT`].
    #[must_use]
    pub fn condition(match_expr: MatchExpr) -> Self {
        Self {
            match_expr,
            projection: Projection::ExcludeId,
            sort: Sort::RECENCY,
            limit: CONDITION_LIMIT,
            mode: ExecutionMode::Match,
        }
    }
}

/// Backend-neutral match document.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchExpr {
    /// Field equals the value (for array fields: any element equals it).
    Eq {
        /// Dotted field path
        path: &'static str,
        /// Value to compare against
        value: Value,
    },
    /// Array field contains the value.
    Contains {
        /// Dotted field path
        path: &'static str,
        /// Element to look for
        value: Value,
    },
    /// Stored date at or after the instant.
    DateGte {
        /// Dotted field path
        path: &'static str,
        /// Lower bound (inclusive)
        at: DateTime<Utc>,
    },
    /// Stored date at or before the instant.
    DateLte {
        /// Dotted field path
        path: &'static str,
        /// Upper bound (inclusive)
        at: DateTime<Utc>,
    },
    /// Field presence test.
    Exists {
        /// Dotted field path
        path: &'static str,
        /// Whether the field must be present or absent
        exists: bool,
    },
    /// Every sub-expression must match.
    All(Vec<MatchExpr>),
    /// At least one sub-expression must match.
    Any(Vec<MatchExpr>),
    /// Full-text search over the indexed text fields.
    Text(String),
}

/// Which aggregation shape runs the matching stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    /// Exact/field matching.
    Match,
    /// Full-text search with relevance scoring.
    Text,
    /// Spherical near-point search.
    GeoNear {
        /// Latitude of the search origin
        lat: f64,
        /// Longitude of the search origin
        lon: f64,
        /// Maximum distance from the origin, in meters
        max_distance_m: f64,
    },
}

impl ExecutionMode {
    /// Returns true for full-text execution.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

/// Which fields survive projection. The internal `_id` never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Everything except `_id`.
    ExcludeId,
    /// Only the listed paths (and never `_id`).
    Fields(&'static [&'static str]),
}

/// Final ordering of the capped result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    /// Sort on a stored field.
    Field {
        /// Dotted field path
        path: &'static str,
        /// Newest/largest first when true
        descending: bool,
    },
    /// Descending relevance score; full-text mode only, the one place
    /// freshness is not the tie-break.
    TextScore,
}

impl Sort {
    /// Recency-first: `updated` descending.
    pub const RECENCY: Self = Self::Field {
        path: "updated",
        descending: true,
    };
}
