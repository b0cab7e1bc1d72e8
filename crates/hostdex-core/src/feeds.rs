//! Fixed query specs for the parameterless "latest" feeds.
//!
//! Feeds bypass the condition table: fixed match documents, include-style
//! projections, a 200-result cap, and literal cache keys.

use crate::query::{ExecutionMode, MatchExpr, Projection, QuerySpec, Sort, FEED_LIMIT};

/// Cache key for the latest-records feed.
pub const LATEST_DNS_KEY: &str = "latest_dns";
/// Cache key for the latest-prefixes feed.
pub const LATEST_CIDR_KEY: &str = "latest_cidr";
/// Cache key for the latest-addresses feed.
pub const LATEST_IPV4_KEY: &str = "latest_ipv4";
/// Cache key for the latest-ASNs feed.
pub const LATEST_ASN_KEY: &str = "latest_asn";

fn feed(match_expr: MatchExpr, projection: Projection) -> QuerySpec {
    QuerySpec {
        match_expr,
        projection,
        sort: Sort::RECENCY,
        limit: FEED_LIMIT,
        mode: ExecutionMode::Match,
    }
}

/// Most recently updated records that have not failed a scan.
#[must_use]
pub fn latest_dns() -> QuerySpec {
    feed(
        MatchExpr::All(vec![
            MatchExpr::Exists {
                path: "updated",
                exists: true,
            },
            MatchExpr::Exists {
                path: "scan_failed",
                exists: false,
            },
        ]),
        Projection::ExcludeId,
    )
}

/// Most recently seen announced prefixes with their country codes.
#[must_use]
pub fn latest_cidr() -> QuerySpec {
    feed(
        MatchExpr::Exists {
            path: "whois.asn_cidr",
            exists: true,
        },
        Projection::Fields(&["whois.asn_country_code", "whois.asn_cidr"]),
    )
}

/// Most recently seen A records with their country codes.
///
/// Consumers fan each address out to its own entry; see the engine.
#[must_use]
pub fn latest_ipv4() -> QuerySpec {
    feed(
        MatchExpr::Exists {
            path: "a_record",
            exists: true,
        },
        Projection::Fields(&["a_record", "country_code"]),
    )
}

/// Most recently seen ASNs with their country codes.
#[must_use]
pub fn latest_asn() -> QuerySpec {
    feed(
        MatchExpr::Exists {
            path: "whois.asn",
            exists: true,
        },
        Projection::Fields(&["whois.asn", "whois.asn_country_code"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feeds_cap_at_feed_limit() {
        for spec in [latest_dns(), latest_cidr(), latest_ipv4(), latest_asn()] {
            assert_eq!(spec.limit, FEED_LIMIT);
            assert_eq!(spec.sort, Sort::RECENCY);
            assert_eq!(spec.mode, ExecutionMode::Match);
        }
    }

    #[test]
    fn test_latest_dns_excludes_failed_scans() {
        let spec = latest_dns();
        assert_eq!(
            spec.match_expr,
            MatchExpr::All(vec![
                MatchExpr::Exists {
                    path: "updated",
                    exists: true,
                },
                MatchExpr::Exists {
                    path: "scan_failed",
                    exists: false,
                },
            ])
        );
    }

    #[test]
    fn test_latest_ipv4_projects_addresses_and_country() {
        assert_eq!(
            latest_ipv4().projection,
            Projection::Fields(&["a_record", "country_code"])
        );
    }
}
