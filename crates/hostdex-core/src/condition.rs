//! The condition table: symbolic condition + raw value → [`QuerySpec`].
//!
//! Each condition fixes the matched field path(s), how the raw value is
//! normalized before matching, and the cache-key prefix. Everything sorts
//! newest-first at 30 results except `loc` (near-point) and free-text
//! search (relevance-sorted).

use crate::error::{HostdexError, Result};
use crate::query::{
    ExecutionMode, MatchExpr, Projection, QuerySpec, Sort, CONDITION_LIMIT, MAX_GEO_DISTANCE_M,
};
use crate::sanitize::sanitize_key;
use chrono::NaiveDateTime;
use serde_json::{json, Value};
use std::str::FromStr;

/// Datetime format accepted by the `before`/`after` conditions.
const CONDITION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named search condition.
///
/// Closed set: the routing layer parses names via [`FromStr`], everything
/// past that boundary is exhaustively matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// WHOIS regional registry (`whois.asn_registry`)
    Registry,
    /// Open port number (`ports.port`)
    Port,
    /// HTTP status line (`header.status`)
    Status,
    /// TLS subject CN or SAN entry
    Ssl,
    /// Certificates valid at or after a datetime (`ssl.not_before`)
    Before,
    /// Certificates expiring at or before a datetime (`ssl.not_after`)
    After,
    /// Certificate-authority issuer URL (`ssl.ca_issuers`)
    Ca,
    /// Certificate issuer organization or CN
    Issuer,
    /// Certificate issuer organizational unit
    Unit,
    /// OCSP responder URL (`ssl.ocsp`)
    Ocsp,
    /// CRL distribution point (`ssl.crl_distribution_points`)
    Crl,
    /// `X-Powered-By` header value
    Service,
    /// Country code, required in both geo and WHOIS data
    Country,
    /// Geolocated state/region (`geo.state`)
    State,
    /// Geolocated city (`geo.city`)
    City,
    /// Near a `lat,lon` point, 50 km radius
    Loc,
    /// Service banner (`banner`)
    Banner,
    /// Autonomous system number (`whois.asn`)
    Asn,
    /// AS description (`whois.asn_description`)
    Org,
    /// Announced prefix (`whois.asn_cidr`)
    Cidr,
    /// CNAME target (`cname_record.target`)
    Cname,
    /// MX exchange (`mx_record.exchange`)
    Mx,
    /// Delegated nameserver (`ns_record`)
    Ns,
    /// `Server` header value
    Server,
    /// Apex domain (`domain`)
    Site,
    /// IPv4 address in the A records
    Ipv4,
    /// IPv6 address in the AAAA records
    Ipv6,
}

impl Condition {
    /// The condition's symbolic name, as used in cache-key prefixes.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Port => "port",
            Self::Status => "status",
            Self::Ssl => "ssl",
            Self::Before => "before",
            Self::After => "after",
            Self::Ca => "ca",
            Self::Issuer => "issuer",
            Self::Unit => "unit",
            Self::Ocsp => "ocsp",
            Self::Crl => "crl",
            Self::Service => "service",
            Self::Country => "country",
            Self::State => "state",
            Self::City => "city",
            Self::Loc => "loc",
            Self::Banner => "banner",
            Self::Asn => "asn",
            Self::Org => "org",
            Self::Cidr => "cidr",
            Self::Cname => "cname",
            Self::Mx => "mx",
            Self::Ns => "ns",
            Self::Server => "server",
            Self::Site => "site",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }

    /// All conditions, in table order.
    pub const ALL: &'static [Self] = &[
        Self::Registry,
        Self::Port,
        Self::Status,
        Self::Ssl,
        Self::Before,
        Self::After,
        Self::Ca,
        Self::Issuer,
        Self::Unit,
        Self::Ocsp,
        Self::Crl,
        Self::Service,
        Self::Country,
        Self::State,
        Self::City,
        Self::Loc,
        Self::Banner,
        Self::Asn,
        Self::Org,
        Self::Cidr,
        Self::Cname,
        Self::Mx,
        Self::Ns,
        Self::Server,
        Self::Site,
        Self::Ipv4,
        Self::Ipv6,
    ];
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Condition {
    type Err = HostdexError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| HostdexError::UnknownCondition(s.to_string()))
    }
}

/// A resolved condition lookup: the query to run and the cache key that
/// identifies its result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    /// The query descriptor
    pub spec: QuerySpec,
    /// `"<condition>-<sanitized value>"`
    pub cache_key: String,
}

impl ResolvedQuery {
    fn new(condition: Condition, normalized: &str, spec: QuerySpec) -> Self {
        Self {
            spec,
            cache_key: format!("{}-{}", condition.name(), sanitize_key(normalized)),
        }
    }
}

/// Resolve a condition and raw value into a [`ResolvedQuery`].
///
/// Returns `Ok(None)` for malformed `loc` input: bad coordinates soft-fail
/// to an empty result. Malformed `port` and `before`/`after` values are
/// hard errors instead; that asymmetry is part of the contract.
///
/// # Errors
///
/// Returns [`HostdexError::InvalidValue`] when `port` is not an integer or
/// a `before`/`after` datetime does not parse.
pub fn resolve(condition: Condition, raw: &str) -> Result<Option<ResolvedQuery>> {
    let spec = match condition {
        Condition::Registry => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "whois.asn_registry")
        }
        Condition::Port => {
            let port: i64 = raw.trim().parse().map_err(|e| HostdexError::InvalidValue {
                condition: condition.name(),
                value: raw.to_string(),
                reason: format!("not an integer: {e}"),
            })?;
            ResolvedQuery::new(
                condition,
                raw,
                QuerySpec::condition(MatchExpr::Eq {
                    path: "ports.port",
                    value: json!(port),
                }),
            )
        }
        // Status lines are matched verbatim, no case fold.
        Condition::Status => eq_condition(condition, raw, "header.status"),
        Condition::Ssl => {
            let v = raw.to_lowercase();
            ResolvedQuery::new(
                condition,
                &v,
                QuerySpec::condition(MatchExpr::Any(vec![
                    MatchExpr::Eq {
                        path: "ssl.subject.common_name",
                        value: json!(v),
                    },
                    MatchExpr::Contains {
                        path: "ssl.subject_alt_names",
                        value: json!(v),
                    },
                ])),
            )
        }
        Condition::Before => date_condition(condition, raw, "ssl.not_before", true)?,
        Condition::After => date_condition(condition, raw, "ssl.not_after", false)?,
        Condition::Ca => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "ssl.ca_issuers")
        }
        Condition::Issuer => {
            let v = raw.to_lowercase();
            ResolvedQuery::new(
                condition,
                &v,
                QuerySpec::condition(MatchExpr::Any(vec![
                    MatchExpr::Eq {
                        path: "ssl.issuer.organization_name",
                        value: json!(v),
                    },
                    MatchExpr::Eq {
                        path: "ssl.issuer.common_name",
                        value: json!(v),
                    },
                ])),
            )
        }
        Condition::Unit => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "ssl.issuer.organizational_unit_name")
        }
        Condition::Ocsp => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "ssl.ocsp")
        }
        Condition::Crl => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "ssl.crl_distribution_points")
        }
        Condition::Service => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "header.x-powered-by")
        }
        Condition::Country => {
            // Conjunctive on purpose: the geolocation and WHOIS country
            // codes must both equal the input. Matching on one source
            // alone is not enough.
            let v = raw.to_uppercase();
            ResolvedQuery::new(
                condition,
                &v,
                QuerySpec::condition(MatchExpr::All(vec![
                    MatchExpr::Eq {
                        path: "geo.country_code",
                        value: json!(v),
                    },
                    MatchExpr::Eq {
                        path: "whois.asn_country_code",
                        value: json!(v),
                    },
                ])),
            )
        }
        Condition::State => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "geo.state")
        }
        Condition::City => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "geo.city")
        }
        Condition::Loc => {
            let key_value = raw.to_lowercase();
            // Malformed coordinates soft-fail to an empty result.
            let Some((lat, lon)) = parse_lat_lon(raw) else {
                return Ok(None);
            };
            ResolvedQuery::new(
                condition,
                &key_value,
                QuerySpec {
                    match_expr: MatchExpr::All(Vec::new()),
                    projection: Projection::ExcludeId,
                    sort: Sort::RECENCY,
                    limit: CONDITION_LIMIT,
                    mode: ExecutionMode::GeoNear {
                        lat,
                        lon,
                        max_distance_m: MAX_GEO_DISTANCE_M,
                    },
                },
            )
        }
        Condition::Banner => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "banner")
        }
        Condition::Asn => {
            // "AS1234" and "as1234:" both normalize to "1234".
            let v: String = raw
                .to_lowercase()
                .chars()
                .filter(|c| !c.is_ascii_alphabetic() && *c != ':')
                .collect();
            eq_condition(condition, &v, "whois.asn")
        }
        Condition::Org => {
            let v: String = raw
                .to_lowercase()
                .chars()
                .filter(|c| *c != '(' && *c != ')')
                .collect();
            eq_condition(condition, &v, "whois.asn_description")
        }
        Condition::Cidr => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "whois.asn_cidr")
        }
        Condition::Cname => contains_condition(condition, &raw.to_lowercase(), "cname_record.target"),
        Condition::Mx => contains_condition(condition, &raw.to_lowercase(), "mx_record.exchange"),
        Condition::Ns => contains_condition(condition, &raw.to_lowercase(), "ns_record"),
        Condition::Server => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "header.server")
        }
        Condition::Site => {
            let v = raw.to_lowercase();
            eq_condition(condition, &v, "domain")
        }
        Condition::Ipv4 => contains_condition(condition, &raw.to_lowercase(), "a_record"),
        Condition::Ipv6 => contains_condition(condition, &raw.to_lowercase(), "aaaa_record"),
    };

    Ok(Some(spec))
}

/// Resolve a free-text search query. Bypasses the condition table: text
/// execution mode, relevance-sorted, cache-keyed under the `all-` prefix.
#[must_use]
pub fn resolve_text(raw: &str) -> ResolvedQuery {
    ResolvedQuery {
        spec: QuerySpec {
            match_expr: MatchExpr::Text(raw.to_string()),
            projection: Projection::ExcludeId,
            sort: Sort::TextScore,
            limit: CONDITION_LIMIT,
            mode: ExecutionMode::Text,
        },
        cache_key: format!("all-{}", sanitize_key(&raw.to_lowercase())),
    }
}

fn eq_condition(condition: Condition, value: &str, path: &'static str) -> ResolvedQuery {
    ResolvedQuery::new(
        condition,
        value,
        QuerySpec::condition(MatchExpr::Eq {
            path,
            value: Value::String(value.to_string()),
        }),
    )
}

fn contains_condition(condition: Condition, value: &str, path: &'static str) -> ResolvedQuery {
    ResolvedQuery::new(
        condition,
        value,
        QuerySpec::condition(MatchExpr::Contains {
            path,
            value: Value::String(value.to_string()),
        }),
    )
}

fn date_condition(
    condition: Condition,
    raw: &str,
    path: &'static str,
    gte: bool,
) -> Result<ResolvedQuery> {
    let parsed = NaiveDateTime::parse_from_str(raw, CONDITION_TIME_FORMAT).map_err(|e| {
        HostdexError::InvalidValue {
            condition: condition.name(),
            value: raw.to_string(),
            reason: format!("expected `{CONDITION_TIME_FORMAT}`: {e}"),
        }
    })?;
    let at = parsed.and_utc();

    let expr = if gte {
        MatchExpr::DateGte { path, at }
    } else {
        MatchExpr::DateLte { path, at }
    };

    Ok(ResolvedQuery::new(
        condition,
        &raw.to_lowercase(),
        QuerySpec::condition(expr),
    ))
}

fn parse_lat_lon(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_names_round_trip() {
        for c in Condition::ALL {
            assert_eq!(Condition::from_str(c.name()).unwrap(), *c);
        }
        assert!(Condition::from_str("nonsense").is_err());
    }

    #[test]
    fn test_asn_strips_letters_and_colons() {
        let resolved = resolve(Condition::Asn, "AS1234").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::Eq {
                path: "whois.asn",
                value: json!("1234"),
            }
        );
        assert_eq!(resolved.cache_key, "asn-1234");
    }

    #[test]
    fn test_country_requires_both_sources() {
        let resolved = resolve(Condition::Country, "us").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::All(vec![
                MatchExpr::Eq {
                    path: "geo.country_code",
                    value: json!("US"),
                },
                MatchExpr::Eq {
                    path: "whois.asn_country_code",
                    value: json!("US"),
                },
            ])
        );
    }

    #[test]
    fn test_loc_soft_fails_on_bad_coordinates() {
        assert!(resolve(Condition::Loc, "not,numbers").unwrap().is_none());
        assert!(resolve(Condition::Loc, "48.85").unwrap().is_none());
        assert!(resolve(Condition::Loc, "").unwrap().is_none());
    }

    #[test]
    fn test_loc_parses_lat_lon_pair() {
        let resolved = resolve(Condition::Loc, "48.85,2.35").unwrap().unwrap();
        assert_eq!(
            resolved.spec.mode,
            ExecutionMode::GeoNear {
                lat: 48.85,
                lon: 2.35,
                max_distance_m: MAX_GEO_DISTANCE_M,
            }
        );
        assert_eq!(resolved.cache_key, "loc-48-85-2-35");
    }

    #[test]
    fn test_port_hard_fails_on_non_integer() {
        let err = resolve(Condition::Port, "abc").unwrap_err();
        assert!(err.is_invalid_input());
        assert!(matches!(err, HostdexError::InvalidValue { condition: "port", .. }));
    }

    #[test]
    fn test_port_parses_integer() {
        let resolved = resolve(Condition::Port, "443").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::Eq {
                path: "ports.port",
                value: json!(443),
            }
        );
    }

    #[test]
    fn test_ca_lookup_shape() {
        let resolved = resolve(Condition::Ca, "1234").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::Eq {
                path: "ssl.ca_issuers",
                value: json!("1234"),
            }
        );
        assert_eq!(resolved.spec.limit, CONDITION_LIMIT);
        assert_eq!(resolved.spec.sort, Sort::RECENCY);
        assert_eq!(resolved.cache_key, "ca-1234");
    }

    #[test]
    fn test_before_parses_datetime() {
        let resolved = resolve(Condition::Before, "2023-01-01 00:00:00")
            .unwrap()
            .unwrap();
        assert!(matches!(
            resolved.spec.match_expr,
            MatchExpr::DateGte { path: "ssl.not_before", .. }
        ));
        // Colons and spaces never reach the key as-is.
        assert_eq!(resolved.cache_key, "before-2023-01-01-00-00-00");
    }

    #[test]
    fn test_before_hard_fails_on_bad_datetime() {
        assert!(resolve(Condition::Before, "yesterday").is_err());
    }

    #[test]
    fn test_org_strips_parentheses() {
        let resolved = resolve(Condition::Org, "Example (EX)").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::Eq {
                path: "whois.asn_description",
                value: json!("example ex"),
            }
        );
    }

    #[test]
    fn test_ipv6_is_array_membership() {
        let resolved = resolve(Condition::Ipv6, "2001:DB8::1").unwrap().unwrap();
        assert_eq!(
            resolved.spec.match_expr,
            MatchExpr::Contains {
                path: "aaaa_record",
                value: json!("2001:db8::1"),
            }
        );
        assert_eq!(resolved.cache_key, "ipv6-2001-db8--1");
    }

    #[test]
    fn test_text_search_shape() {
        let resolved = resolve_text("nginx Paris");
        assert_eq!(resolved.spec.mode, ExecutionMode::Text);
        assert_eq!(resolved.spec.sort, Sort::TextScore);
        assert_eq!(resolved.spec.projection, Projection::ExcludeId);
        assert_eq!(resolved.cache_key, "all-nginx-paris");
    }
}
