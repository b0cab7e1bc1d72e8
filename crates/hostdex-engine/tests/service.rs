//! End-to-end coordinator tests against the in-memory store doubles.

use hostdex_core::{Condition, HostdexError};
use hostdex_engine::SearchService;
use hostdex_store::{CacheStore, MemoryCacheStore, MemoryDocumentStore};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn host(domain: &str, updated: &str, asn: &str) -> Value {
    json!({
        "_id": "internal",
        "domain": domain,
        "updated": updated,
        "a_record": ["192.0.2.1"],
        "country_code": "US",
        "whois": { "asn": asn, "asn_country_code": "US" },
        "geo": { "country_code": "US" },
        "ssl": { "ca_issuers": "1234" },
    })
}

fn service_with(
    docs: Vec<Value>,
) -> (SearchService, Arc<MemoryDocumentStore>, Arc<MemoryCacheStore>) {
    let documents = Arc::new(MemoryDocumentStore::new());
    documents.insert_all(docs);
    let cache = Arc::new(MemoryCacheStore::new());
    let service = SearchService::new(documents.clone(), cache.clone());
    (service, documents, cache)
}

fn domains(results: &[Value]) -> HashSet<String> {
    results
        .iter()
        .filter_map(|d| d["domain"].as_str().map(String::from))
        .collect()
}

#[tokio::test]
async fn test_cold_lookup_is_sorted_by_recency() {
    let (service, _, _) = service_with(vec![
        host("old.example", "2023-06-01T00:00:00Z", "1234"),
        host("new.example", "2024-06-01T00:00:00Z", "1234"),
    ]);

    let out = service.lookup(Condition::Asn, "AS1234").await.unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["domain"], "new.example");
    assert_eq!(out[1]["domain"], "old.example");
}

#[tokio::test]
async fn test_warm_lookup_equals_cold_as_a_set() {
    let (service, _, cache) = service_with(vec![
        host("a.example", "2024-01-01T00:00:00Z", "1234"),
        host("b.example", "2024-02-01T00:00:00Z", "1234"),
        host("c.example", "2024-03-01T00:00:00Z", "1234"),
    ]);

    let cold = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(cache.set_len("asn-1234").await.unwrap(), 3);

    // Warm results hydrate from an unordered set; compare as sets.
    let warm = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(domains(&cold), domains(&warm));
    assert_eq!(warm.len(), 3);
}

#[tokio::test]
async fn test_warm_lookup_does_not_see_new_documents() {
    let (service, documents, _) = service_with(vec![host(
        "a.example",
        "2024-01-01T00:00:00Z",
        "1234",
    )]);

    let cold = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(cold.len(), 1);

    documents.insert(host("b.example", "2024-02-01T00:00:00Z", "1234"));

    // Still served from the cache until the entry expires.
    let warm = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(warm.len(), 1);
}

#[tokio::test]
async fn test_expired_entry_behaves_as_fresh_cold_call() {
    let (service, documents, cache) = service_with(vec![host(
        "a.example",
        "2024-01-01T00:00:00Z",
        "1234",
    )]);

    service.lookup(Condition::Asn, "1234").await.unwrap();
    documents.insert(host("b.example", "2024-02-01T00:00:00Z", "1234"));

    cache.advance(Duration::from_secs(24 * 60 * 60 + 1));

    let after_expiry = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(
        domains(&after_expiry),
        HashSet::from(["a.example".to_string(), "b.example".to_string()])
    );
}

#[tokio::test]
async fn test_loc_soft_fails_to_empty() {
    let (service, _, _) = service_with(vec![host(
        "a.example",
        "2024-01-01T00:00:00Z",
        "1234",
    )]);

    let out = service.lookup(Condition::Loc, "not,numbers").await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_port_hard_fails_unlike_loc() {
    let (service, _, _) = service_with(vec![host(
        "a.example",
        "2024-01-01T00:00:00Z",
        "1234",
    )]);

    let err = service.lookup(Condition::Port, "abc").await.unwrap_err();
    assert!(matches!(err, HostdexError::InvalidValue { condition: "port", .. }));
}

#[tokio::test]
async fn test_unknown_condition_name_is_an_error() {
    let (service, _, _) = service_with(Vec::new());

    let err = service.lookup_named("bogus", "x").await.unwrap_err();
    assert!(matches!(err, HostdexError::UnknownCondition(_)));
}

#[tokio::test]
async fn test_country_requires_both_sources_end_to_end() {
    let (service, _, _) = service_with(vec![
        json!({
            "domain": "both.example",
            "updated": "2024-01-01T00:00:00Z",
            "geo": { "country_code": "US" },
            "whois": { "asn_country_code": "US" },
        }),
        json!({
            "domain": "whois-only.example",
            "updated": "2024-01-02T00:00:00Z",
            "geo": { "country_code": "CA" },
            "whois": { "asn_country_code": "US" },
        }),
    ]);

    let out = service.lookup(Condition::Country, "us").await.unwrap();
    assert_eq!(domains(&out), HashSet::from(["both.example".to_string()]));
}

#[tokio::test]
async fn test_ca_lookup_matches_issuer_field() {
    let (service, _, _) = service_with(vec![
        host("hit.example", "2024-01-01T00:00:00Z", "1234"),
        json!({
            "domain": "miss.example",
            "updated": "2024-01-02T00:00:00Z",
            "ssl": { "ca_issuers": "5678" },
        }),
    ]);

    let out = service.lookup(Condition::Ca, "1234").await.unwrap();
    assert_eq!(domains(&out), HashSet::from(["hit.example".to_string()]));
}

#[tokio::test]
async fn test_latest_ipv4_fans_out_addresses() {
    let (service, _, _) = service_with(vec![
        json!({
            "domain": "multi.example",
            "updated": "2024-01-01T00:00:00Z",
            "a_record": ["192.0.2.1", "192.0.2.2"],
            "country_code": "DE",
        }),
        json!({
            "domain": "no-records.example",
            "updated": "2024-01-02T00:00:00Z",
        }),
    ]);

    let out = service.latest_ipv4().await.unwrap();

    // Two flat entries from the two-address record, none from the record
    // lacking the array.
    assert_eq!(out.len(), 2);
    let addresses: HashSet<&str> = out.iter().filter_map(|e| e["a_record"].as_str()).collect();
    assert_eq!(addresses, HashSet::from(["192.0.2.1", "192.0.2.2"]));
    assert!(out.iter().all(|e| e["country_code"] == "DE"));
    assert!(out.iter().all(|e| e.get("domain").is_none()));
}

#[tokio::test]
async fn test_latest_cidr_projects_prefix_and_country() {
    let (service, _, _) = service_with(vec![json!({
        "domain": "a.example",
        "updated": "2024-01-01T00:00:00Z",
        "whois": {
            "asn": "1234",
            "asn_cidr": "192.0.2.0/24",
            "asn_country_code": "US",
        },
    })]);

    let out = service.latest_cidr().await.unwrap();
    assert_eq!(
        out[0],
        json!({ "whois": { "asn_cidr": "192.0.2.0/24", "asn_country_code": "US" } })
    );
}

#[tokio::test]
async fn test_refresh_rebuilds_the_entry() {
    let (service, documents, cache) = service_with(vec![host(
        "a.example",
        "2024-01-01T00:00:00Z",
        "1234",
    )]);

    service.lookup(Condition::Asn, "1234").await.unwrap();
    documents.insert(host("b.example", "2024-02-01T00:00:00Z", "1234"));

    service.refresh(Condition::Asn, "1234").await.unwrap();
    assert_eq!(cache.set_len("asn-1234").await.unwrap(), 2);

    let warm = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(
        domains(&warm),
        HashSet::from(["a.example".to_string(), "b.example".to_string()])
    );
}

#[tokio::test]
async fn test_racing_cold_lookups_duplicate_but_stay_consistent() {
    let (service, _, cache) = service_with(vec![
        host("a.example", "2024-01-01T00:00:00Z", "1234"),
        host("b.example", "2024-02-01T00:00:00Z", "1234"),
    ]);

    // Concurrent misses may each populate; duplicate members are allowed.
    let (left, right) = tokio::join!(
        service.lookup(Condition::Asn, "1234"),
        service.lookup(Condition::Asn, "1234"),
    );
    let (left, right) = (left.unwrap(), right.unwrap());

    assert_eq!(domains(&left), domains(&right));
    // Duplicate members are waste, not corruption.
    assert!(cache.set_len("asn-1234").await.unwrap() >= 2);

    let warm = service.lookup(Condition::Asn, "1234").await.unwrap();
    assert_eq!(
        domains(&warm),
        HashSet::from(["a.example".to_string(), "b.example".to_string()])
    );
}

#[tokio::test]
async fn test_text_search_is_cached_under_the_all_prefix() {
    let (service, _, cache) = service_with(vec![json!({
        "domain": "web.example",
        "updated": "2024-01-01T00:00:00Z",
        "banner": "nginx",
    })]);

    let out = service.search("nginx").await.unwrap();
    assert_eq!(out.len(), 1);
    assert!(out[0]["score"].as_f64().unwrap() > 0.0);
    assert_eq!(cache.set_len("all-nginx").await.unwrap(), 1);
}

#[tokio::test]
async fn test_not_found_is_empty_not_error() {
    let (service, _, _) = service_with(Vec::new());

    let out = service.lookup(Condition::Site, "missing.example").await.unwrap();
    assert!(out.is_empty());
}
