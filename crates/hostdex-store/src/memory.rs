//! In-memory implementations of both store seams.
//!
//! [`MemoryDocumentStore`] interprets a [`QuerySpec`] over plain JSON
//! documents with the same stage order as the Mongo pipeline (match, cap,
//! display fields, projection, sort). [`MemoryCacheStore`] honors TTLs
//! against a clock that tests can advance. Together they stand in for the
//! external stores in tests and local development.
//!
//! Date fields are expected as RFC 3339 strings (their lexicographic order
//! is chronological, so recency sorts need no parsing).

use crate::cache::CacheStore;
use crate::document::DocumentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hostdex_core::{
    ExecutionMode, MatchExpr, Projection, QuerySpec, Result, Sort, DISPLAY_DATE_FIELDS,
    DISPLAY_TIME_FORMAT,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

/// In-memory [`DocumentStore`] over JSON documents.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<Vec<Value>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document.
    pub fn insert(&self, doc: Value) {
        self.docs.write().expect("document store lock").push(doc);
    }

    /// Add several documents in order.
    pub fn insert_all(&self, docs: impl IntoIterator<Item = Value>) {
        self.docs
            .write()
            .expect("document store lock")
            .extend(docs);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn run(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        let docs = self.docs.read().expect("document store lock").clone();
        Ok(execute(spec, &docs))
    }
}

/// Run the pipeline stages over a document slice.
fn execute(spec: &QuerySpec, docs: &[Value]) -> Vec<Value> {
    // Stage 1: the matching stage. Geo execution orders nearest-first and
    // annotates distance; the others keep natural order.
    let mut matched: Vec<Matched> = match &spec.mode {
        ExecutionMode::GeoNear {
            lat,
            lon,
            max_distance_m,
        } => {
            let mut hits: Vec<Matched> = docs
                .iter()
                .filter_map(|doc| {
                    let dist = geo_distance_m(doc, *lat, *lon)?;
                    (dist <= *max_distance_m).then(|| Matched {
                        doc: doc.clone(),
                        score: None,
                        distance: Some(dist),
                    })
                })
                .collect();
            hits.sort_by(|a, b| {
                a.distance
                    .partial_cmp(&b.distance)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            hits
        }
        ExecutionMode::Text => docs
            .iter()
            .filter_map(|doc| {
                let score = text_score(doc, &spec.match_expr);
                (score > 0.0).then(|| Matched {
                    doc: doc.clone(),
                    score: Some(score),
                    distance: None,
                })
            })
            .collect(),
        ExecutionMode::Match => docs
            .iter()
            .filter(|doc| matches(&spec.match_expr, doc))
            .map(|doc| Matched {
                doc: doc.clone(),
                score: None,
                distance: None,
            })
            .collect(),
    };

    // Stage 2: cap before sorting, as the pipeline does.
    matched.truncate(usize::try_from(spec.limit).unwrap_or(usize::MAX));

    // Stage 3: computed display fields.
    for m in &mut matched {
        attach_display_fields(&mut m.doc);
        if let Some(score) = m.score {
            set_path(&mut m.doc, "score", Value::from(score));
        }
        if let Some(dist) = m.distance {
            set_path(&mut m.doc, "geo.distance", Value::from(dist));
        }
    }

    // Stage 4: projection.
    let mut out: Vec<Value> = matched
        .into_iter()
        .map(|m| project(&m.doc, &spec.projection))
        .collect();

    // Stage 5: final sort.
    match &spec.sort {
        Sort::Field { path, descending } => {
            out.sort_by(|a, b| {
                let ka = first_str(a, path);
                let kb = first_str(b, path);
                // Missing keys sort last either way.
                let ord = match (ka, kb) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (Some(_), None) => return std::cmp::Ordering::Less,
                    (None, Some(_)) => return std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                if *descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        Sort::TextScore => {
            out.sort_by(|a, b| {
                let ka = first_f64(b, "score");
                let kb = first_f64(a, "score");
                ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    out
}

struct Matched {
    doc: Value,
    score: Option<f64>,
    distance: Option<f64>,
}

/// Walk a dotted path, descending through objects and fanning out through
/// arrays of objects, the way the document store addresses nested fields.
fn resolve_path<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(map) = item {
                            if let Some(v) = map.get(segment) {
                                next.push(v);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }
    current
}

/// Leaf values at a path, with one level of array flattening: equality on
/// an array field matches any element.
fn leaves<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    for value in resolve_path(doc, path) {
        match value {
            Value::Array(items) => out.extend(items.iter()),
            other => out.push(other),
        }
    }
    out
}

fn first_str<'a>(doc: &'a Value, path: &str) -> Option<&'a str> {
    leaves(doc, path).into_iter().find_map(Value::as_str)
}

fn first_f64(doc: &Value, path: &str) -> Option<f64> {
    leaves(doc, path).into_iter().find_map(Value::as_f64)
}

fn matches(expr: &MatchExpr, doc: &Value) -> bool {
    match expr {
        MatchExpr::Eq { path, value } | MatchExpr::Contains { path, value } => {
            leaves(doc, path).into_iter().any(|leaf| leaf == value)
        }
        MatchExpr::DateGte { path, at } => date_leaf(doc, path).is_some_and(|d| d >= *at),
        MatchExpr::DateLte { path, at } => date_leaf(doc, path).is_some_and(|d| d <= *at),
        MatchExpr::Exists { path, exists } => resolve_path(doc, path).is_empty() != *exists,
        MatchExpr::All(exprs) => exprs.iter().all(|e| matches(e, doc)),
        MatchExpr::Any(exprs) => exprs.iter().any(|e| matches(e, doc)),
        MatchExpr::Text(_) => text_score(doc, expr) > 0.0,
    }
}

fn date_leaf(doc: &Value, path: &str) -> Option<DateTime<Utc>> {
    first_str(doc, path)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// Crude relevance: for each query term, count the string leaves that
/// contain it. Enough to rank and to gate on score > 0.
fn text_score(doc: &Value, expr: &MatchExpr) -> f64 {
    let MatchExpr::Text(query) = expr else {
        return 0.0;
    };

    let mut strings = Vec::new();
    collect_strings(doc, &mut strings);

    let mut score = 0usize;
    for term in query.to_lowercase().split_whitespace() {
        score += strings.iter().filter(|s| s.contains(term)).count();
    }

    score as f64
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.to_lowercase()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

/// Distance in meters from the document's GeoJSON point to the origin.
fn geo_distance_m(doc: &Value, lat: f64, lon: f64) -> Option<f64> {
    let coords = resolve_path(doc, "geo.loc.coordinates")
        .into_iter()
        .next()?
        .as_array()?;
    let doc_lon = coords.first()?.as_f64()?;
    let doc_lat = coords.get(1)?.as_f64()?;
    Some(haversine_m(lat, lon, doc_lat, doc_lon))
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

fn attach_display_fields(doc: &mut Value) {
    for (source, formatted) in DISPLAY_DATE_FIELDS {
        if let Some(parsed) = date_leaf(doc, source) {
            set_path(
                doc,
                formatted,
                Value::String(parsed.format(DISPLAY_TIME_FORMAT).to_string()),
            );
        }
    }
}

/// Set a dotted path, creating intermediate objects as needed. Non-object
/// intermediates are left alone.
fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let Value::Object(map) = current else {
            return;
        };
        if i == segments.len() - 1 {
            map.insert((*segment).to_string(), value);
            return;
        }
        current = map
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn project(doc: &Value, projection: &Projection) -> Value {
    match projection {
        Projection::ExcludeId => {
            let mut out = doc.clone();
            if let Value::Object(map) = &mut out {
                map.remove("_id");
            }
            out
        }
        Projection::Fields(paths) => {
            let mut out = Value::Object(Map::new());
            for path in *paths {
                if let Some(v) = get_path(doc, path) {
                    set_path(&mut out, path, v.clone());
                }
            }
            out
        }
    }
}

/// Plain object-only path lookup, for include projections.
fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// In-memory [`CacheStore`] with TTL bookkeeping.
///
/// The clock can be advanced from tests to exercise expiry behavior.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: Mutex<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    sets: HashMap<String, SetEntry>,
    docs: HashMap<String, DocEntry>,
    skew: Duration,
}

struct SetEntry {
    members: HashSet<String>,
    expires_at: Option<Instant>,
}

struct DocEntry {
    value: Value,
    expires_at: Instant,
}

impl MemoryCacheStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the store's clock, expiring everything whose TTL falls
    /// inside the jump.
    pub fn advance(&self, by: Duration) {
        self.inner.lock().expect("cache store lock").skew += by;
    }
}

impl CacheInner {
    fn now(&self) -> Instant {
        Instant::now() + self.skew
    }

    fn purge_expired_set(&mut self, key: &str) {
        let now = self.now();
        if self
            .sets
            .get(key)
            .is_some_and(|e| e.expires_at.is_some_and(|at| at <= now))
        {
            self.sets.remove(key);
        }
    }

    fn live_set(&mut self, key: &str) -> Option<&mut SetEntry> {
        self.purge_expired_set(key);
        self.sets.get_mut(key)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn set_len(&self, key: &str) -> Result<u64> {
        let mut inner = self.inner.lock().expect("cache store lock");
        Ok(inner.live_set(key).map_or(0, |e| e.members.len() as u64))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().expect("cache store lock");
        Ok(inner
            .live_set(key)
            .map(|e| e.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("cache store lock");
        inner.purge_expired_set(key);
        inner
            .sets
            .entry(key.to_string())
            .or_insert_with(|| SetEntry {
                members: HashSet::new(),
                expires_at: None,
            })
            .members
            .insert(member.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("cache store lock");
        inner.sets.remove(key);
        inner.docs.remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().expect("cache store lock");
        let deadline = inner.now() + ttl;
        inner.purge_expired_set(key);
        if let Some(entry) = inner.sets.get_mut(key) {
            entry.expires_at = Some(deadline);
            return Ok(());
        }
        if let Some(entry) = inner.docs.get_mut(key) {
            entry.expires_at = deadline;
        }
        Ok(())
    }

    async fn put_json(&self, id: &str, doc: &Value, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().expect("cache store lock");
        let expires_at = inner.now() + ttl;
        inner.docs.insert(
            id.to_string(),
            DocEntry {
                value: doc.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get_json(&self, id: &str) -> Result<Option<Value>> {
        let mut inner = self.inner.lock().expect("cache store lock");
        let now = inner.now();
        if inner.docs.get(id).is_some_and(|e| e.expires_at <= now) {
            inner.docs.remove(id);
        }
        Ok(inner.docs.get(id).map(|e| e.value.clone()))
    }
}
