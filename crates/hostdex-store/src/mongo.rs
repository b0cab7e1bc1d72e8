//! MongoDB-backed document store.
//!
//! Translates a [`QuerySpec`] into the literal five-stage aggregation and
//! runs it. Stage order is fixed: match (`$match`, `$text` inside `$match`,
//! or `$geoNear`), `$limit`, `$addFields`, `$project`, `$sort` — the sort
//! runs after the cap.

use crate::config::MongoConfig;
use crate::document::DocumentStore;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use hostdex_core::{
    ExecutionMode, HostdexError, MatchExpr, Projection, QuerySpec, Result, Sort,
    DISPLAY_DATE_FIELDS, DISPLAY_TIME_FORMAT,
};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::debug;

/// Field paths carrying a compound `(field, updated)` descending index,
/// one per matched path in the condition table.
const INDEXED_FIELDS: &[&str] = &[
    "header.x-powered-by",
    "banner",
    "ports.port",
    "whois.asn",
    "whois.asn_description",
    "whois.asn_country_code",
    "whois.asn_registry",
    "whois.asn_cidr",
    "cname_record.target",
    "mx_record.exchange",
    "header.server",
    "header.status",
    "ns_record",
    "aaaa_record",
    "a_record",
    "domain",
    "geo.loc.coordinates",
    "geo.country_code",
    "geo.country",
    "geo.state",
    "geo.city",
    "ssl.ocsp",
    "ssl.not_after",
    "ssl.not_before",
    "ssl.ca_issuers",
    "ssl.issuer.common_name",
    "ssl.issuer.organization_name",
    "ssl.issuer.organizational_unit_name",
    "ssl.subject_alt_names",
    "ssl.subject.common_name",
    "ssl.crl_distribution_points",
];

/// MongoDB-backed [`DocumentStore`].
#[derive(Clone)]
pub struct MongoDocumentStore {
    collection: Collection<Document>,
}

impl MongoDocumentStore {
    /// Connect to the document store.
    ///
    /// # Errors
    ///
    /// Returns [`HostdexError::DocumentStore`] if the URI is invalid or the
    /// initial connection fails.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| HostdexError::DocumentStore(e.to_string()))?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        Ok(Self { collection })
    }

    /// Wrap an existing collection handle.
    #[must_use]
    pub const fn from_collection(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// Create the compound `(field, updated)` descending background indexes
    /// backing the condition table. Idempotent; meant for bootstrap.
    ///
    /// # Errors
    ///
    /// Returns [`HostdexError::DocumentStore`] if index creation fails.
    pub async fn ensure_indexes(&self) -> Result<()> {
        for field in INDEXED_FIELDS {
            let model = IndexModel::builder()
                .keys(doc! { *field: -1, "updated": -1 })
                .options(IndexOptions::builder().background(true).build())
                .build();

            self.collection
                .create_index(model)
                .await
                .map_err(|e| HostdexError::DocumentStore(e.to_string()))?;
            debug!(field, "ensured compound index");
        }

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn run(&self, spec: &QuerySpec) -> Result<Vec<Value>> {
        let pipeline = build_pipeline(spec);
        debug!(stages = pipeline.len(), limit = spec.limit, "running aggregation");

        let cursor = self
            .collection
            .aggregate(pipeline)
            .await
            .map_err(|e| HostdexError::DocumentStore(e.to_string()))?;

        let docs: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| HostdexError::DocumentStore(e.to_string()))?;

        Ok(docs
            .into_iter()
            .map(|d| Bson::Document(d).into_relaxed_extjson())
            .collect())
    }
}

/// Build the aggregation pipeline for a spec.
#[must_use]
pub fn build_pipeline(spec: &QuerySpec) -> Vec<Document> {
    let mut stages = Vec::with_capacity(5);

    match spec.mode {
        ExecutionMode::GeoNear {
            lat,
            lon,
            max_distance_m,
        } => stages.push(doc! {
            "$geoNear": {
                "distanceField": "geo.distance",
                "near": { "type": "Point", "coordinates": [lon, lat] },
                "maxDistance": max_distance_m,
                "spherical": true,
            }
        }),
        _ => stages.push(doc! { "$match": match_document(&spec.match_expr) }),
    }

    stages.push(doc! { "$limit": spec.limit });
    stages.push(doc! { "$addFields": display_fields(spec.mode.is_text()) });
    stages.push(doc! { "$project": projection_document(&spec.projection) });
    stages.push(doc! { "$sort": sort_document(&spec.sort) });

    stages
}

fn match_document(expr: &MatchExpr) -> Document {
    match expr {
        MatchExpr::Eq { path, value } => doc! { *path: json_to_bson(value) },
        MatchExpr::Contains { path, value } => {
            doc! { *path: { "$in": [json_to_bson(value)] } }
        }
        MatchExpr::DateGte { path, at } => {
            doc! { *path: { "$gte": mongodb::bson::DateTime::from_millis(at.timestamp_millis()) } }
        }
        MatchExpr::DateLte { path, at } => {
            doc! { *path: { "$lte": mongodb::bson::DateTime::from_millis(at.timestamp_millis()) } }
        }
        MatchExpr::Exists { path, exists } => doc! { *path: { "$exists": *exists } },
        MatchExpr::All(exprs) => {
            let subs: Vec<Document> = exprs.iter().map(match_document).collect();
            doc! { "$and": subs }
        }
        MatchExpr::Any(exprs) => {
            let subs: Vec<Document> = exprs.iter().map(match_document).collect();
            doc! { "$or": subs }
        }
        MatchExpr::Text(q) => doc! { "$text": { "$search": q } },
    }
}

fn display_fields(text_mode: bool) -> Document {
    let mut fields = Document::new();
    for (source, formatted) in DISPLAY_DATE_FIELDS {
        fields.insert(
            (*formatted).to_string(),
            doc! { "$dateToString": { "format": DISPLAY_TIME_FORMAT, "date": format!("${source}") } },
        );
    }
    if text_mode {
        fields.insert("score", doc! { "$meta": "textScore" });
    }
    fields
}

fn projection_document(projection: &Projection) -> Document {
    match projection {
        Projection::ExcludeId => doc! { "_id": 0 },
        Projection::Fields(paths) => {
            let mut d = doc! { "_id": 0 };
            for path in *paths {
                d.insert((*path).to_string(), 1);
            }
            d
        }
    }
}

fn sort_document(sort: &Sort) -> Document {
    match sort {
        Sort::Field { path, descending } => {
            doc! { *path: if *descending { -1 } else { 1 } }
        }
        Sort::TextScore => doc! { "score": { "$meta": "textScore" } },
    }
}

fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::String(s) => Bson::String(s.clone()),
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map_or(Bson::Null, Bson::Double),
            Bson::Int64,
        ),
        Value::Bool(b) => Bson::Boolean(*b),
        _ => Bson::Null,
    }
}
