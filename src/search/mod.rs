//! Tantivy-backed gazetteer.
//!
//! Offline place autocomplete: prefix/fuzzy matching over place names and
//! addresses, restricted to one country and ranked by a bounding box.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{LatLng, PlaceBias, PlaceCandidate};
use crate::services::{BoxFuture, PlaceAutocomplete};

const BOOST_NAME: f32 = 3.0;
const BOOST_ADDRESS: f32 = 1.0;

/// Candidates returned per query.
const SUGGESTION_LIMIT: usize = 5;
/// Hits fetched before bounds ranking trims them down.
const CANDIDATE_POOL: usize = 50;

/// One place known to the gazetteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazetteerEntry {
    #[serde(default)]
    pub place_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

impl GazetteerEntry {
    fn new(name: &str, address: &str, lat: f64, lng: f64) -> Self {
        Self {
            place_id: None,
            name: name.to_string(),
            formatted_address: Some(address.to_string()),
            country: "in".to_string(),
            lat,
            lng,
        }
    }

    /// Explicit id, or `local:` plus a slug of the name.
    fn id(&self) -> String {
        self.place_id.clone().unwrap_or_else(|| {
            format!("local:{}", tokenize(&self.name).join("-"))
        })
    }
}

/// Built-in places used when no gazetteer file is configured.
pub fn default_entries() -> Vec<GazetteerEntry> {
    vec![
        GazetteerEntry::new("Silk Board Junction", "Hosur Road, Bengaluru", 12.9177, 77.6238),
        GazetteerEntry::new("Koramangala", "Koramangala, Bengaluru", 12.9352, 77.6245),
        GazetteerEntry::new("HSR Layout", "HSR Layout, Bengaluru", 12.9116, 77.6474),
        GazetteerEntry::new("Indiranagar", "Indiranagar, Bengaluru", 12.9784, 77.6408),
        GazetteerEntry::new("MG Road", "Mahatma Gandhi Road, Bengaluru", 12.9756, 77.6066),
        GazetteerEntry::new("Majestic", "Kempegowda Bus Station, Bengaluru", 12.9779, 77.5713),
        GazetteerEntry::new("Jayanagar", "Jayanagar, Bengaluru", 12.9308, 77.5838),
        GazetteerEntry::new("Hebbal Flyover", "Hebbal, Bengaluru", 13.0358, 77.5970),
        GazetteerEntry::new("Marathahalli Bridge", "Outer Ring Road, Marathahalli, Bengaluru", 12.9569, 77.7011),
        GazetteerEntry::new("Whitefield", "Whitefield, Bengaluru", 12.9698, 77.7500),
        GazetteerEntry::new("Electronic City", "Hosur Road, Electronic City, Bengaluru", 12.8452, 77.6602),
        GazetteerEntry::new(
            "Kempegowda International Airport",
            "Devanahalli, Bengaluru",
            13.1986,
            77.7066,
        ),
        GazetteerEntry::new("Mysore Palace", "Sayyaji Rao Road, Mysuru", 12.3052, 76.6552),
    ]
}

/// Lowercased alphanumeric words, matching the default text tokenizer.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

struct GazetteerFields {
    place_id: Field,
    name: Field,
    address: Field,
    country: Field,
    lat: Field,
    lng: Field,
}

/// Tantivy index of places.
pub struct Gazetteer {
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: GazetteerFields,
}

impl Gazetteer {
    /// Create or open a gazetteer index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let place_id = schema_builder.add_text_field("place_id", STRING | STORED);
        let name = schema_builder.add_text_field("name", TEXT | STORED);
        let address = schema_builder.add_text_field("address", TEXT | STORED);
        let country = schema_builder.add_text_field("country", STRING | STORED);
        let lat = schema_builder.add_f64_field("lat", STORED);
        let lng = schema_builder.add_f64_field("lng", STORED);
        let schema = schema_builder.build();

        let fields = GazetteerFields {
            place_id,
            name,
            address,
            country,
            lat,
            lng,
        };

        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(15_000_000)
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Replace the whole index with `entries`. Entries with invalid coordinates are skipped.
    pub async fn load(&self, entries: &[GazetteerEntry]) -> Result<usize, AppError> {
        let mut writer = self.writer.write().await;
        writer.delete_all_documents()?;

        let mut indexed = 0;
        for entry in entries {
            if LatLng::new(entry.lat, entry.lng).is_err() {
                tracing::warn!("Skipping gazetteer entry '{}' with invalid coordinates", entry.name);
                continue;
            }
            writer.add_document(doc!(
                self.fields.place_id => entry.id(),
                self.fields.name => entry.name.clone(),
                self.fields.address => entry.formatted_address.clone().unwrap_or_default(),
                self.fields.country => entry.country.to_ascii_lowercase(),
                self.fields.lat => entry.lat,
                self.fields.lng => entry.lng
            ))?;
            indexed += 1;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!("Gazetteer loaded with {} places", indexed);
        Ok(indexed)
    }

    /// Read a JSON array of entries from disk.
    pub fn load_file(path: &Path) -> Result<Vec<GazetteerEntry>, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Search(format!("Failed to read gazetteer {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Search(format!("Invalid gazetteer {}: {}", path.display(), e))
        })
    }

    /// Search by free text within `bias.country`.
    ///
    /// Every query word must match a name or address word as a prefix (one
    /// typo allowed for words of four letters or more). In-bounds places rank
    /// first; with strict bounds the rest are dropped.
    pub fn search(&self, input: &str, bias: &PlaceBias) -> Result<Vec<PlaceCandidate>, AppError> {
        let tokens = tokenize(input);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Must,
            Box::new(TermQuery::new(
                Term::from_field_text(self.fields.country, &bias.country.to_ascii_lowercase()),
                IndexRecordOption::Basic,
            )),
        )];

        for token in &tokens {
            let distance = if token.chars().count() >= 4 { 1 } else { 0 };
            let per_field: Vec<(Occur, Box<dyn Query>)> = [
                (self.fields.name, BOOST_NAME),
                (self.fields.address, BOOST_ADDRESS),
            ]
            .into_iter()
            .map(|(field, boost)| {
                let fuzzy =
                    FuzzyTermQuery::new_prefix(Term::from_field_text(field, token), distance, true);
                (
                    Occur::Should,
                    Box::new(BoostQuery::new(Box::new(fuzzy), boost)) as Box<dyn Query>,
                )
            })
            .collect();
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(per_field))));
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher
            .search(&BooleanQuery::new(clauses), &TopDocs::with_limit(CANDIDATE_POOL))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let mut candidates: Vec<(bool, PlaceCandidate)> = top_docs
            .into_iter()
            .filter_map(|(_, address)| {
                let doc: TantivyDocument = searcher.doc(address).ok()?;
                let candidate = self.candidate(&doc)?;
                let in_bounds = candidate
                    .location
                    .map(|l| bias.bounds.contains(&l))
                    .unwrap_or(false);
                Some((in_bounds, candidate))
            })
            .filter(|(in_bounds, _)| *in_bounds || !bias.strict_bounds)
            .collect();

        // Stable: keeps relevance order inside each group.
        candidates.sort_by_key(|(in_bounds, _)| !*in_bounds);

        Ok(candidates
            .into_iter()
            .take(SUGGESTION_LIMIT)
            .map(|(_, c)| c)
            .collect())
    }

    pub fn lookup(&self, place_id: &str) -> Result<Option<PlaceCandidate>, AppError> {
        let searcher = self.reader.searcher();
        let query = TermQuery::new(
            Term::from_field_text(self.fields.place_id, place_id),
            IndexRecordOption::Basic,
        );
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(1))
            .map_err(|e| AppError::Search(format!("Lookup failed: {}", e)))?;

        Ok(top_docs.into_iter().find_map(|(_, address)| {
            let doc: TantivyDocument = searcher.doc(address).ok()?;
            self.candidate(&doc)
        }))
    }

    fn candidate(&self, doc: &TantivyDocument) -> Option<PlaceCandidate> {
        let text = |field: Field| doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string);
        let lat = doc.get_first(self.fields.lat)?.as_f64()?;
        let lng = doc.get_first(self.fields.lng)?.as_f64()?;

        Some(PlaceCandidate {
            place_id: text(self.fields.place_id)?,
            name: text(self.fields.name)?,
            formatted_address: text(self.fields.address).filter(|a| !a.is_empty()),
            location: LatLng::new(lat, lng).ok(),
        })
    }
}

impl PlaceAutocomplete for Gazetteer {
    fn suggest<'a>(
        &'a self,
        input: &'a str,
        bias: &'a PlaceBias,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, AppError>> {
        Box::pin(async move { self.search(input, bias) })
    }

    fn details<'a>(
        &'a self,
        place_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<PlaceCandidate>, AppError>> {
        Box::pin(async move { self.lookup(place_id) })
    }
}
