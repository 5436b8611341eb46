//! Core data models used throughout the knowledge-base pipeline.
//!
//! These types represent the chunks, stored records, and search results
//! that flow from ingestion through embedding into the vector store and
//! back out of search.

use serde::{Deserialize, Serialize};

/// A bounded segment of a source document, the unit of embedding and storage.
///
/// Produced by [`chunk_markdown`](crate::chunk::chunk_markdown) in document
/// order. Chunks are ephemeral: they live for the duration of one ingest
/// call and are persisted only as [`StoredRecord`] payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Non-empty, trimmed text segment (may include the overlap prefix
    /// carried over from the preceding chunk).
    pub content: String,
    /// Source document identifier; the delete/replace key.
    pub filename: String,
    /// Breadcrumb of enclosing section headings, joined with `" > "`.
    /// Empty when no heading precedes the content.
    pub heading: String,
    /// Optional namespace for multi-source deployments.
    pub repo_name: Option<String>,
}

/// Queryable metadata persisted alongside each vector.
///
/// This is the only filterable state in the store; record ids are opaque.
/// Field names are camelCased on the wire to match the tool-facing JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    pub content: String,
    pub filename: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
}

/// A vector plus payload, ready for upsert.
///
/// Ids are generated fresh (UUID v4) at upsert time, never reused and never
/// meaningful to callers. Updates are modeled as delete + insert, so a
/// record is never mutated in place.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: RecordPayload,
}

/// A ranked hit returned from the query path.
///
/// `score` is normalized to higher-is-better regardless of the backend's
/// native distance metric (see the individual store adapters).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub content: String,
    pub filename: String,
    pub heading: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    pub score: f32,
}

impl SearchResult {
    /// Human-readable source label: `"<filename>"` or
    /// `"<filename> > <heading>"` when a heading path is present.
    pub fn source(&self) -> String {
        if self.heading.is_empty() {
            self.filename.clone()
        } else {
            format!("{} > {}", self.filename, self.heading)
        }
    }
}

/// Conjunction of exact-match constraints over payload fields.
///
/// Only `filename` and `repo_name` are filterable; both set means both
/// must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadFilter {
    pub filename: Option<String>,
    pub repo_name: Option<String>,
}

impl PayloadFilter {
    /// Filter matching a single file.
    pub fn filename(filename: &str) -> Self {
        Self {
            filename: Some(filename.to_string()),
            repo_name: None,
        }
    }

    /// Filter matching a repository namespace.
    pub fn repo(repo_name: &str) -> Self {
        Self {
            filename: None,
            repo_name: Some(repo_name.to_string()),
        }
    }

    /// Add a repository constraint when one is provided.
    pub fn with_repo(mut self, repo_name: Option<&str>) -> Self {
        self.repo_name = repo_name.map(str::to_string);
        self
    }

    /// True when the filter has no constraints at all.
    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.repo_name.is_none()
    }

    /// Evaluate the filter against a payload.
    pub fn matches(&self, payload: &RecordPayload) -> bool {
        if let Some(ref f) = self.filename {
            if &payload.filename != f {
                return false;
            }
        }
        if let Some(ref r) = self.repo_name {
            if payload.repo_name.as_deref() != Some(r.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Distance metric declared at collection creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    Cosine,
    Euclid,
    Dot,
}

impl DistanceMetric {
    /// Qdrant's spelling of the metric name.
    pub fn as_qdrant(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "Cosine",
            DistanceMetric::Euclid => "Euclid",
            DistanceMetric::Dot => "Dot",
        }
    }
}
