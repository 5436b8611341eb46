//! Vector store abstraction.
//!
//! The [`VectorStore`] trait defines the storage contract needed by the
//! ingest and query paths, enabling pluggable backends (Qdrant, ChromaDB,
//! in-memory). Implementations must be `Send + Sync` to work with async
//! runtimes.
//!
//! Scores returned from [`search`](VectorStore::search) are already
//! normalized to higher-is-better: backends with a native similarity
//! (cosine) pass it through, distance-based backends convert with
//! `1 / (1 + distance)`.

pub mod chroma;
pub mod memory;
pub mod qdrant;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::models::{DistanceMetric, PayloadFilter, RecordPayload, StoredRecord};

/// A ranked hit from a vector search, score already normalized.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub payload: RecordPayload,
    pub score: f32,
}

/// Abstract similarity-searchable record store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`ensure_collection`](VectorStore::ensure_collection) | Idempotent create-if-absent |
/// | [`upsert`](VectorStore::upsert) | Insert a batch of records |
/// | [`search`](VectorStore::search) | Nearest-neighbor search with optional payload filter |
/// | [`delete_by_filter`](VectorStore::delete_by_filter) | Delete matching records, returning the count |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection if it does not exist.
    ///
    /// Must fail loudly — never silently coerce — when an existing
    /// collection's dimensionality disagrees with `dims`, on backends
    /// that expose the declared dimensionality.
    async fn ensure_collection(
        &self,
        name: &str,
        dims: usize,
        metric: DistanceMetric,
    ) -> Result<()>;

    /// Insert a batch of records. All-or-nothing from the caller's
    /// perspective: any error means the whole batch is treated as failed.
    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()>;

    /// Nearest-neighbor search, best hits first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredHit>>;

    /// Delete all records matching the filter, returning how many were
    /// removed. Zero matches is a zero-count success, not an error.
    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<u64>;
}

/// Create the [`VectorStore`] backend named in the configuration.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
    match config.backend.as_str() {
        "qdrant" => Ok(Box::new(qdrant::QdrantStore::new(&config.url)?)),
        "chroma" => Ok(Box::new(chroma::ChromaStore::new(&config.url)?)),
        "memory" => Ok(Box::new(memory::MemoryStore::new())),
        other => anyhow::bail!("Unknown store backend: {}", other),
    }
}
