//! Knowledge service orchestration.
//!
//! Ties the pipeline together: chunk → embed → upsert on the ingest path,
//! and embed-query → store search → format on the query path. The service
//! depends only on the [`EmbeddingProvider`] and [`VectorStore`] traits;
//! concrete adapters are injected at construction time.
//!
//! Within one call the stages are strictly sequential — batch embedding
//! needs every chunk, and the upsert needs every vector. Concurrent
//! `replace` ingests for the same filename are not coordinated here;
//! callers needing exclusivity must serialize externally.

use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::chunk::{chunk_markdown, ChunkOptions};
use crate::config::Config;
use crate::embedding::{create_provider, EmbeddingProvider};
use crate::models::{DistanceMetric, PayloadFilter, RecordPayload, SearchResult, StoredRecord};
use crate::store::{create_store, VectorStore};

/// Summary of one ingest call.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Chunks written to the store.
    pub chunks: usize,
    /// Records removed by the pre-replace delete (0 unless `replace`).
    pub deleted: u64,
    /// Whether this call replaced an existing file.
    pub replaced: bool,
}

/// A near-duplicate candidate from the pre-insert similarity check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarMatch {
    pub score: f32,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub heading: String,
    /// Truncated content for human review before deciding to replace.
    pub content_preview: String,
}

/// Orchestrates chunking, embedding, and vector storage.
pub struct KnowledgeService {
    embeddings: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    metric: DistanceMetric,
    chunking: ChunkOptions,
    preview_chars: usize,
}

impl KnowledgeService {
    /// Build a service from explicit collaborators, for tests and custom
    /// wiring.
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: &Config,
    ) -> Result<Self> {
        Ok(Self {
            embeddings,
            store,
            collection: config.store.collection.clone(),
            metric: config.store.distance_metric()?,
            chunking: config.chunking.options(),
            preview_chars: config.search.preview_chars,
        })
    }

    /// Build a service with the provider and store named in the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let embeddings: Arc<dyn EmbeddingProvider> =
            Arc::from(create_provider(&config.embedding)?);
        let store: Arc<dyn VectorStore> = Arc::from(create_store(&config.store)?);
        Self::new(embeddings, store, config)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ensure the collection exists with the provider's dimensionality.
    ///
    /// A dimensionality disagreement with an existing collection is a
    /// configuration error and aborts startup.
    pub async fn init(&self) -> Result<()> {
        self.store
            .ensure_collection(&self.collection, self.embeddings.dims(), self.metric)
            .await
    }

    /// Ingest a document: optional delete-by-filename, chunk, embed,
    /// upsert.
    ///
    /// The embed and upsert steps are all-or-nothing: a chunk/vector count
    /// or dimensionality mismatch aborts the call with nothing written.
    /// The pre-replace delete is not rolled back on a later failure; the
    /// caller initiated the replace and can retry it.
    pub async fn ingest(
        &self,
        content: &str,
        filename: &str,
        repo_name: Option<&str>,
        replace: bool,
    ) -> Result<IngestOutcome> {
        let mut deleted = 0;
        if replace {
            let filter = PayloadFilter::filename(filename).with_repo(repo_name);
            deleted = self.store.delete_by_filter(&self.collection, &filter).await?;
        }

        let chunks = chunk_markdown(content, filename, repo_name, self.chunking);
        if chunks.is_empty() {
            return Ok(IngestOutcome {
                chunks: 0,
                deleted,
                replaced: replace,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            bail!(
                "Embedding count mismatch: {} chunks submitted, {} vectors returned; aborting ingest of '{}'",
                chunks.len(),
                vectors.len(),
                filename
            );
        }
        let dims = self.embeddings.dims();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            bail!(
                "Embedding dimensionality mismatch: expected {}, got {}; aborting ingest of '{}'",
                dims,
                bad.len(),
                filename
            );
        }

        let records: Vec<StoredRecord> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| StoredRecord {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: RecordPayload {
                    content: chunk.content,
                    filename: chunk.filename,
                    heading: chunk.heading,
                    repo_name: chunk.repo_name,
                },
            })
            .collect();

        let count = records.len();
        self.store.upsert(&self.collection, &records).await?;

        Ok(IngestOutcome {
            chunks: count,
            deleted,
            replaced: replace,
        })
    }

    /// Search the knowledge base, best matches first.
    ///
    /// Results come back in store order, which the store contract defines
    /// as descending similarity; the service does not re-sort.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        repo_name: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embeddings.embed_query(query).await?;
        let filter = repo_name.map(PayloadFilter::repo);

        let hits = self
            .store
            .search(&self.collection, &vector, limit, filter.as_ref())
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                content: hit.payload.content,
                filename: hit.payload.filename,
                heading: hit.payload.heading,
                repo_name: hit.payload.repo_name,
                score: hit.score,
            })
            .collect())
    }

    /// Pre-insert duplicate check: same mechanics as [`search`], with a
    /// truncated content preview for human review.
    ///
    /// [`search`]: KnowledgeService::search
    pub async fn find_similar(
        &self,
        content: &str,
        repo_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SimilarMatch>> {
        let results = self.search(content, limit, repo_name).await?;
        Ok(results
            .into_iter()
            .map(|r| SimilarMatch {
                score: r.score,
                file: r.filename,
                repo: r.repo_name,
                heading: r.heading,
                content_preview: r.content.chars().take(self.preview_chars).collect(),
            })
            .collect())
    }

    /// Delete every record for a filename. Zero matches is a zero-count
    /// success.
    pub async fn delete_file(&self, filename: &str, repo_name: Option<&str>) -> Result<u64> {
        let filter = PayloadFilter::filename(filename).with_repo(repo_name);
        self.store.delete_by_filter(&self.collection, &filter).await
    }
}
