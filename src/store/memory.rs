//! In-memory [`VectorStore`] for tests and local experimentation.
//!
//! Collections are `Vec`s of records behind `std::sync::RwLock`. Search is
//! a brute-force cosine scan over every stored vector, so scores are
//! already similarities and pass through unnormalized.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{DistanceMetric, PayloadFilter, StoredRecord};

use super::{ScoredHit, VectorStore};

struct Collection {
    dims: usize,
    records: Vec<StoredRecord>,
}

/// Brute-force in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dims: usize,
        _metric: DistanceMetric,
    ) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        if let Some(existing) = collections.get(name) {
            if existing.dims != dims {
                bail!(
                    "Collection '{}' exists with {} dimensions, requested {}",
                    name,
                    existing.dims,
                    dims
                );
            }
            return Ok(());
        }
        collections.insert(
            name.to_string(),
            Collection {
                dims,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        let mut collections = self.collections.write().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' does not exist", collection))?;

        for record in records {
            if record.vector.len() != coll.dims {
                bail!(
                    "Vector of {} dimensions does not fit collection '{}' ({} dimensions)",
                    record.vector.len(),
                    collection,
                    coll.dims
                );
            }
        }
        coll.records.extend(records.iter().cloned());
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredHit>> {
        let collections = self.collections.read().unwrap();
        let coll = collections
            .get(collection)
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' does not exist", collection))?;

        let mut hits: Vec<ScoredHit> = coll
            .records
            .iter()
            .filter(|r| filter.map_or(true, |f| f.matches(&r.payload)))
            .map(|r| ScoredHit {
                payload: r.payload.clone(),
                score: cosine_sim(vector, &r.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<u64> {
        let mut collections = self.collections.write().unwrap();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' does not exist", collection))?;

        let before = coll.records.len();
        coll.records.retain(|r| !filter.matches(&r.payload));
        Ok((before - coll.records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordPayload;

    fn record(id: &str, vector: Vec<f32>, filename: &str, repo: Option<&str>) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            vector,
            payload: RecordPayload {
                content: format!("content of {}", id),
                filename: filename.to_string(),
                heading: String::new(),
                repo_name: repo.map(str::to_string),
            },
        }
    }

    #[tokio::test]
    async fn test_ensure_collection_idempotent() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .ensure_collection("c", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_ensure_collection_rejects_dims_mismatch() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        let err = store
            .ensure_collection("c", 4, DistanceMetric::Cosine)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimensions"));
    }

    #[tokio::test]
    async fn test_upsert_rejects_wrong_vector_length() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 3, DistanceMetric::Cosine)
            .await
            .unwrap();
        let result = store
            .upsert("c", &[record("a", vec![1.0, 0.0], "f.md", None)])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 2, DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .upsert(
                "c",
                &[
                    record("near", vec![1.0, 0.1], "a.md", None),
                    record("far", vec![0.0, 1.0], "b.md", None),
                ],
            )
            .await
            .unwrap();

        let hits = store.search("c", &[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].payload.filename, "a.md");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_search_honors_filter() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 2, DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .upsert(
                "c",
                &[
                    record("a", vec![1.0, 0.0], "a.md", Some("docs")),
                    record("b", vec![1.0, 0.0], "b.md", Some("other")),
                ],
            )
            .await
            .unwrap();

        let filter = PayloadFilter::repo("docs");
        let hits = store
            .search("c", &[1.0, 0.0], 10, Some(&filter))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].payload.filename, "a.md");
    }

    #[tokio::test]
    async fn test_delete_by_filter_counts_and_tolerates_zero_matches() {
        let store = MemoryStore::new();
        store
            .ensure_collection("c", 2, DistanceMetric::Cosine)
            .await
            .unwrap();
        store
            .upsert(
                "c",
                &[
                    record("a", vec![1.0, 0.0], "a.md", None),
                    record("b", vec![0.0, 1.0], "a.md", None),
                    record("c", vec![0.5, 0.5], "b.md", None),
                ],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_by_filter("c", &PayloadFilter::filename("a.md"))
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        // Second delete matches nothing and still succeeds.
        let deleted = store
            .delete_by_filter("c", &PayloadFilter::filename("a.md"))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
