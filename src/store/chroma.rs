//! ChromaDB [`VectorStore`] adapter over the REST API.
//!
//! Chroma returns L2 distances, so search scores are normalized to
//! `1 / (1 + distance)` before leaving the adapter. Chroma collections do
//! not declare a fixed dimensionality, so the requested dimensionality is
//! recorded in collection metadata at creation time and checked against it
//! on later [`ensure_collection`] calls; a collection created outside this
//! service surfaces a mismatch as an add/query error from the backend.
//!
//! Chroma's delete endpoint does not filter server-side the way Qdrant's
//! does, so [`delete_by_filter`] fetches matching ids first and then
//! deletes by id, mirroring the count in the return value.
//!
//! [`ensure_collection`]: VectorStore::ensure_collection
//! [`delete_by_filter`]: VectorStore::delete_by_filter

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::models::{DistanceMetric, PayloadFilter, RecordPayload, StoredRecord};

use super::{ScoredHit, VectorStore};

pub struct ChromaStore {
    client: reqwest::Client,
    url: String,
    /// Collection name → Chroma collection UUID, resolved lazily.
    ids: RwLock<HashMap<String, String>>,
}

impl ChromaStore {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            ids: RwLock::new(HashMap::new()),
        })
    }

    /// Map a [`PayloadFilter`] to a Chroma `where` clause.
    fn to_where(filter: &PayloadFilter) -> serde_json::Value {
        let mut clauses = Vec::new();
        if let Some(ref filename) = filter.filename {
            clauses.push(json!({ "filename": filename }));
        }
        if let Some(ref repo) = filter.repo_name {
            clauses.push(json!({ "repoName": repo }));
        }
        match clauses.len() {
            1 => clauses.pop().unwrap(),
            _ => json!({ "$and": clauses }),
        }
    }

    async fn read_json(response: reqwest::Response, what: &str) -> Result<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Chroma {} error {}: {}", what, status, body);
        }
        Ok(response.json().await?)
    }

    /// Resolve the Chroma UUID for a collection name.
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.ids.read().unwrap().get(name) {
            return Ok(id.clone());
        }

        let response = self
            .client
            .get(format!("{}/api/v1/collections/{}", self.url, name))
            .send()
            .await?;
        let json = Self::read_json(response, "get collection").await?;
        let id = json
            .get("id")
            .and_then(|i| i.as_str())
            .ok_or_else(|| anyhow::anyhow!("Collection '{}' not found in Chroma", name))?
            .to_string();

        self.ids
            .write()
            .unwrap()
            .insert(name.to_string(), id.clone());
        Ok(id)
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dims: usize,
        _metric: DistanceMetric,
    ) -> Result<()> {
        let body = json!({
            "name": name,
            "get_or_create": true,
            "metadata": { "dimensions": dims },
        });
        let response = self
            .client
            .post(format!("{}/api/v1/collections", self.url))
            .json(&body)
            .send()
            .await?;
        let json = Self::read_json(response, "create collection").await?;

        if let Some(existing) = json.pointer("/metadata/dimensions").and_then(|d| d.as_u64()) {
            if existing as usize != dims {
                bail!(
                    "Collection '{}' exists with {} dimensions, requested {}",
                    name,
                    existing,
                    dims
                );
            }
        }

        if let Some(id) = json.get("id").and_then(|i| i.as_str()) {
            self.ids
                .write()
                .unwrap()
                .insert(name.to_string(), id.to_string());
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let id = self.collection_id(collection).await?;

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        let embeddings: Vec<&[f32]> = records.iter().map(|r| r.vector.as_slice()).collect();
        let documents: Vec<&str> = records.iter().map(|r| r.payload.content.as_str()).collect();
        let metadatas: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                let mut meta = json!({
                    "filename": r.payload.filename,
                    "heading": r.payload.heading,
                });
                if let Some(ref repo) = r.payload.repo_name {
                    meta["repoName"] = json!(repo);
                }
                meta
            })
            .collect();

        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        });
        let response = self
            .client
            .post(format!("{}/api/v1/collections/{}/add", self.url, id))
            .json(&body)
            .send()
            .await?;
        Self::read_json(response, "add").await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredHit>> {
        let id = self.collection_id(collection).await?;

        let mut body = json!({
            "query_embeddings": [vector],
            "n_results": limit,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            body["where"] = Self::to_where(f);
        }

        let response = self
            .client
            .post(format!("{}/api/v1/collections/{}/query", self.url, id))
            .json(&body)
            .send()
            .await?;
        let json = Self::read_json(response, "query").await?;

        let documents = json.pointer("/documents/0").and_then(|d| d.as_array());
        let metadatas = json.pointer("/metadatas/0").and_then(|m| m.as_array());
        let distances = json.pointer("/distances/0").and_then(|d| d.as_array());
        let (documents, metadatas, distances) = match (documents, metadatas, distances) {
            (Some(d), Some(m), Some(s)) => (d, m, s),
            _ => return Ok(Vec::new()),
        };

        let mut hits = Vec::with_capacity(documents.len());
        for i in 0..documents.len() {
            let content = documents[i].as_str().unwrap_or("").to_string();
            let meta = &metadatas[i];
            let distance = distances.get(i).and_then(|d| d.as_f64()).unwrap_or(0.0);

            hits.push(ScoredHit {
                payload: RecordPayload {
                    content,
                    filename: meta
                        .get("filename")
                        .and_then(|f| f.as_str())
                        .unwrap_or("")
                        .to_string(),
                    heading: meta
                        .get("heading")
                        .and_then(|h| h.as_str())
                        .unwrap_or("")
                        .to_string(),
                    repo_name: meta
                        .get("repoName")
                        .and_then(|r| r.as_str())
                        .map(str::to_string),
                },
                // L2 distance → higher-is-better similarity.
                score: (1.0 / (1.0 + distance)) as f32,
            });
        }
        Ok(hits)
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<u64> {
        let id = self.collection_id(collection).await?;

        let response = self
            .client
            .post(format!("{}/api/v1/collections/{}/get", self.url, id))
            .json(&json!({ "where": Self::to_where(filter), "include": [] }))
            .send()
            .await?;
        let json = Self::read_json(response, "get").await?;

        let ids: Vec<String> = json
            .get("ids")
            .and_then(|i| i.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok(0);
        }

        let count = ids.len() as u64;
        let response = self
            .client
            .post(format!("{}/api/v1/collections/{}/delete", self.url, id))
            .json(&json!({ "ids": ids }))
            .send()
            .await?;
        Self::read_json(response, "delete").await?;

        Ok(count)
    }
}
