//! Qdrant [`VectorStore`] adapter over the REST API.
//!
//! Qdrant returns similarity scores directly for cosine collections, so
//! search scores pass through unnormalized. The delete endpoint does not
//! report how many points matched, so [`delete_by_filter`] counts the
//! matching points first (`points/count` with `exact: true`) and then
//! deletes them.
//!
//! [`delete_by_filter`]: VectorStore::delete_by_filter

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::models::{DistanceMetric, PayloadFilter, StoredRecord};

use super::{ScoredHit, VectorStore};

pub struct QdrantStore {
    client: reqwest::Client,
    url: String,
}

impl QdrantStore {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Map a [`PayloadFilter`] to Qdrant's must-clause conjunction.
    fn to_qdrant_filter(filter: &PayloadFilter) -> serde_json::Value {
        let mut must = Vec::new();
        if let Some(ref filename) = filter.filename {
            must.push(json!({ "key": "filename", "match": { "value": filename } }));
        }
        if let Some(ref repo) = filter.repo_name {
            must.push(json!({ "key": "repoName", "match": { "value": repo } }));
        }
        json!({ "must": must })
    }

    /// Unwrap a Qdrant response envelope, surfacing API errors.
    async fn read_result(response: reqwest::Response, what: &str) -> Result<serde_json::Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Qdrant {} error {}: {}", what, status, body);
        }
        let json: serde_json::Value = response.json().await?;
        Ok(json.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dims: usize,
        metric: DistanceMetric,
    ) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/collections/{}", self.url, name))
            .send()
            .await?;

        if response.status().is_success() {
            let result = Self::read_result(response, "collection info").await?;
            let existing = result
                .pointer("/config/params/vectors/size")
                .and_then(|v| v.as_u64());
            match existing {
                Some(size) if size as usize == dims => return Ok(()),
                Some(size) => bail!(
                    "Collection '{}' exists with {} dimensions, requested {}",
                    name,
                    size,
                    dims
                ),
                None => bail!(
                    "Collection '{}' exists but its vector configuration could not be read",
                    name
                ),
            }
        }

        let body = json!({
            "vectors": {
                "size": dims,
                "distance": metric.as_qdrant(),
            }
        });
        let response = self
            .client
            .put(format!("{}/collections/{}", self.url, name))
            .json(&body)
            .send()
            .await?;
        Self::read_result(response, "create collection").await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[StoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.id,
                    "vector": r.vector,
                    "payload": r.payload,
                })
            })
            .collect();

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.url, collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::read_result(response, "upsert").await?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredHit>> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(f) = filter.filter(|f| !f.is_empty()) {
            body["filter"] = Self::to_qdrant_filter(f);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.url, collection
            ))
            .json(&body)
            .send()
            .await?;
        let result = Self::read_result(response, "search").await?;

        let hits = result
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant search response: expected array"))?;

        let mut scored = Vec::with_capacity(hits.len());
        for hit in hits {
            let score = hit.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0) as f32;
            let payload = hit
                .get("payload")
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Invalid Qdrant search hit: missing payload"))?;
            scored.push(ScoredHit {
                payload: serde_json::from_value(payload)?,
                score,
            });
        }
        Ok(scored)
    }

    async fn delete_by_filter(&self, collection: &str, filter: &PayloadFilter) -> Result<u64> {
        let qdrant_filter = Self::to_qdrant_filter(filter);

        // Qdrant's delete response carries no match count, so count first.
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.url, collection
            ))
            .json(&json!({ "filter": qdrant_filter, "exact": true }))
            .send()
            .await?;
        let result = Self::read_result(response, "count").await?;
        let count = result.get("count").and_then(|c| c.as_u64()).unwrap_or(0);

        if count == 0 {
            return Ok(0);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.url, collection
            ))
            .json(&json!({ "filter": qdrant_filter }))
            .send()
            .await?;
        Self::read_result(response, "delete").await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_conjunction_shape() {
        let filter = PayloadFilter::filename("f.md").with_repo(Some("docs"));
        let json = QdrantStore::to_qdrant_filter(&filter);
        let must = json["must"].as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "filename");
        assert_eq!(must[0]["match"]["value"], "f.md");
        assert_eq!(must[1]["key"], "repoName");
        assert_eq!(must[1]["match"]["value"], "docs");
    }
}
