//! End-to-end pipeline tests over the in-memory store.
//!
//! These exercise the public API the way the server does: ingest markdown
//! through the service, then search, replace, and delete. A deterministic
//! bag-of-words provider stands in for a real embedding model, so
//! near-duplicate text scores higher than unrelated text without any
//! network dependency.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use markdown_rag::config::{load_config, Config};
use markdown_rag::embedding::EmbeddingProvider;
use markdown_rag::service::KnowledgeService;
use markdown_rag::store::memory::MemoryStore;

const DIMS: usize = 16;

struct BagOfWordsProvider;

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    for word in text.to_lowercase().split_whitespace() {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        v[(hasher.finish() % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsProvider {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }
    fn dims(&self) -> usize {
        DIMS
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

fn service() -> KnowledgeService {
    let config: Config = toml::from_str(
        r#"
        [store]
        backend = "memory"
        [chunking]
        chunk_size = 200
        overlap = 40
        "#,
    )
    .unwrap();
    KnowledgeService::new(
        Arc::new(BagOfWordsProvider),
        Arc::new(MemoryStore::new()),
        &config,
    )
    .unwrap()
}

#[tokio::test]
async fn round_trip_prefers_near_duplicate_over_unrelated() {
    let service = service();
    service.init().await.unwrap();

    service
        .ingest(
            "# Deployment\nrolling restarts drain connections before stopping pods",
            "deploy.md",
            Some("ops"),
            false,
        )
        .await
        .unwrap();
    service
        .ingest(
            "# Recipes\nslow roasted tomatoes with garlic and olive oil",
            "cooking.md",
            Some("kitchen"),
            false,
        )
        .await
        .unwrap();

    let results = service
        .search("rolling restarts drain connections", 2, None)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].filename, "deploy.md");
    assert_eq!(results[0].source(), "deploy.md > Deployment");
}

#[tokio::test]
async fn scores_come_back_descending() {
    let service = service();
    service.init().await.unwrap();

    for (name, body) in [
        ("a.md", "alpha beta gamma delta"),
        ("b.md", "alpha beta unrelated words"),
        ("c.md", "completely different topic entirely"),
    ] {
        service.ingest(body, name, None, false).await.unwrap();
    }

    let results = service.search("alpha beta gamma", 10, None).await.unwrap();
    assert_eq!(results.len(), 3);
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn delete_removes_every_record_for_the_file() {
    let service = service();
    service.init().await.unwrap();

    let doc = "# One\nfirst section text here\n# Two\nsecond section text here\n".repeat(5);
    let outcome = service
        .ingest(&doc, "big.md", Some("docs"), false)
        .await
        .unwrap();
    assert!(outcome.chunks > 1);

    let deleted = service.delete_file("big.md", Some("docs")).await.unwrap();
    assert_eq!(deleted as usize, outcome.chunks);

    let results = service
        .search("first section text", 10, Some("docs"))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn replace_never_leaves_stale_records() {
    let service = service();
    service.init().await.unwrap();

    let v1 = "# Guide\nthe old instructions said to use the legacy endpoint\n".repeat(4);
    service.ingest(&v1, "guide.md", None, true).await.unwrap();

    let v2 = "# Guide\nuse the new endpoint";
    let outcome = service.ingest(v2, "guide.md", None, true).await.unwrap();
    assert!(outcome.deleted > 0);

    let results = service.search("endpoint instructions", 50, None).await.unwrap();
    assert_eq!(results.len(), outcome.chunks);
    assert!(results.iter().all(|r| r.content.contains("new endpoint")));
}

#[tokio::test]
async fn repo_filter_isolates_namespaces() {
    let service = service();
    service.init().await.unwrap();

    service
        .ingest("shared words here", "a.md", Some("one"), false)
        .await
        .unwrap();
    service
        .ingest("shared words here", "a.md", Some("two"), false)
        .await
        .unwrap();

    let scoped = service.search("shared words", 10, Some("one")).await.unwrap();
    assert!(scoped.iter().all(|r| r.repo_name.as_deref() == Some("one")));

    // Delete in one namespace leaves the other intact.
    service.delete_file("a.md", Some("one")).await.unwrap();
    let remaining = service.search("shared words", 10, None).await.unwrap();
    assert!(!remaining.is_empty());
    assert!(remaining.iter().all(|r| r.repo_name.as_deref() == Some("two")));
}

#[tokio::test]
async fn every_nonblank_line_survives_chunking() {
    let service = service();
    service.init().await.unwrap();

    let doc: String = (0..40)
        .map(|i| format!("line number {:02} with some filler text\n", i))
        .collect();
    service.ingest(&doc, "lines.md", None, false).await.unwrap();

    let results = service.search("line number filler", 100, None).await.unwrap();
    let stored: String = results.iter().map(|r| r.content.as_str()).collect::<Vec<_>>().join("\n");
    for i in 0..40 {
        assert!(
            stored.contains(&format!("line number {:02}", i)),
            "line {} missing from stored chunks",
            i
        );
    }
}

#[test]
fn config_loads_from_disk_and_validates() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("mdrag.toml");
    fs::write(
        &path,
        r#"
        [server]
        bind = "127.0.0.1:7431"

        [store]
        backend = "qdrant"
        collection = "team_docs"

        [embedding]
        provider = "ollama"
        model = "nomic-embed-text"
        dims = 768

        [chunking]
        chunk_size = 800
        overlap = 150
        "#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:7431");
    assert_eq!(config.store.collection, "team_docs");
    assert_eq!(config.chunking.chunk_size, 800);

    fs::write(&path, "[chunking]\nchunk_size = 100\noverlap = 200\n").unwrap();
    assert!(load_config(&path).is_err());
}
