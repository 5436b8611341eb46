use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::ChunkOptions;
use crate::models::DistanceMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Backend name: `qdrant`, `chroma`, or `memory`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Distance metric declared at collection creation: `cosine`,
    /// `euclid`, or `dot`.
    #[serde(default = "default_distance")]
    pub distance: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            url: default_store_url(),
            collection: default_collection(),
            distance: default_distance(),
        }
    }
}

fn default_store_backend() -> String {
    "qdrant".to_string()
}
fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "markdown_docs".to_string()
}
fn default_distance() -> String {
    "cosine".to_string()
}

impl StoreConfig {
    pub fn distance_metric(&self) -> Result<DistanceMetric> {
        match self.distance.as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "euclid" => Ok(DistanceMetric::Euclid),
            "dot" => Ok(DistanceMetric::Dot),
            other => anyhow::bail!(
                "Unknown distance metric: '{}'. Must be cosine, euclid, or dot.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Provider name: `ollama` or `openai`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Output dimensionality; must equal the collection's declared
    /// dimensionality exactly.
    #[serde(default = "default_dims")]
    pub dims: usize,
    /// Base URL for the Ollama host. Ignored by the OpenAI provider.
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            dims: default_dims(),
            url: default_ollama_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_dims() -> usize {
    768
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_overlap() -> usize {
    200
}

impl ChunkingConfig {
    pub fn options(&self) -> ChunkOptions {
        ChunkOptions {
            chunk_size: self.chunk_size,
            overlap: self.overlap,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Characters of content shown in find-similar previews.
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_preview_chars() -> usize {
    200
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }
    match config.embedding.provider.as_str() {
        "ollama" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be ollama or openai.",
            other
        ),
    }

    match config.store.backend.as_str() {
        "qdrant" | "chroma" | "memory" => {}
        other => anyhow::bail!(
            "Unknown store backend: '{}'. Must be qdrant, chroma, or memory.",
            other
        ),
    }
    config.store.distance_metric()?;

    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        validate(&config).unwrap();
        assert_eq!(config.store.collection, "markdown_docs");
        assert_eq!(config.embedding.dims, 768);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.search.default_limit, 5);
    }

    #[test]
    fn test_rejects_overlap_at_or_above_chunk_size() {
        let config: Config = toml::from_str(
            "[chunking]\nchunk_size = 100\noverlap = 100\n",
        )
        .unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_provider_and_backend() {
        let config: Config = toml::from_str("[embedding]\nprovider = \"cohere\"\n").unwrap();
        assert!(validate(&config).is_err());

        let config: Config = toml::from_str("[store]\nbackend = \"pinecone\"\n").unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_dims() {
        let config: Config = toml::from_str("[embedding]\ndims = 0\n").unwrap();
        assert!(validate(&config).is_err());
    }
}
