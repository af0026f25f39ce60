use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub qdrant: QdrantConfig,
    pub ledger: LedgerConfig,
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_url")]
    pub base_url: String,
    /// Path of the catalog endpoint, appended to `base_url`.
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_collection() -> String {
    "datasets".to_string()
}
fn default_ledger_url() -> String {
    "http://localhost:1317".to_string()
}
fn default_catalog_path() -> String {
    "/datasets/dataset".to_string()
}
fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_interval_secs() -> u64 {
    30
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_url: default_ledger_url(),
            catalog_path: default_catalog_path(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dims: default_dims(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

/// Load configuration from a TOML file, falling back to full defaults when
/// the file does not exist. The embedding credential is never read from the
/// file — only from `OPENAI_API_KEY` in the environment.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.sync.interval_secs == 0 {
        anyhow::bail!("sync.interval_secs must be > 0");
    }

    if config.qdrant.collection.is_empty() {
        anyhow::bail!("qdrant.collection must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.qdrant.url, "http://localhost:6333");
        assert_eq!(config.qdrant.collection, "datasets");
        assert_eq!(config.ledger.base_url, "http://localhost:1317");
        assert_eq!(config.embedding.dims, 1536);
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.sync.interval_secs, 30);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [qdrant]
            collection = "gov_datasets"

            [sync]
            interval_secs = 60
            "#,
        )
        .unwrap();
        assert_eq!(config.qdrant.collection, "gov_datasets");
        assert_eq!(config.qdrant.url, "http://localhost:6333");
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = load_config(Path::new("/nonexistent/catalog.toml")).unwrap();
        assert_eq!(config.embedding.dims, 1536);
    }
}
