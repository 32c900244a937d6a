use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::retrieval::RetrievalRequest;

pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SqlragConfig {
    /// Schema catalog (JSON) path
    pub catalog: Option<String>,
    /// Databases to load; all catalog entries when unset
    pub databases: Option<Vec<String>>,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAi,
    Local,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Resolved key; never written to disk
    #[serde(skip)]
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Hashing backend only
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            model: None,
            base_url: None,
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_string()),
            api_key: None,
            timeout_secs: Some(30),
            dimensions: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn hashing() -> Self {
        Self {
            backend: EmbeddingBackend::Hashing,
            ..Self::default()
        }
    }

    /// Fill `api_key` from the environment variable named by `api_key_env`
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.is_none() {
            if let Some(var) = &self.api_key_env {
                self.api_key = std::env::var(var).ok().filter(|k| !k.is_empty());
            }
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Use schema retrieval when building agent prompts
    pub enabled: bool,
    pub use_full_schema: bool,
    pub top_k: usize,
    pub keyword_weight: f64,
    pub embedding_weight: f64,
    pub min_score: Option<f64>,
    pub foreign_key_hints: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let request = RetrievalRequest::default();
        Self {
            enabled: true,
            use_full_schema: request.use_full_schema,
            top_k: request.top_k,
            keyword_weight: request.keyword_weight,
            embedding_weight: request.embedding_weight,
            min_score: request.min_score,
            foreign_key_hints: true,
        }
    }
}

impl RetrievalConfig {
    pub fn to_request(&self) -> RetrievalRequest {
        RetrievalRequest {
            use_full_schema: self.use_full_schema,
            top_k: self.top_k,
            keyword_weight: self.keyword_weight,
            embedding_weight: self.embedding_weight,
            min_score: self.min_score,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("sqlrag.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<SqlragConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: SqlragConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &SqlragConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("sqlrag.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlrag.toml");
        let config = SqlragConfig {
            catalog: Some("tables.json".to_string()),
            databases: Some(vec!["concert_singer".to_string()]),
            embedding: EmbeddingConfig::hashing(),
            retrieval: RetrievalConfig {
                min_score: Some(0.1),
                ..RetrievalConfig::default()
            },
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlrag.toml");
        std::fs::write(&path, "catalog = \"t.json\"\n[retrieval]\ntop_k = 3\n[embedding]\nbackend = \"local\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(config.embedding.api_key_env.as_deref(), Some(DEFAULT_API_KEY_ENV));

        let request = config.retrieval.to_request();
        assert_eq!(request.top_k, 3);
        assert_eq!(request.keyword_weight, 0.4);
        assert_eq!(request.embedding_weight, 0.6);
        assert!(request.min_score.is_none());
        assert!(config.retrieval.enabled);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlrag.toml");
        std::fs::write(&path, "[embedding]\nbackend = \"word2vec\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_api_key_from_named_env() {
        let config = EmbeddingConfig {
            api_key_env: Some("SQLRAG_TEST_KEY_THAT_IS_NOT_SET".to_string()),
            ..EmbeddingConfig::default()
        };
        assert!(config.with_env_api_key().api_key.is_none());

        let config = EmbeddingConfig {
            api_key: Some("sk-explicit".to_string()),
            ..EmbeddingConfig::default()
        };
        assert_eq!(config.with_env_api_key().api_key.as_deref(), Some("sk-explicit"));
    }
}
