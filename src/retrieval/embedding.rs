//! Embedding providers
//!
//! A provider turns text into fixed-length vectors compared by cosine
//! similarity. Table descriptions are embedded once per database in one
//! batch; each question is embedded once per retrieval.

use std::sync::Arc;
use std::time::Duration;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde::Deserialize;
use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::retrieval::keyword::tokenize;
use crate::{Error, Result};

pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-large";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// Converts text into embedding vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Embed a batch of texts, one vector per input, in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding(format!("{} returned no vector", self.name())))
    }
}

/// Check that a batch has one vector per input and a single non-zero dimension.
pub fn check_batch(provider: &str, inputs: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != inputs {
        return Err(Error::Embedding(format!(
            "{} returned {} embeddings for {} inputs",
            provider,
            vectors.len(),
            inputs
        )));
    }
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if dim == 0 || vectors.iter().any(|v| v.len() != dim) {
            return Err(Error::Embedding(format!("{} returned vectors of inconsistent dimension", provider)));
        }
    }
    Ok(())
}

/// Build the provider selected by an embedding configuration
pub fn provider_from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.backend {
        EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbeddings::new(
            config.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_BASE_URL),
            config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL),
            config.api_key.clone(),
            config.timeout_secs.map(Duration::from_secs),
        )?),
        EmbeddingBackend::Local => Arc::new(LocalEmbeddings::new(
            config.model.as_deref().unwrap_or(DEFAULT_LOCAL_MODEL),
        )?),
        EmbeddingBackend::Hashing => Arc::new(HashingEmbeddings::new(
            config.dimensions.unwrap_or(DEFAULT_HASHING_DIMENSIONS),
        )),
    };
    tracing::debug!("Using embedding provider {}", provider.name());
    Ok(provider)
}

// ========== OpenAI-compatible HTTP ==========

/// Embeddings from an OpenAI-compatible `/embeddings` endpoint
pub struct OpenAiEmbeddings {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Embedding(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .map_err(|e| Error::Embedding(format!("failed to reach {}: {}", self.url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().unwrap_or_default();
            return Err(Error::Embedding(format!("{} returned {}: {}", self.url, status, text)));
        }

        let mut out: EmbeddingsResponse = resp
            .json()
            .map_err(|e| Error::Embedding(format!("{} returned invalid JSON: {}", self.url, e)))?;
        out.data.sort_by_key(|d| d.index);

        let vectors: Vec<Vec<f32>> = out.data.into_iter().map(|d| d.embedding).collect();
        check_batch(&self.model, texts.len(), &vectors)?;
        Ok(vectors)
    }
}

// ========== Local transformer model ==========

/// Embeddings from a local transformer model
pub struct LocalEmbeddings {
    model: TextEmbedding,
    model_name: String,
}

impl LocalEmbeddings {
    /// Load a local model by name (downloaded on first use)
    pub fn new(model_name: &str) -> Result<Self> {
        let mut options = InitOptions::default();
        options.model_name = local_model(model_name)?;
        options.show_download_progress = true;

        let model = TextEmbedding::try_new(options)
            .map_err(|e| Error::Embedding(format!("Failed to load embedding model: {}", e)))?;

        Ok(Self {
            model,
            model_name: model_name.to_string(),
        })
    }
}

fn local_model(name: &str) -> Result<EmbeddingModel> {
    match name.to_lowercase().as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        _ => Err(Error::Config(format!("Unknown local embedding model: {}", name))),
    }
}

impl EmbeddingProvider for LocalEmbeddings {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::Embedding(format!("Embedding generation failed: {}", e)))?;

        check_batch(&self.model_name, texts.len(), &embeddings)?;
        Ok(embeddings)
    }
}

// ========== Feature hashing ==========

/// Deterministic offline embeddings: lowercase word tokens hashed into
/// signed buckets, L2-normalized.
///
/// Only lexical overlap is captured. Useful when no model is reachable.
pub struct HashingEmbeddings {
    dimensions: usize,
}

impl HashingEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&bytes[..8]);
            let idx = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for HashingEmbeddings {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::ranking::cosine_similarity;

    #[test]
    fn test_hashing_is_deterministic() {
        let provider = HashingEmbeddings::new(64);
        let a = provider.embed_one("animal columns: id, name").unwrap();
        let b = provider.embed_one("animal columns: id, name").unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_reflects_overlap() {
        let provider = HashingEmbeddings::new(256);
        let question = provider.embed_one("which animal is named leo").unwrap();
        let animal = provider.embed_one("animal columns: id, name, species_id").unwrap();
        let empty = provider.embed_one("").unwrap();

        assert!(cosine_similarity(&question, &animal) > 0.0);
        assert!(empty.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&question, &empty), 0.0);
    }

    #[test]
    fn test_check_batch() {
        assert!(check_batch("p", 2, &[vec![1.0], vec![0.5]]).is_ok());
        assert!(matches!(check_batch("p", 2, &[vec![1.0]]), Err(Error::Embedding(_))));
        assert!(matches!(check_batch("p", 2, &[vec![1.0], vec![0.5, 0.1]]), Err(Error::Embedding(_))));
        assert!(matches!(check_batch("p", 1, &[vec![]]), Err(Error::Embedding(_))));
    }

    #[test]
    fn test_unknown_local_model() {
        assert!(matches!(local_model("not-a-model"), Err(Error::Config(_))));
        assert!(local_model("All-MiniLM-L6-v2").is_ok());
    }

    #[test]
    fn test_provider_from_config() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Hashing,
            dimensions: Some(32),
            ..EmbeddingConfig::default()
        };
        let provider = provider_from_config(&config).unwrap();
        assert_eq!(provider.name(), "hashing");
        assert_eq!(provider.embed_one("x").unwrap().len(), 32);
    }

    #[test]
    fn test_unreachable_endpoint_is_embedding_error() {
        let provider = OpenAiEmbeddings::new(
            "http://127.0.0.1:9",
            DEFAULT_OPENAI_MODEL,
            None,
            Some(Duration::from_millis(500)),
        )
        .unwrap();
        let result = provider.embed_one("question");
        assert!(matches!(result, Err(Error::Embedding(_))));
    }
}
