//! Shared fixtures for unit tests

use std::collections::HashMap;
use crate::catalog::SchemaDescriptor;
use crate::retrieval::EmbeddingProvider;
use crate::{Error, Result};

pub fn descriptor(
    db_id: &str,
    tables: &[&str],
    columns: &[(i64, &str)],
    foreign_keys: &[(i64, i64)],
) -> SchemaDescriptor {
    SchemaDescriptor {
        db_id: db_id.to_string(),
        table_names_original: tables.iter().map(|t| t.to_string()).collect(),
        column_names_original: columns.iter().map(|(t, c)| (*t, c.to_string())).collect(),
        foreign_keys: foreign_keys.to_vec(),
    }
}

/// `animal(id, name, species_id)`, `species(id, label)`,
/// `animal.species_id -> species.id`
pub fn zoo_descriptor() -> SchemaDescriptor {
    descriptor(
        "zoo",
        &["Animal", "Species"],
        &[(-1, "*"), (0, "id"), (0, "name"), (0, "species_id"), (1, "id"), (1, "label")],
        &[(3, 4)],
    )
}

/// Returns preset vectors by exact text; unknown texts get a zero vector.
pub struct FixedEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
    batch_limit: Option<usize>,
}

impl FixedEmbeddings {
    pub fn new(entries: Vec<(&str, Vec<f32>)>) -> Self {
        let dimension = entries.first().map(|(_, v)| v.len()).unwrap_or(2);
        Self {
            vectors: entries.into_iter().map(|(t, v)| (t.to_string(), v)).collect(),
            dimension,
            batch_limit: None,
        }
    }

    /// Return at most `limit` vectors per batch
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = Some(limit);
        self
    }
}

impl EmbeddingProvider for FixedEmbeddings {
    fn name(&self) -> &str {
        "fixed"
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let limit = self.batch_limit.unwrap_or(texts.len());
        Ok(texts
            .iter()
            .take(limit)
            .map(|t| {
                self.vectors
                    .get(t)
                    .cloned()
                    .unwrap_or_else(|| vec![0.0; self.dimension])
            })
            .collect())
    }
}

/// Every call fails, like an unreachable backend.
pub struct FailingEmbeddings;

impl EmbeddingProvider for FailingEmbeddings {
    fn name(&self) -> &str {
        "failing"
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::Embedding("connection refused".to_string()))
    }
}
