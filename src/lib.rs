//! # sqlrag - schema retrieval for text-to-SQL agents
//!
//! Builds a per-database graph over tables, columns and foreign keys and
//! selects the part of a schema that is relevant to a natural-language
//! question.
//!
//! sqlrag provides:
//! - Schema catalog loading (Spider-style `tables.json`, SQLite introspection)
//! - An immutable schema graph with per-table embeddings
//! - Hybrid keyword + embedding ranking with one-hop foreign-key propagation
//! - A retriever with full-schema fallback for agent prompts

pub mod catalog;
pub mod node;
pub mod edge;
pub mod graph;
pub mod retrieval;
pub mod agent;
pub mod config;
pub mod output;
pub mod ui;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenient access
pub use catalog::{SchemaCatalog, SchemaDescriptor};
pub use edge::{Edge, EdgeKind, ForeignKey};
pub use graph::SchemaGraph;
pub use node::{NodeId, NodeKind};
pub use retrieval::{
    EmbeddingProvider, GraphRagRetriever, RetrievalMetadata, RetrievalRequest, RetrievedSchema,
};

/// Result type alias for sqlrag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqlrag operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema load error for '{db_id}': {reason}")]
    SchemaLoad { db_id: String, reason: String },

    #[error("Embedding provider error: {0}")]
    Embedding(String),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Catalog parse error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn schema_load(db_id: &str, reason: impl Into<String>) -> Self {
        Error::SchemaLoad {
            db_id: db_id.to_string(),
            reason: reason.into(),
        }
    }
}
