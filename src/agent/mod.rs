//! Agent construction - schema context for a text-to-SQL agent
//!
//! The agent only sees text: a system prompt carrying either the retrieved
//! subgraph or the full schema. Retrieval is an optional capability; when it
//! is disabled, missing or failing, the agent still gets a full schema.

pub mod context;
pub mod prompt;

pub use context::{AgentContext, AgentContextBuilder, RETRIEVAL_FAILED};

use crate::catalog::SchemaCatalog;
use crate::retrieval::{GraphRagRetriever, RetrievalRequest, RetrievedSchema};
use crate::Result;

/// Question-aware schema selection.
pub trait SchemaRetriever: Send + Sync {
    fn retrieve_relevant_schema(&self, db_id: &str, question: &str, request: &RetrievalRequest) -> Result<RetrievedSchema>;

    /// Whole schema of a known database
    fn full_schema(&self, db_id: &str) -> Option<String>;

    /// Foreign-key hint block, empty when there is nothing to hint
    fn foreign_key_hints(&self, db_id: &str) -> String;
}

/// Static schema text, used without retrieval or as a fallback.
pub trait SchemaSource: Send + Sync {
    fn schema_text(&self, db_id: &str) -> Option<String>;
}

impl SchemaRetriever for GraphRagRetriever {
    fn retrieve_relevant_schema(&self, db_id: &str, question: &str, request: &RetrievalRequest) -> Result<RetrievedSchema> {
        GraphRagRetriever::retrieve_relevant_schema(self, db_id, question, request)
    }

    fn full_schema(&self, db_id: &str) -> Option<String> {
        GraphRagRetriever::full_schema(self, db_id)
    }

    fn foreign_key_hints(&self, db_id: &str) -> String {
        GraphRagRetriever::foreign_key_hints(self, db_id)
    }
}

impl SchemaSource for SchemaCatalog {
    fn schema_text(&self, db_id: &str) -> Option<String> {
        match self.descriptor(db_id) {
            Ok(descriptor) => Some(descriptor.to_schema_text()),
            Err(e) => {
                tracing::debug!("No static schema for {}: {}", db_id, e);
                None
            }
        }
    }
}
