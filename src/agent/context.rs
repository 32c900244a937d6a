use serde::Serialize;
use crate::agent::prompt::{self, DEFAULT_DIALECT};
use crate::agent::{SchemaRetriever, SchemaSource};
use crate::retrieval::{RetrievalMetadata, RetrievalMode, RetrievalRequest};

/// Fallback reason recorded when retrieval itself errors
pub const RETRIEVAL_FAILED: &str = "retrieval failed";

/// Everything an agent needs about one database for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentContext {
    pub db_id: String,
    pub question: String,
    pub schema_text: String,
    pub foreign_key_hints: String,
    /// `None` when retrieval was not attempted
    pub metadata: Option<RetrievalMetadata>,
    pub system_prompt: String,
}

/// Builds [`AgentContext`]s, with or without schema retrieval.
pub struct AgentContextBuilder<'a> {
    retriever: Option<&'a dyn SchemaRetriever>,
    schema_source: Option<&'a dyn SchemaSource>,
    use_graphrag: bool,
    request: RetrievalRequest,
    foreign_key_hints: bool,
    dialect: String,
}

impl Default for AgentContextBuilder<'_> {
    fn default() -> Self {
        Self {
            retriever: None,
            schema_source: None,
            use_graphrag: true,
            request: RetrievalRequest::default(),
            foreign_key_hints: true,
            dialect: DEFAULT_DIALECT.to_string(),
        }
    }
}

impl<'a> AgentContextBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retriever(mut self, retriever: &'a dyn SchemaRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Static schema used without retrieval and when retrieval cannot help
    pub fn schema_source(mut self, source: &'a dyn SchemaSource) -> Self {
        self.schema_source = Some(source);
        self
    }

    pub fn use_graphrag(mut self, enabled: bool) -> Self {
        self.use_graphrag = enabled;
        self
    }

    pub fn request(mut self, request: RetrievalRequest) -> Self {
        self.request = request;
        self
    }

    pub fn foreign_key_hints(mut self, enabled: bool) -> Self {
        self.foreign_key_hints = enabled;
        self
    }

    pub fn dialect(mut self, dialect: &str) -> Self {
        self.dialect = dialect.to_string();
        self
    }

    /// Assemble the context for one question.
    ///
    /// Retrieval errors are not surfaced: the context falls back to the
    /// full schema and records the error in its metadata.
    pub fn build(&self, db_id: &str, question: &str) -> AgentContext {
        let (schema_text, foreign_key_hints, metadata) = match self.retriever {
            Some(retriever) if self.use_graphrag => self.retrieve(retriever, db_id, question),
            _ => (self.static_schema(db_id).unwrap_or_default(), String::new(), None),
        };

        if schema_text.is_empty() {
            tracing::warn!("No schema available for {}", db_id);
        }

        let system_prompt = prompt::system_prompt(&self.dialect, &schema_text, &foreign_key_hints);
        AgentContext {
            db_id: db_id.to_string(),
            question: question.to_string(),
            schema_text,
            foreign_key_hints,
            metadata,
            system_prompt,
        }
    }

    fn retrieve(
        &self,
        retriever: &dyn SchemaRetriever,
        db_id: &str,
        question: &str,
    ) -> (String, String, Option<RetrievalMetadata>) {
        let hints = if self.foreign_key_hints {
            retriever.foreign_key_hints(db_id)
        } else {
            String::new()
        };

        match retriever.retrieve_relevant_schema(db_id, question, &self.request) {
            Ok(retrieved) if retrieved.metadata.is_database_not_found() => {
                let schema = self.static_schema(db_id).unwrap_or_default();
                (schema, hints, Some(retrieved.metadata))
            }
            Ok(retrieved) => (retrieved.schema_text, hints, Some(retrieved.metadata)),
            Err(e) => {
                tracing::warn!("Schema retrieval failed for {}, using full schema: {}", db_id, e);
                let schema = retriever
                    .full_schema(db_id)
                    .or_else(|| self.static_schema(db_id))
                    .unwrap_or_default();
                let metadata = RetrievalMetadata::Retrieved(RetrievalMode::FallbackFullSchema {
                    reason: RETRIEVAL_FAILED.to_string(),
                    error: Some(e.to_string()),
                });
                (schema, hints, Some(metadata))
            }
        }
    }

    fn static_schema(&self, db_id: &str) -> Option<String> {
        self.schema_source
            .and_then(|source| source.schema_text(db_id))
            .or_else(|| self.retriever.and_then(|r| r.full_schema(db_id)))
    }
}
