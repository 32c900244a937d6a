//! GraphRAG retriever - per-database schema graphs behind one retrieval call
//!
//! Graphs are built eagerly for the allow-listed databases when the
//! retriever is created and are read-only afterwards, so one retriever can
//! serve concurrent questions without locking.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use serde::Serialize;
use crate::catalog::SchemaCatalog;
use crate::graph::SchemaGraph;
use crate::retrieval::embedding::EmbeddingProvider;
use crate::retrieval::ranking::{RankedTables, RankingOptions};
use crate::Result;

pub const DATABASE_NOT_FOUND: &str = "database not found";
pub const NO_RELEVANT_TABLES: &str = "no relevant tables found";

/// Parameters of one retrieval call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalRequest {
    /// Skip ranking and return the whole schema
    pub use_full_schema: bool,
    pub top_k: usize,
    pub keyword_weight: f64,
    pub embedding_weight: f64,
    pub min_score: Option<f64>,
}

impl Default for RetrievalRequest {
    fn default() -> Self {
        let ranking = RankingOptions::default();
        Self {
            use_full_schema: false,
            top_k: ranking.top_k,
            keyword_weight: ranking.keyword_weight,
            embedding_weight: ranking.embedding_weight,
            min_score: ranking.min_score,
        }
    }
}

impl RetrievalRequest {
    pub fn full_schema() -> Self {
        Self {
            use_full_schema: true,
            ..Self::default()
        }
    }

    pub fn ranking_options(&self) -> RankingOptions {
        RankingOptions {
            top_k: self.top_k,
            keyword_weight: self.keyword_weight,
            embedding_weight: self.embedding_weight,
            min_score: self.min_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    pub keyword: f64,
    pub embedding: f64,
}

/// How the schema text of a retrieval was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetrievalMode {
    FullSchema,
    FallbackFullSchema {
        reason: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    HybridRetrieval {
        relevant_tables: Vec<String>,
        /// Scores of the selected tables only
        scores: BTreeMap<String, f64>,
        total_tables: usize,
        retrieved_tables: usize,
        weights: Weights,
    },
}

/// Metadata returned alongside schema text.
///
/// Serializes to `{"error": "database not found"}` or to a
/// `{"mode": ...}` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RetrievalMetadata {
    NotFound { error: String },
    Retrieved(RetrievalMode),
}

impl RetrievalMetadata {
    pub fn database_not_found() -> Self {
        RetrievalMetadata::NotFound {
            error: DATABASE_NOT_FOUND.to_string(),
        }
    }

    pub fn is_database_not_found(&self) -> bool {
        matches!(self, RetrievalMetadata::NotFound { .. })
    }

    /// `full_schema`, `fallback_full_schema` or `hybrid_retrieval`
    pub fn mode(&self) -> Option<&'static str> {
        match self {
            RetrievalMetadata::NotFound { .. } => None,
            RetrievalMetadata::Retrieved(RetrievalMode::FullSchema) => Some("full_schema"),
            RetrievalMetadata::Retrieved(RetrievalMode::FallbackFullSchema { .. }) => Some("fallback_full_schema"),
            RetrievalMetadata::Retrieved(RetrievalMode::HybridRetrieval { .. }) => Some("hybrid_retrieval"),
        }
    }

    pub fn relevant_tables(&self) -> &[String] {
        match self {
            RetrievalMetadata::Retrieved(RetrievalMode::HybridRetrieval { relevant_tables, .. }) => relevant_tables,
            _ => &[],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Schema text for a prompt plus how it was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSchema {
    pub schema_text: String,
    pub metadata: RetrievalMetadata,
    /// Per-table score breakdown when tables were ranked
    #[serde(skip)]
    pub ranking: Option<RankedTables>,
}

impl RetrievedSchema {
    fn new(schema_text: String, mode: RetrievalMode) -> Self {
        Self {
            schema_text,
            metadata: RetrievalMetadata::Retrieved(mode),
            ranking: None,
        }
    }

    fn with_ranking(mut self, ranking: RankedTables) -> Self {
        self.ranking = Some(ranking);
        self
    }
}

/// A database that could not be loaded from the catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub db_id: String,
    pub reason: String,
}

/// Schema retriever over one or more databases.
pub struct GraphRagRetriever {
    schema_graphs: HashMap<String, SchemaGraph>,
    /// Loaded databases in catalog order
    database_ids: Vec<String>,
    load_failures: Vec<LoadFailure>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl GraphRagRetriever {
    /// Build graphs for every catalog database in `allow_list` (all when `None`).
    ///
    /// A malformed catalog entry is logged and recorded in
    /// [`load_failures`](Self::load_failures) without affecting the other
    /// databases. An embedding failure aborts construction.
    pub fn new(
        catalog: &SchemaCatalog,
        allow_list: Option<&[String]>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let mut schema_graphs = HashMap::new();
        let mut database_ids = Vec::new();
        let mut load_failures = Vec::new();

        if let Some(ids) = allow_list {
            for id in ids.iter().filter(|id| !catalog.contains(id)) {
                tracing::warn!("Database {} is not in the schema catalog", id);
            }
        }

        for (db_id, descriptor) in catalog.descriptors(allow_list) {
            let descriptor = match descriptor {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::warn!("Skipping database {}: {}", db_id, e);
                    load_failures.push(LoadFailure {
                        db_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            tracing::info!("Loading database {}", db_id);
            let graph = SchemaGraph::build(&descriptor, provider.as_ref())?;
            database_ids.push(db_id.clone());
            schema_graphs.insert(db_id, graph);
        }

        tracing::info!("Loaded {} databases", schema_graphs.len());
        Ok(Self {
            schema_graphs,
            database_ids,
            load_failures,
            provider,
        })
    }

    /// Load a catalog file and build the retriever
    pub fn from_path(
        path: &Path,
        allow_list: Option<&[String]>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let catalog = SchemaCatalog::from_path(path)?;
        Self::new(&catalog, allow_list, provider)
    }

    pub fn database_ids(&self) -> &[String] {
        &self.database_ids
    }

    pub fn load_failures(&self) -> &[LoadFailure] {
        &self.load_failures
    }

    pub fn graph(&self, db_id: &str) -> Option<&SchemaGraph> {
        self.schema_graphs.get(db_id)
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Select the schema text relevant to `question`.
    ///
    /// An unknown database is reported in the metadata with empty schema
    /// text. `Err` is returned only when embedding the question fails;
    /// callers are expected to fall back to the full schema then.
    pub fn retrieve_relevant_schema(
        &self,
        db_id: &str,
        question: &str,
        request: &RetrievalRequest,
    ) -> Result<RetrievedSchema> {
        let Some(graph) = self.schema_graphs.get(db_id) else {
            tracing::warn!("Database {} not found", db_id);
            return Ok(RetrievedSchema {
                schema_text: String::new(),
                metadata: RetrievalMetadata::database_not_found(),
                ranking: None,
            });
        };

        if request.use_full_schema {
            tracing::info!("Using full schema for {}", db_id);
            return Ok(RetrievedSchema::new(graph.full_schema(), RetrievalMode::FullSchema));
        }

        let ranked = graph.rank_tables(question, self.provider.as_ref(), &request.ranking_options())?;

        if ranked.is_empty() {
            tracing::warn!("No relevant tables found in {}, falling back to full schema", db_id);
            return Ok(RetrievedSchema::new(
                graph.full_schema(),
                RetrievalMode::FallbackFullSchema {
                    reason: NO_RELEVANT_TABLES.to_string(),
                    error: None,
                },
            )
            .with_ranking(ranked));
        }

        let scores: BTreeMap<String, f64> = ranked
            .tables
            .iter()
            .filter_map(|t| ranked.score(t).map(|s| (t.clone(), s)))
            .collect();

        Ok(RetrievedSchema::new(
            graph.schema_subgraph(&ranked.tables),
            RetrievalMode::HybridRetrieval {
                retrieved_tables: ranked.tables.len(),
                relevant_tables: ranked.tables.clone(),
                scores,
                total_tables: graph.table_count(),
                weights: Weights {
                    keyword: request.keyword_weight,
                    embedding: request.embedding_weight,
                },
            },
        )
        .with_ranking(ranked))
    }

    /// Whole schema text of a loaded database
    pub fn full_schema(&self, db_id: &str) -> Option<String> {
        self.schema_graphs.get(db_id).map(SchemaGraph::full_schema)
    }

    /// Foreign-key hint block; empty for unknown databases or no foreign keys
    pub fn foreign_key_hints(&self, db_id: &str) -> String {
        self.schema_graphs
            .get(db_id)
            .map(SchemaGraph::foreign_key_hints)
            .unwrap_or_default()
    }
}
