//! Schema Graph - in-memory graph of one database's tables, columns and foreign keys
//!
//! Built once from a catalog entry and never mutated afterwards. Each table
//! carries an embedding of its description, computed in one batch at
//! construction time.

use std::collections::{HashMap, HashSet};
use crate::catalog::{SchemaDescriptor, WILDCARD_TABLE_INDEX};
use crate::edge::{Edge, EdgeKind, ForeignKey};
use crate::node::{ColumnNode, NodeId, TableNode};
use crate::retrieval::embedding::{EmbeddingProvider, check_batch};
use crate::retrieval::keyword;
use crate::retrieval::ranking::{self, RankedTables, RankingOptions, TableScore};
use crate::{Error, Result};

/// Header line of rendered foreign-key hints
pub const FOREIGN_KEY_HINTS_HEADER: &str = "Foreign key relationships:";

/// Schema graph of a single database.
#[derive(Debug)]
pub struct SchemaGraph {
    db_id: String,
    /// Tables in declaration order
    tables: Vec<TableNode>,
    /// Lowercase table name -> position in `tables`
    table_index: HashMap<String, usize>,
    columns: HashMap<NodeId, ColumnNode>,
    /// Original name of the wildcard pseudo-column, if present
    wildcard: Option<String>,
    foreign_keys: Vec<ForeignKey>,
    edges_from: HashMap<NodeId, Vec<Edge>>,
    edges_to: HashMap<NodeId, Vec<Edge>>,
    /// Lowercase table name -> description embedding
    table_embeddings: HashMap<String, Vec<f32>>,
}

impl SchemaGraph {
    /// Build the graph for one database and embed its table descriptions.
    ///
    /// Fails with `SchemaLoad` for an invalid descriptor and with
    /// `Embedding` when the batch embedding fails; no partial graph is
    /// returned.
    pub fn build(descriptor: &SchemaDescriptor, provider: &dyn EmbeddingProvider) -> Result<Self> {
        descriptor.validate()?;
        let mut graph = Self::structure(descriptor);
        graph.compute_embeddings(provider)?;
        Ok(graph)
    }

    fn structure(descriptor: &SchemaDescriptor) -> Self {
        let db_id = descriptor.db_id.clone();
        let mut graph = Self {
            db_id: db_id.clone(),
            tables: Vec::with_capacity(descriptor.table_count()),
            table_index: HashMap::new(),
            columns: HashMap::new(),
            wildcard: None,
            foreign_keys: Vec::new(),
            edges_from: HashMap::new(),
            edges_to: HashMap::new(),
            table_embeddings: HashMap::new(),
        };

        for (i, name) in descriptor.table_names_original.iter().enumerate() {
            let table = TableNode::new(i, name);
            graph.table_index.insert(table.name.clone(), i);
            graph.tables.push(table);
        }

        for (col_idx, (table_idx, col_name)) in descriptor.column_names_original.iter().enumerate() {
            if *table_idx == WILDCARD_TABLE_INDEX {
                graph.wildcard = Some(col_name.clone());
                continue;
            }
            // validate() guarantees the index is in range
            let table_idx = *table_idx as usize;
            let column = ColumnNode::new(col_idx, table_idx, col_name);
            graph.tables[table_idx].columns.push(column.name.clone());
            graph.add_edge(Edge::has_column(column.table, column.id));
            graph.columns.insert(column.id, column);
        }

        for (a, b) in &descriptor.foreign_keys {
            let (Some((from_idx, from_col)), Some((to_idx, to_col))) =
                (descriptor.resolve_column(*a), descriptor.resolve_column(*b))
            else {
                tracing::debug!("{}: skipping foreign key ({}, {}) with an unresolvable endpoint", db_id, a, b);
                continue;
            };

            let fk = ForeignKey {
                from_table: graph.tables[from_idx].name.clone(),
                from_column: from_col.to_lowercase(),
                to_table: graph.tables[to_idx].name.clone(),
                to_column: to_col.to_lowercase(),
            };
            graph.add_edge(Edge::foreign_key(
                NodeId::table(from_idx),
                NodeId::table(to_idx),
                &fk.from_column,
                &fk.to_column,
            ));
            graph.foreign_keys.push(fk);
        }

        graph
    }

    fn add_edge(&mut self, edge: Edge) {
        self.edges_from.entry(edge.from).or_default().push(edge.clone());
        self.edges_to.entry(edge.to).or_default().push(edge);
    }

    fn compute_embeddings(&mut self, provider: &dyn EmbeddingProvider) -> Result<()> {
        if self.tables.is_empty() {
            return Ok(());
        }

        tracing::info!("Computing schema embeddings for {} ({} tables)", self.db_id, self.tables.len());
        let texts: Vec<String> = self.tables.iter().map(TableNode::description).collect();
        let vectors = provider
            .embed_batch(&texts)
            .and_then(|vectors| check_batch(provider.name(), texts.len(), &vectors).map(|_| vectors))
            .map_err(|e| match e {
                Error::Embedding(msg) => Error::Embedding(format!("{}: {}", self.db_id, msg)),
                other => other,
            })?;

        for (table, vector) in self.tables.iter().zip(vectors) {
            self.table_embeddings.insert(table.name.clone(), vector);
        }
        tracing::info!("Embedded {} tables for {}", self.table_embeddings.len(), self.db_id);
        Ok(())
    }

    // ========== Lookups ==========

    pub fn db_id(&self) -> &str {
        &self.db_id
    }

    /// Tables in declaration order
    pub fn tables(&self) -> &[TableNode] {
        &self.tables
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Look up a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&TableNode> {
        self.table_index
            .get(&name.to_lowercase())
            .map(|&i| &self.tables[i])
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn wildcard(&self) -> Option<&str> {
        self.wildcard.as_deref()
    }

    pub fn table_embedding(&self, name: &str) -> Option<&[f32]> {
        self.table_embeddings.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    pub fn get_edges_from(&self, id: &NodeId) -> &[Edge] {
        self.edges_from.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn get_edges_to(&self, id: &NodeId) -> &[Edge] {
        self.edges_to.get(id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Column nodes of a table, following `has_column` edges
    pub fn column_nodes(&self, table: &str) -> Vec<&ColumnNode> {
        let Some(table) = self.table(table) else {
            return Vec::new();
        };
        self.get_edges_from(&table.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::HasColumn)
            .filter_map(|e| self.columns.get(&e.to))
            .collect()
    }

    /// Tables one foreign key away, in either direction
    pub fn neighbors(&self, table: &str) -> Vec<&TableNode> {
        let Some(table) = self.table(table) else {
            return Vec::new();
        };
        let outgoing = self
            .get_edges_from(&table.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::ForeignKey)
            .map(|e| e.to);
        let incoming = self
            .get_edges_to(&table.id)
            .iter()
            .filter(|e| e.kind == EdgeKind::ForeignKey)
            .map(|e| e.from);

        let mut seen = HashSet::new();
        outgoing
            .chain(incoming)
            .filter(|other| *other != table.id && seen.insert(*other))
            .filter_map(|other| self.tables.get(other.index))
            .collect()
    }

    // ========== Scoring ==========

    /// Keyword score of every table, normalized to [0, 1]
    pub fn keyword_scores(&self, question: &str) -> HashMap<String, f64> {
        let scores = keyword::keyword_scores(question, &self.tables);
        self.tables
            .iter()
            .zip(scores)
            .map(|(t, s)| (t.name.clone(), s))
            .collect()
    }

    /// Dimension of the stored table embeddings; 0 when none are stored
    pub fn embedding_dimension(&self) -> usize {
        self.table_embeddings.values().next().map(Vec::len).unwrap_or(0)
    }

    fn embedding_vector(&self, question_vec: &[f32]) -> Vec<f64> {
        self.tables
            .iter()
            .map(|t| {
                self.table_embeddings
                    .get(&t.name)
                    .map(|v| ranking::cosine_similarity(question_vec, v))
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Rank tables by hybrid score plus one-hop foreign-key propagation.
    ///
    /// The question is embedded once; provider errors and a question vector
    /// whose dimension differs from the table embeddings are returned.
    pub fn rank_tables(
        &self,
        question: &str,
        provider: &dyn EmbeddingProvider,
        options: &RankingOptions,
    ) -> Result<RankedTables> {
        tracing::info!(
            "Ranking {} tables of {} (keyword={}, embedding={})",
            self.tables.len(),
            self.db_id,
            options.keyword_weight,
            options.embedding_weight
        );

        let keyword = keyword::keyword_scores(question, &self.tables);
        let embedding = if self.tables.is_empty() {
            Vec::new()
        } else {
            let question_vec = provider.embed_one(question)?;
            let expected = self.embedding_dimension();
            if expected != 0 && question_vec.len() != expected {
                return Err(Error::Embedding(format!(
                    "{}: question embedding has dimension {}, expected {}",
                    self.db_id,
                    question_vec.len(),
                    expected
                )));
            }
            self.embedding_vector(&question_vec)
        };
        let hybrid = ranking::hybrid_scores(&keyword, &embedding, options.keyword_weight, options.embedding_weight);
        let propagated = ranking::propagate(&self.table_index, &hybrid, &self.foreign_keys);
        let selected = ranking::select_top(&propagated, options.top_k, options.min_score);

        let scores: Vec<TableScore> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| TableScore {
                table: t.name.clone(),
                keyword: keyword[i],
                embedding: embedding[i],
                hybrid: hybrid[i],
                propagated: propagated[i],
            })
            .collect();

        for &i in &selected {
            let s = &scores[i];
            tracing::debug!(
                "  {}: total={:.4} (kw={:.4}, emb={:.4}, hybrid={:.4})",
                s.table, s.propagated, s.keyword, s.embedding, s.hybrid
            );
        }
        tracing::info!("Selected {} of {} tables", selected.len(), self.tables.len());

        Ok(RankedTables {
            tables: selected.iter().map(|&i| self.tables[i].name.clone()).collect(),
            scores,
        })
    }

    // ========== Rendering ==========

    /// Every table as `"{table}: {columns}"`, one per line, declaration order
    pub fn full_schema(&self) -> String {
        self.tables
            .iter()
            .map(TableNode::schema_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the given tables plus their direct foreign-key neighbours.
    ///
    /// Seeds come first in input order (unknown names are ignored), then
    /// neighbours in foreign-key order. Only tables adjacent to a seed are
    /// added; neighbours of neighbours are not.
    pub fn schema_subgraph<S: AsRef<str>>(&self, table_names: &[S]) -> String {
        let mut order: Vec<usize> = Vec::new();
        for name in table_names {
            if let Some(&i) = self.table_index.get(&name.as_ref().to_lowercase()) {
                if !order.contains(&i) {
                    order.push(i);
                }
            }
        }

        let seeds: HashSet<usize> = order.iter().copied().collect();
        let mut visited = seeds.clone();
        for fk in &self.foreign_keys {
            let (Some(&from), Some(&to)) = (self.table_index.get(&fk.from_table), self.table_index.get(&fk.to_table)) else {
                continue;
            };
            let neighbor = match (seeds.contains(&from), seeds.contains(&to)) {
                (true, false) => to,
                (false, true) => from,
                _ => continue,
            };
            if visited.insert(neighbor) {
                order.push(neighbor);
            }
        }

        tracing::debug!("Subgraph of {} has {} tables", self.db_id, order.len());
        order
            .iter()
            .map(|&i| self.tables[i].schema_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Foreign keys as `"{from}.{col} -> {to}.{col}"` lines under a header;
    /// empty when there are none
    pub fn foreign_key_hints(&self) -> String {
        if self.foreign_keys.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = self.foreign_keys.iter().map(ForeignKey::to_string).collect();
        format!("{}\n{}", FOREIGN_KEY_HINTS_HEADER, lines.join("\n"))
    }

    /// Get statistics about the graph
    pub fn stats(&self) -> GraphStats {
        let edges = self.edges_from.values().flat_map(|v| v.iter());
        let has_column_edges = edges.clone().filter(|e| e.kind == EdgeKind::HasColumn).count();
        let foreign_key_edges = edges.filter(|e| e.kind == EdgeKind::ForeignKey).count();

        GraphStats {
            db_id: self.db_id.clone(),
            tables: self.tables.len(),
            columns: self.columns.len(),
            has_column_edges,
            foreign_key_edges,
            embedded_tables: self.table_embeddings.len(),
            embedding_dimension: self.embedding_dimension(),
        }
    }
}

/// Statistics about a schema graph
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GraphStats {
    pub db_id: String,
    pub tables: usize,
    pub columns: usize,
    pub has_column_edges: usize,
    pub foreign_key_edges: usize,
    pub embedded_tables: usize,
    pub embedding_dimension: usize,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Schema Graph Statistics ({}):", self.db_id)?;
        writeln!(f, "  Tables: {}", self.tables)?;
        writeln!(f, "  Columns: {}", self.columns)?;
        writeln!(f, "  Edges: {} has_column, {} foreign_key", self.has_column_edges, self.foreign_key_edges)?;
        writeln!(f, "  Embeddings: {} (dim {})", self.embedded_tables, self.embedding_dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingEmbeddings, FixedEmbeddings, descriptor, zoo_descriptor};
    use crate::retrieval::embedding::HashingEmbeddings;

    fn zoo_graph() -> SchemaGraph {
        SchemaGraph::build(&zoo_descriptor(), &HashingEmbeddings::new(64)).unwrap()
    }

    #[test]
    fn test_build_structure() {
        let graph = zoo_graph();
        assert_eq!(graph.db_id(), "zoo");
        assert_eq!(graph.table_count(), 2);
        assert_eq!(graph.table("Animal").unwrap().columns, vec!["id", "name", "species_id"]);
        assert_eq!(graph.table("species").unwrap().original_name, "Species");
        assert_eq!(graph.wildcard(), Some("*"));
        assert_eq!(graph.column_nodes("animal").len(), 3);

        let fk = &graph.foreign_keys()[0];
        assert_eq!(fk.to_string(), "animal.species_id -> species.id");
    }

    #[test]
    fn test_embeddings_per_table() {
        let graph = zoo_graph();
        assert_eq!(graph.table_embedding("animal").unwrap().len(), 64);
        assert_eq!(graph.table_embedding("species").unwrap().len(), 64);

        let stats = graph.stats();
        assert_eq!(stats.tables, 2);
        assert_eq!(stats.columns, 5);
        assert_eq!(stats.has_column_edges, 5);
        assert_eq!(stats.foreign_key_edges, 1);
        assert_eq!(stats.embedded_tables, 2);
    }

    #[test]
    fn test_unresolvable_foreign_keys_are_skipped() {
        let d = descriptor(
            "shop",
            &["a", "b"],
            &[(-1, "*"), (0, "id"), (1, "a_id")],
            &[(2, 1), (0, 1), (2, 99), (-5, 1)],
        );
        let graph = SchemaGraph::build(&d, &HashingEmbeddings::new(16)).unwrap();
        assert_eq!(graph.foreign_keys().len(), 1);
        assert_eq!(graph.foreign_keys()[0].to_string(), "b.a_id -> a.id");
    }

    #[test]
    fn test_invalid_descriptor_fails() {
        let d = descriptor("bad", &["a"], &[(-1, "*"), (2, "x")], &[]);
        let result = SchemaGraph::build(&d, &HashingEmbeddings::new(16));
        assert!(matches!(result, Err(Error::SchemaLoad { .. })));
    }

    #[test]
    fn test_embedding_failure_propagates() {
        let result = SchemaGraph::build(&zoo_descriptor(), &FailingEmbeddings);
        assert!(matches!(result, Err(Error::Embedding(msg)) if msg.contains("zoo")));
    }

    #[test]
    fn test_short_batch_fails() {
        let provider = FixedEmbeddings::new(vec![]).with_batch_limit(1);
        let result = SchemaGraph::build(&zoo_descriptor(), &provider);
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[test]
    fn test_full_schema() {
        let graph = zoo_graph();
        assert_eq!(graph.full_schema(), "animal: id, name, species_id\nspecies: id, label");
    }

    #[test]
    fn test_subgraph_one_hop_only() {
        let d = descriptor(
            "chain",
            &["a", "b", "c"],
            &[(-1, "*"), (0, "id"), (1, "id"), (1, "a_id"), (2, "b_id")],
            &[(3, 1), (4, 2)],
        );
        let graph = SchemaGraph::build(&d, &HashingEmbeddings::new(16)).unwrap();

        assert_eq!(graph.schema_subgraph(&["a"]), "a: id\nb: id, a_id");
        assert_eq!(graph.schema_subgraph(&["c"]), "c: b_id\nb: id, a_id");
        assert_eq!(graph.schema_subgraph(&["b"]), "b: id, a_id\na: id\nc: b_id");
    }

    #[test]
    fn test_subgraph_seed_order_and_unknown_names() {
        let graph = zoo_graph();
        assert_eq!(
            graph.schema_subgraph(&["species", "nope", "SPECIES"]),
            "species: id, label\nanimal: id, name, species_id"
        );
        assert_eq!(graph.schema_subgraph::<&str>(&[]), "");
    }

    #[test]
    fn test_neighbors() {
        let graph = zoo_graph();
        let names: Vec<&str> = graph.neighbors("species").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["animal"]);
        assert!(graph.neighbors("missing").is_empty());
    }

    #[test]
    fn test_foreign_key_hints() {
        let graph = zoo_graph();
        assert_eq!(
            graph.foreign_key_hints(),
            "Foreign key relationships:\nanimal.species_id -> species.id"
        );

        let d = descriptor("flat", &["t"], &[(0, "x")], &[]);
        let flat = SchemaGraph::build(&d, &HashingEmbeddings::new(16)).unwrap();
        assert_eq!(flat.foreign_key_hints(), "");
    }

    #[test]
    fn test_keyword_scores_exact_name() {
        let graph = zoo_graph();
        let scores = graph.keyword_scores("What species is animal named Leo?");
        // animal: name 1.0 + column "name" 0.8; species: name 1.0
        assert!((scores["animal"] - 1.0).abs() < 1e-6);
        assert!((scores["species"] - 1.0 / 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_rank_keyword_only() {
        let graph = zoo_graph();
        let options = RankingOptions {
            top_k: 1,
            keyword_weight: 1.0,
            embedding_weight: 0.0,
            min_score: None,
        };
        let ranked = graph
            .rank_tables("What species is animal named Leo?", &HashingEmbeddings::new(64), &options)
            .unwrap();
        assert_eq!(ranked.tables, vec!["animal"]);
        assert_eq!(ranked.scores.len(), 2);
        assert_eq!(graph.schema_subgraph(&ranked.tables), graph.full_schema());
    }

    #[test]
    fn test_rank_propagation_lifts_neighbour() {
        let provider = FixedEmbeddings::new(vec![
            ("animal columns: id, name, species_id", vec![1.0, 0.0]),
            ("species columns: id, label", vec![0.0, 1.0]),
            ("pets", vec![1.0, 0.0]),
        ]);
        let graph = SchemaGraph::build(&zoo_descriptor(), &provider).unwrap();
        let options = RankingOptions {
            top_k: 2,
            keyword_weight: 0.0,
            embedding_weight: 1.0,
            min_score: None,
        };
        let ranked = graph.rank_tables("pets", &provider, &options).unwrap();
        assert_eq!(ranked.tables, vec!["animal", "species"]);
        assert!((ranked.score("animal").unwrap() - 1.0).abs() < 1e-6);
        assert!((ranked.score("species").unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_rank_question_embedding_failure() {
        let provider = FixedEmbeddings::new(vec![
            ("animal columns: id, name, species_id", vec![1.0, 0.0]),
            ("species columns: id, label", vec![0.0, 1.0]),
        ]);
        let graph = SchemaGraph::build(&zoo_descriptor(), &provider).unwrap();
        let result = graph.rank_tables("unknown text", &FailingEmbeddings, &RankingOptions::default());
        assert!(matches!(result, Err(Error::Embedding(_))));
    }

    #[test]
    fn test_rank_question_dimension_mismatch() {
        let build = FixedEmbeddings::new(vec![
            ("animal columns: id, name, species_id", vec![1.0, 0.0]),
            ("species columns: id, label", vec![0.0, 1.0]),
        ]);
        let graph = SchemaGraph::build(&zoo_descriptor(), &build).unwrap();
        assert_eq!(graph.embedding_dimension(), 2);

        let query = FixedEmbeddings::new(vec![("pets", vec![1.0, 0.0, 0.0])]);
        let result = graph.rank_tables("pets", &query, &RankingOptions::default());
        assert!(matches!(
            result,
            Err(Error::Embedding(msg)) if msg.contains("zoo") && msg.contains("dimension 3, expected 2")
        ));
    }

    #[test]
    fn test_empty_graph() {
        let d = descriptor("empty", &[], &[(-1, "*")], &[]);
        let graph = SchemaGraph::build(&d, &FailingEmbeddings).unwrap();
        let ranked = graph
            .rank_tables("anything", &FailingEmbeddings, &RankingOptions::default())
            .unwrap();
        assert!(ranked.is_empty());
        assert_eq!(graph.full_schema(), "");
    }
}
