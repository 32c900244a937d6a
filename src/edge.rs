//! Edge types - relationships in a schema graph
//!
//! Two relationships exist:
//! - `HasColumn`: table → column
//! - `ForeignKey`: table → table, annotated with the joined columns

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// Relationship kinds between schema nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Table owns a column
    HasColumn,
    /// Column of one table references a column of another
    ForeignKey,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::HasColumn => "has_column",
            EdgeKind::ForeignKey => "foreign_key",
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge in the schema graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    /// Joined columns `(from_column, to_column)`, foreign keys only
    pub columns: Option<(String, String)>,
}

impl Edge {
    pub fn has_column(table: NodeId, column: NodeId) -> Self {
        Self {
            from: table,
            to: column,
            kind: EdgeKind::HasColumn,
            columns: None,
        }
    }

    pub fn foreign_key(from_table: NodeId, to_table: NodeId, from_column: &str, to_column: &str) -> Self {
        Self {
            from: from_table,
            to: to_table,
            kind: EdgeKind::ForeignKey,
            columns: Some((from_column.to_string(), to_column.to_string())),
        }
    }
}

/// A resolved foreign key, all names lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl std::fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} -> {}.{}", self.from_table, self.from_column, self.to_table, self.to_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animal_species() -> ForeignKey {
        ForeignKey {
            from_table: "animal".to_string(),
            from_column: "species_id".to_string(),
            to_table: "species".to_string(),
            to_column: "id".to_string(),
        }
    }

    #[test]
    fn test_foreign_key_display() {
        assert_eq!(animal_species().to_string(), "animal.species_id -> species.id");
    }

    #[test]
    fn test_edge_constructors() {
        let edge = Edge::foreign_key(NodeId::table(0), NodeId::table(1), "species_id", "id");
        assert_eq!(edge.kind, EdgeKind::ForeignKey);
        assert_eq!(edge.columns, Some(("species_id".to_string(), "id".to_string())));

        let edge = Edge::has_column(NodeId::table(0), NodeId::column(2));
        assert_eq!(edge.kind.to_string(), "has_column");
        assert!(edge.columns.is_none());
    }
}
