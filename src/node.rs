//! Node types - tables and columns of a schema graph
//!
//! Every node is addressed by a [`NodeId`]: its kind plus the position it
//! had in the catalog entry (table index or column index).

use serde::{Deserialize, Serialize};

/// Kinds of nodes in a schema graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A database table
    Table,
    /// A column owned by exactly one table
    Column,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Table => "table",
            NodeKind::Column => "column",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identity of a node within one schema graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub kind: NodeKind,
    /// Table index or column index from the catalog entry
    pub index: usize,
}

impl NodeId {
    pub fn table(index: usize) -> Self {
        Self { kind: NodeKind::Table, index }
    }

    pub fn column(index: usize) -> Self {
        Self { kind: NodeKind::Column, index }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.kind, self.index)
    }
}

/// A table node.
///
/// `name` and `columns` are lowercase; `original_name` keeps the casing
/// from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableNode {
    pub id: NodeId,
    pub name: String,
    pub original_name: String,
    /// Lowercase column names in declaration order
    pub columns: Vec<String>,
}

impl TableNode {
    pub fn new(index: usize, original_name: impl Into<String>) -> Self {
        let original_name = original_name.into();
        Self {
            id: NodeId::table(index),
            name: original_name.to_lowercase(),
            original_name,
            columns: Vec::new(),
        }
    }

    /// Text embedded for this table: `"{table} columns: {col1, col2, ...}"`
    pub fn description(&self) -> String {
        format!("{} columns: {}", self.name, self.columns.join(", "))
    }

    /// Schema line: `"{table}: {col1, col2, ...}"`
    pub fn schema_line(&self) -> String {
        format!("{}: {}", self.name, self.columns.join(", "))
    }
}

/// A column node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnNode {
    pub id: NodeId,
    pub name: String,
    pub original_name: String,
    /// Owning table
    pub table: NodeId,
}

impl ColumnNode {
    pub fn new(index: usize, table_index: usize, original_name: impl Into<String>) -> Self {
        let original_name = original_name.into();
        Self {
            id: NodeId::column(index),
            name: original_name.to_lowercase(),
            original_name,
            table: NodeId::table(table_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::table(0).to_string(), "table_0");
        assert_eq!(NodeId::column(12).to_string(), "column_12");
    }

    #[test]
    fn test_table_text() {
        let mut table = TableNode::new(0, "Singer_In_Concert");
        table.columns.push("concert_id".to_string());
        table.columns.push("singer_id".to_string());

        assert_eq!(table.name, "singer_in_concert");
        assert_eq!(table.original_name, "Singer_In_Concert");
        assert_eq!(table.description(), "singer_in_concert columns: concert_id, singer_id");
        assert_eq!(table.schema_line(), "singer_in_concert: concert_id, singer_id");
    }

    #[test]
    fn test_column_owner() {
        let column = ColumnNode::new(3, 1, "Species_ID");
        assert_eq!(column.name, "species_id");
        assert_eq!(column.table, NodeId::table(1));
        assert_eq!(column.id.kind, NodeKind::Column);
    }
}
