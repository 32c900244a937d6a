//! Schema Catalog - serialized multi-database schema descriptions
//!
//! The on-disk contract is a JSON array of Spider-style entries:
//! `{db_id, table_names_original, column_names_original, foreign_keys}`.
//!
//! Entries are kept as raw JSON until a database is requested, so a malformed
//! entry only fails the database it describes.

pub mod sqlite;

use std::collections::HashSet;
use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::node::TableNode;
use crate::{Error, Result};

/// Table index used by the wildcard `*` pseudo-column
pub const WILDCARD_TABLE_INDEX: i64 = -1;

/// Schema description of one database, as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub db_id: String,
    /// Original table names, in declaration order
    pub table_names_original: Vec<String>,
    /// `(table_index, column_name)` pairs; `table_index == -1` is the wildcard
    pub column_names_original: Vec<(i64, String)>,
    /// `(column_index, column_index)` pairs into `column_names_original`
    #[serde(default)]
    pub foreign_keys: Vec<(i64, i64)>,
}

impl SchemaDescriptor {
    /// Check the table/column invariants a schema graph relies on.
    ///
    /// Foreign keys are not checked here: unresolvable pairs are tolerated
    /// and skipped while the graph is built.
    pub fn validate(&self) -> Result<()> {
        if self.db_id.trim().is_empty() {
            return Err(Error::schema_load(&self.db_id, "empty db_id"));
        }

        let mut seen = HashSet::new();
        for name in &self.table_names_original {
            if name.trim().is_empty() {
                return Err(Error::schema_load(&self.db_id, "empty table name"));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(Error::schema_load(
                    &self.db_id,
                    format!("duplicate table name '{}'", name),
                ));
            }
        }

        let table_count = self.table_names_original.len() as i64;
        for (col_idx, (table_idx, col_name)) in self.column_names_original.iter().enumerate() {
            if *table_idx == WILDCARD_TABLE_INDEX {
                continue;
            }
            if *table_idx < 0 || *table_idx >= table_count {
                return Err(Error::schema_load(
                    &self.db_id,
                    format!(
                        "column {} ('{}') references table index {} outside 0..{}",
                        col_idx, col_name, table_idx, table_count
                    ),
                ));
            }
            if col_name.trim().is_empty() {
                return Err(Error::schema_load(
                    &self.db_id,
                    format!("column {} has an empty name", col_idx),
                ));
            }
        }

        Ok(())
    }

    /// Resolve a column index to its owning table index and column name.
    ///
    /// Returns `None` for out-of-range indices and for the wildcard column.
    pub fn resolve_column(&self, col_idx: i64) -> Option<(usize, &str)> {
        let idx = usize::try_from(col_idx).ok()?;
        let (table_idx, name) = self.column_names_original.get(idx)?;
        let table_idx = usize::try_from(*table_idx).ok()?;
        if table_idx >= self.table_names_original.len() {
            return None;
        }
        Some((table_idx, name.as_str()))
    }

    /// Render `"{table}: {columns}"` lines without building a graph.
    ///
    /// Columns pointing at unknown tables are left out.
    pub fn to_schema_text(&self) -> String {
        let mut tables: Vec<TableNode> = self
            .table_names_original
            .iter()
            .enumerate()
            .map(|(i, name)| TableNode::new(i, name))
            .collect();
        for (table_idx, col_name) in &self.column_names_original {
            if let Some(table) = usize::try_from(*table_idx).ok().and_then(|i| tables.get_mut(i)) {
                table.columns.push(col_name.to_lowercase());
            }
        }
        tables.iter().map(TableNode::schema_line).collect::<Vec<_>>().join("\n")
    }

    pub fn table_count(&self) -> usize {
        self.table_names_original.len()
    }

    /// Number of real columns (the wildcard is not counted)
    pub fn column_count(&self) -> usize {
        self.column_names_original
            .iter()
            .filter(|(t, _)| *t != WILDCARD_TABLE_INDEX)
            .count()
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    db_id: String,
    raw: serde_json::Value,
}

/// A loaded schema catalog covering one or more databases.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entries: Vec<CatalogEntry>,
}

impl SchemaCatalog {
    /// Load a catalog file (JSON array of schema descriptions)
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&contents)?;
        tracing::info!("Loaded schema catalog {} ({} databases)", path.display(), catalog.len());
        Ok(catalog)
    }

    /// Parse a catalog from a JSON string.
    ///
    /// Only the outer array and each entry's `db_id` are required at this
    /// point; the rest of an entry is checked when it is requested.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut entries: Vec<CatalogEntry> = Vec::with_capacity(values.len());

        for (i, value) in values.into_iter().enumerate() {
            let Some(db_id) = value.get("db_id").and_then(|v| v.as_str()) else {
                tracing::warn!("Skipping catalog entry {} without a db_id", i);
                continue;
            };
            if entries.iter().any(|e| e.db_id == db_id) {
                tracing::warn!("Skipping duplicate catalog entry for '{}'", db_id);
                continue;
            }
            entries.push(CatalogEntry {
                db_id: db_id.to_string(),
                raw: value,
            });
        }

        Ok(Self { entries })
    }

    /// Build a catalog from in-memory descriptors
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = SchemaDescriptor>) -> Result<Self> {
        let mut values = Vec::new();
        for descriptor in descriptors {
            values.push(serde_json::to_value(&descriptor)?);
        }
        Self::from_json_str(&serde_json::Value::Array(values).to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Database ids in catalog order
    pub fn db_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.db_id.as_str())
    }

    pub fn contains(&self, db_id: &str) -> bool {
        self.entries.iter().any(|e| e.db_id == db_id)
    }

    /// Decode and validate the descriptor of one database
    pub fn descriptor(&self, db_id: &str) -> Result<SchemaDescriptor> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.db_id == db_id)
            .ok_or_else(|| Error::DatabaseNotFound(db_id.to_string()))?;

        let descriptor: SchemaDescriptor = serde_json::from_value(entry.raw.clone())
            .map_err(|e| Error::schema_load(db_id, e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Decode every database matching the allow-list (all when `None`).
    ///
    /// Results are returned per database so one malformed entry does not
    /// hide the others.
    pub fn descriptors(&self, allow_list: Option<&[String]>) -> Vec<(String, Result<SchemaDescriptor>)> {
        self.entries
            .iter()
            .filter(|e| allow_list.is_none_or(|ids| ids.iter().any(|id| *id == e.db_id)))
            .map(|e| (e.db_id.clone(), self.descriptor(&e.db_id)))
            .collect()
    }

    /// Serialize the catalog back to its JSON file format
    pub fn to_json_string(&self) -> Result<String> {
        let values: Vec<&serde_json::Value> = self.entries.iter().map(|e| &e.raw).collect();
        Ok(serde_json::to_string_pretty(&values)?)
    }
}
