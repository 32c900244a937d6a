//! SQLite introspection - build a schema descriptor from a live database file
//!
//! Produces the same shape as catalog entries: the `(-1, "*")` wildcard
//! column first, then every table's columns in declaration order, and
//! foreign keys as column-index pairs.

use std::path::Path;
use rusqlite::{Connection, OpenFlags};
use crate::Result;
use super::{SchemaDescriptor, WILDCARD_TABLE_INDEX};

/// Introspect a SQLite database file (opened read-only)
pub fn introspect_path(path: &Path, db_id: &str) -> Result<SchemaDescriptor> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    introspect(&conn, db_id)
}

/// Introspect an open connection
pub fn introspect(conn: &Connection, db_id: &str) -> Result<SchemaDescriptor> {
    let tables = table_names(conn)?;

    let mut column_names_original: Vec<(i64, String)> = vec![(WILDCARD_TABLE_INDEX, "*".to_string())];
    let mut primary_keys: Vec<Option<String>> = Vec::with_capacity(tables.len());

    for (table_idx, table) in tables.iter().enumerate() {
        let mut stmt = conn.prepare("SELECT name, pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt.query_map([table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut pk = None;
        for column in columns {
            let (name, pk_pos) = column?;
            if pk_pos == 1 {
                pk = Some(name.clone());
            }
            column_names_original.push((table_idx as i64, name));
        }
        primary_keys.push(pk);
    }

    let column_index = |table_idx: usize, column: &str| -> Option<i64> {
        column_names_original
            .iter()
            .position(|(t, c)| *t == table_idx as i64 && c.eq_ignore_ascii_case(column))
            .map(|i| i as i64)
    };
    let table_index = |name: &str| tables.iter().position(|t| t.eq_ignore_ascii_case(name));

    let mut foreign_keys = Vec::new();
    for (table_idx, table) in tables.iter().enumerate() {
        let mut stmt = conn.prepare(
            r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
        )?;
        let rows = stmt.query_map([table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;

        for row in rows {
            let (target_table, from_col, to_col) = row?;
            let Some(target_idx) = table_index(&target_table) else {
                tracing::debug!("{}: foreign key {}.{} targets unknown table {}", db_id, table, from_col, target_table);
                continue;
            };
            // A NULL target column refers to the parent's primary key
            let Some(to_col) = to_col.or_else(|| primary_keys[target_idx].clone()) else {
                tracing::debug!("{}: foreign key {}.{} has no resolvable target column", db_id, table, from_col);
                continue;
            };

            match (column_index(table_idx, &from_col), column_index(target_idx, &to_col)) {
                (Some(from), Some(to)) => foreign_keys.push((from, to)),
                _ => tracing::debug!(
                    "{}: foreign key {}.{} -> {}.{} references a missing column",
                    db_id, table, from_col, target_table, to_col
                ),
            }
        }
    }

    let descriptor = SchemaDescriptor {
        db_id: db_id.to_string(),
        table_names_original: tables,
        column_names_original,
        foreign_keys,
    };
    descriptor.validate()?;
    Ok(descriptor)
}

fn table_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}
