use tabled::{settings::Style, Table, Tabled};
use crate::retrieval::TableScore;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// One catalog database in `sqlrag databases`
#[derive(Tabled)]
pub struct DatabaseRow {
    #[tabled(rename = "Database")]
    pub db_id: String,
    #[tabled(rename = "Tables")]
    pub tables: String,
    #[tabled(rename = "Columns")]
    pub columns: String,
    #[tabled(rename = "Foreign keys")]
    pub foreign_keys: String,
}

/// Score breakdown row for `sqlrag retrieve --explain`
#[derive(Tabled)]
pub struct ScoreRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Keyword")]
    pub keyword: String,
    #[tabled(rename = "Embedding")]
    pub embedding: String,
    #[tabled(rename = "Hybrid")]
    pub hybrid: String,
    #[tabled(rename = "Final")]
    pub propagated: String,
    #[tabled(rename = "Selected")]
    pub selected: String,
}

impl ScoreRow {
    pub fn new(score: &TableScore, selected: bool) -> Self {
        Self {
            table: score.table.clone(),
            keyword: format!("{:.4}", score.keyword),
            embedding: format!("{:.4}", score.embedding),
            hybrid: format!("{:.4}", score.hybrid),
            propagated: format!("{:.4}", score.propagated),
            selected: if selected { "yes".to_string() } else { String::new() },
        }
    }
}

/// Two-column metric/value table
#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Render any rows with the shared rounded style
pub fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder() {
        assert_eq!(TableBuilder::new().build(), "");
        assert_eq!(render::<DatabaseRow>(&[]), "");
    }

    #[test]
    fn test_score_row() {
        let score = TableScore {
            table: "animal".to_string(),
            keyword: 1.0,
            embedding: 0.25,
            hybrid: 0.55,
            propagated: 0.55,
        };
        let row = ScoreRow::new(&score, true);
        assert_eq!(row.keyword, "1.0000");
        assert_eq!(row.selected, "yes");

        let rendered = render(&[row]);
        assert!(rendered.contains("animal"));
        assert!(rendered.contains("Final"));
    }
}
