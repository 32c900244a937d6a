use crate::retrieval::{RetrievalMetadata, RetrievalMode};
use crate::ui::{theme, Icons, Theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO.style(theme().info), label.style(theme().dim), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted).to_string()
}

// ========== Schema text ==========

/// Style one `table: col, col` line; other lines are returned unchanged.
pub fn styled_schema_line(t: &Theme, line: &str) -> String {
    match line.split_once(": ") {
        Some((table, columns)) => format!("{}: {}", table.style(t.table), columns.style(t.column)),
        None => line.to_string(),
    }
}

/// Style one `a.x -> b.y` hint line; other lines are returned dimmed.
pub fn styled_foreign_key_line(t: &Theme, line: &str) -> String {
    let Some((from, to)) = line.split_once(" -> ") else {
        return line.style(t.dim).to_string();
    };
    let end = |s: &str| match s.split_once('.') {
        Some((table, column)) => format!("{}.{}", table.style(t.table), column.style(t.column)),
        None => s.to_string(),
    };
    format!("{} {} {}", end(from), "->".style(t.muted), end(to))
}

pub fn styled_table_score(t: &Theme, table: &str, score: f64) -> String {
    format!("{} {}", table.style(t.table), format!("{:.4}", score).style(t.score))
}

/// Print schema text, one table per line
pub fn schema_block(schema_text: &str) {
    for line in schema_text.lines() {
        println!("{} {}", Icons::TABLE, styled_schema_line(theme(), line));
    }
}

/// Print a foreign-key hint block; nothing for an empty block
pub fn foreign_key_block(hints: &str) {
    let mut lines = hints.lines();
    let Some(title) = lines.next() else {
        return;
    };
    println!("{}", title.style(theme().dim));
    for line in lines {
        println!("  {} {}", Icons::LINK, styled_foreign_key_line(theme(), line));
    }
}

/// Summarize how a schema was chosen for `db`
pub fn retrieval_summary(db: &str, metadata: &RetrievalMetadata) {
    match metadata {
        RetrievalMetadata::NotFound { error: message } => error(&format!("{}: {}", db, message)),
        RetrievalMetadata::Retrieved(RetrievalMode::FullSchema) => info("Mode", "full schema"),
        RetrievalMetadata::Retrieved(RetrievalMode::FallbackFullSchema { reason, error }) => {
            warn(&format!("Falling back to full schema: {}", reason));
            if let Some(error) = error {
                println!("  {} {}", "error".style(theme().dim), error);
            }
        }
        RetrievalMetadata::Retrieved(RetrievalMode::HybridRetrieval {
            relevant_tables,
            scores,
            total_tables,
            retrieved_tables,
            weights,
        }) => {
            status(
                Icons::SEARCH,
                "Hybrid retrieval",
                &format!(
                    "{} of {} tables (keyword {}, embedding {})",
                    retrieved_tables, total_tables, weights.keyword, weights.embedding
                ),
            );
            for table in relevant_tables {
                let score = scores.get(table).copied().unwrap_or_default();
                println!("  {}", styled_table_score(theme(), table, score));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_schema_line_is_unchanged() {
        let plain = Theme::plain();
        assert_eq!(styled_schema_line(&plain, "singer: id, name"), "singer: id, name");
        assert_eq!(styled_schema_line(&plain, "Foreign key relationships:"), "Foreign key relationships:");
    }

    #[test]
    fn test_colored_schema_line_styles_table_and_columns() {
        let line = styled_schema_line(&Theme::colored(), "singer: id, name");
        assert!(line.contains("\u{1b}["));
        assert!(line.contains("singer"));
        assert!(line.contains("id, name"));
        assert_ne!(line, "singer: id, name");
    }

    #[test]
    fn test_foreign_key_line() {
        let plain = Theme::plain();
        assert_eq!(
            styled_foreign_key_line(&plain, "concert.stadium_id -> stadium.stadium_id"),
            "concert.stadium_id -> stadium.stadium_id"
        );
        assert_eq!(styled_foreign_key_line(&plain, "not a hint"), "not a hint");
    }

    #[test]
    fn test_table_score() {
        assert_eq!(styled_table_score(&Theme::plain(), "animal", 0.3), "animal 0.3000");
    }
}
