//! System prompt for the SQL agent

pub const DEFAULT_DIALECT: &str = "SQLite";

const PREAMBLE: &str = "\
You answer questions about a {dialect} database by writing and running SQL.
Write one syntactically valid {dialect} query for the question, run it with the \
available tools, then answer from the returned rows.
Use only the tables and columns listed under \"Database schema\". Select only the \
columns the question needs.
If a query fails, read the error, fix the query and run it again.
Never issue INSERT, UPDATE, DELETE, DROP or any other statement that changes data.
If the question cannot be answered from this database, reply \"I don't know\".";

/// Render the agent system prompt.
///
/// `foreign_key_hints` is appended as its own block when non-empty.
pub fn system_prompt(dialect: &str, schema_text: &str, foreign_key_hints: &str) -> String {
    let mut prompt = PREAMBLE.replace("{dialect}", dialect);
    prompt.push_str("\n\nDatabase schema:\n");
    prompt.push_str(schema_text);
    if !foreign_key_hints.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(foreign_key_hints);
    }
    prompt.push('\n');
    prompt
}

/// User turn pairing a schema with the question, as used in few-shot examples
pub fn question_block(schema_text: &str, question: &str) -> String {
    format!("Database schema:\n{}\n\nUser question: {}", schema_text, question)
}
