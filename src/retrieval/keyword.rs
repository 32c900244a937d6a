//! Keyword scoring - lexical overlap between a question and table/column names
//!
//! Rules per table:
//! - table name appears in the question: 1.0, else any shared token: 0.7
//! - plus the best single column: name appears 0.8, else shared token 0.5
//!
//! Scores are then divided by the maximum score across tables.

use std::collections::HashSet;
use std::sync::OnceLock;
use regex::Regex;
use crate::node::TableNode;

pub const TABLE_EXACT_MATCH: f64 = 1.0;
pub const TABLE_TOKEN_MATCH: f64 = 0.7;
pub const COLUMN_EXACT_MATCH: f64 = 0.8;
pub const COLUMN_TOKEN_MATCH: f64 = 0.5;

static WORD: OnceLock<Regex> = OnceLock::new();

fn word_regex() -> &'static Regex {
    WORD.get_or_init(|| Regex::new(r"\w+").expect("word pattern is valid"))
}

/// Lowercase word tokens: maximal runs of alphanumerics and underscores
pub fn tokenize(text: &str) -> HashSet<String> {
    word_regex()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// A question prepared for repeated matching.
#[derive(Debug, Clone)]
pub struct QuestionTerms {
    lowered: String,
    tokens: HashSet<String>,
}

impl QuestionTerms {
    pub fn new(question: &str) -> Self {
        Self {
            lowered: question.to_lowercase(),
            tokens: tokenize(question),
        }
    }

    /// Whole (lowercase) name occurs as a substring of the question
    pub fn mentions(&self, name: &str) -> bool {
        !name.is_empty() && self.lowered.contains(name)
    }

    /// Any token of `name` is also a question token
    pub fn shares_token(&self, name: &str) -> bool {
        tokenize(name).iter().any(|t| self.tokens.contains(t))
    }
}

pub fn table_name_score(terms: &QuestionTerms, table: &str) -> f64 {
    if terms.mentions(table) {
        TABLE_EXACT_MATCH
    } else if terms.shares_token(table) {
        TABLE_TOKEN_MATCH
    } else {
        0.0
    }
}

pub fn column_score(terms: &QuestionTerms, column: &str) -> f64 {
    if terms.mentions(column) {
        COLUMN_EXACT_MATCH
    } else if terms.shares_token(column) {
        COLUMN_TOKEN_MATCH
    } else {
        0.0
    }
}

/// Unnormalized score of one table: name match plus best column match
pub fn raw_table_score(terms: &QuestionTerms, table: &TableNode) -> f64 {
    let best_column = table
        .columns
        .iter()
        .map(|c| column_score(terms, c))
        .fold(0.0f64, f64::max);
    table_name_score(terms, &table.name) + best_column
}

/// Normalized keyword scores, aligned with `tables`
pub fn keyword_scores(question: &str, tables: &[TableNode]) -> Vec<f64> {
    let terms = QuestionTerms::new(question);
    let mut scores: Vec<f64> = tables.iter().map(|t| raw_table_score(&terms, t)).collect();
    normalize(&mut scores);
    scores
}

/// Divide by the maximum when it is positive; otherwise leave as is
pub fn normalize(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(0.0f64, f64::max);
    if max > 0.0 {
        scores.iter_mut().for_each(|s| *s /= max);
    }
}
