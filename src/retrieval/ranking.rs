//! Hybrid ranking with one-hop foreign-key propagation
//!
//! hybrid = keyword_weight * keyword + embedding_weight * cosine
//!
//! Each foreign key then lends 30% of an endpoint's hybrid score to the
//! other endpoint (in both directions). Propagation reads only the hybrid
//! scores, so a table two hops from a strong match gains nothing.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::edge::ForeignKey;

/// Share of a table's hybrid score lent across one foreign key
pub const PROPAGATION_FACTOR: f64 = 0.3;

/// Parameters of one ranking run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingOptions {
    pub top_k: usize,
    pub keyword_weight: f64,
    pub embedding_weight: f64,
    /// Tables must score strictly above this to be selected
    pub min_score: Option<f64>,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            keyword_weight: 0.4,
            embedding_weight: 0.6,
            min_score: None,
        }
    }
}

/// Score breakdown for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableScore {
    pub table: String,
    pub keyword: f64,
    pub embedding: f64,
    pub hybrid: f64,
    pub propagated: f64,
}

/// Outcome of ranking the tables of one graph against a question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedTables {
    /// Selected tables, best first
    pub tables: Vec<String>,
    /// Every table's breakdown, in graph order
    pub scores: Vec<TableScore>,
}

impl RankedTables {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Final (propagated) score of a table
    pub fn score(&self, table: &str) -> Option<f64> {
        self.breakdown(table).map(|s| s.propagated)
    }

    /// Breakdown of one table
    pub fn breakdown(&self, table: &str) -> Option<&TableScore> {
        self.scores.iter().find(|s| s.table == table)
    }
}

/// Cosine similarity, accumulated in f64; 0.0 for empty, mismatched or
/// zero-norm vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

pub fn hybrid_scores(keyword: &[f64], embedding: &[f64], keyword_weight: f64, embedding_weight: f64) -> Vec<f64> {
    keyword
        .iter()
        .zip(embedding.iter())
        .map(|(kw, emb)| keyword_weight * kw + embedding_weight * emb)
        .collect()
}

/// Single-pass, symmetric propagation over foreign keys.
///
/// `index` maps table names to positions in `hybrid`.
pub fn propagate(index: &HashMap<String, usize>, hybrid: &[f64], foreign_keys: &[ForeignKey]) -> Vec<f64> {
    let mut propagated = hybrid.to_vec();
    for fk in foreign_keys {
        let (Some(&from), Some(&to)) = (index.get(&fk.from_table), index.get(&fk.to_table)) else {
            continue;
        };
        propagated[to] = propagated[to].max(hybrid[from] * PROPAGATION_FACTOR);
        propagated[from] = propagated[from].max(hybrid[to] * PROPAGATION_FACTOR);
    }
    propagated
}

/// Positions of the best `top_k` scores, best first.
///
/// Ties keep their original order. NaN scores are never selected.
pub fn select_top(scores: &[f64], top_k: usize, min_score: Option<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len())
        .filter(|&i| !scores[i].is_nan() && min_score.is_none_or(|min| scores[i] > min))
        .collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(top_k);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(from: &str, to: &str) -> ForeignKey {
        ForeignKey {
            from_table: from.to_string(),
            from_column: format!("{}_id", to),
            to_table: to.to_string(),
            to_column: "id".to_string(),
        }
    }

    fn index(names: &[&str]) -> HashMap<String, usize> {
        names.iter().enumerate().map(|(i, n)| (n.to_string(), i)).collect()
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_hybrid_weights() {
        let hybrid = hybrid_scores(&[1.0, 0.0], &[0.5, -1.0], 0.4, 0.6);
        assert!((hybrid[0] - 0.7).abs() < 1e-6);
        assert!((hybrid[1] + 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_propagation_is_symmetric() {
        let idx = index(&["a", "b"]);
        let s = 0.8;

        // a references b
        let out = propagate(&idx, &[s, 0.0], &[fk("a", "b")]);
        assert!(out[1] >= PROPAGATION_FACTOR * s - 1e-6);
        assert_eq!(out[0], s);

        // b references a
        let out = propagate(&idx, &[s, 0.0], &[fk("b", "a")]);
        assert!(out[1] >= PROPAGATION_FACTOR * s - 1e-6);
        assert_eq!(out[0], s);
    }

    #[test]
    fn test_propagation_is_one_hop() {
        let idx = index(&["a", "b", "c"]);
        let out = propagate(&idx, &[1.0, 0.0, 0.0], &[fk("a", "b"), fk("b", "c")]);
        assert!((out[1] - 0.3).abs() < 1e-6);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_propagation_keeps_higher_score() {
        let idx = index(&["a", "b"]);
        let out = propagate(&idx, &[1.0, 0.9], &[fk("a", "b")]);
        assert_eq!(out, vec![1.0, 0.9]);
    }

    #[test]
    fn test_select_top_stable_ties() {
        let scores = [0.5, 0.9, 0.5, 0.1];
        assert_eq!(select_top(&scores, 3, None), vec![1, 0, 2]);
        assert_eq!(select_top(&scores, 10, None), vec![1, 0, 2, 3]);
        assert!(select_top(&scores, 0, None).is_empty());
    }

    #[test]
    fn test_select_top_skips_nan() {
        let scores = [0.2, f64::NAN, 0.7, 0.2];
        assert_eq!(select_top(&scores, 5, None), vec![2, 0, 3]);
        assert!(select_top(&[f64::NAN, f64::NAN], 5, None).is_empty());
    }

    #[test]
    fn test_select_top_min_score() {
        let scores = [0.5, 0.9, 0.05];
        assert_eq!(select_top(&scores, 5, Some(0.1)), vec![1, 0]);
        assert!(select_top(&scores, 5, Some(0.95)).is_empty());
    }
}
