//! Sparse top-K cosine similarity search.
//!
//! Computes, for every row of an L2-normalized sparse matrix, the K highest
//! cosine scores against all other rows at or above a threshold. Work is
//! driven by postings lists, so cost scales with shared nonzero entries
//! rather than with the square of the row count, and rows are scored in
//! parallel worker threads that share no mutable state.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::vectorize::SparseVectors;

/// Candidate bound and score floor for the similarity search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopKParams {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_k() -> usize {
    50
}

fn default_threshold() -> f64 {
    0.8
}

impl Default for TopKParams {
    fn default() -> Self {
        Self {
            k: default_k(),
            threshold: default_threshold(),
        }
    }
}

/// One scored (row, row) candidate. Self-matches are included; relation
/// cleaning removes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCandidate {
    pub row: usize,
    pub col: usize,
    pub score: f64,
}

/// Top-K cosine scores per row, ordered by source row, then score
/// descending with the column index as tie-break.
pub fn top_k_cosine(vectors: &SparseVectors, params: &TopKParams) -> Vec<MatchCandidate> {
    let mut postings: Vec<Vec<(u32, f64)>> = vec![Vec::new(); vectors.vocab_len];
    for row in 0..vectors.rows {
        let (terms, weights) = vectors.row(row);
        for (&term, &weight) in terms.iter().zip(weights) {
            postings[term as usize].push((row as u32, weight));
        }
    }

    (0..vectors.rows)
        .into_par_iter()
        .map(|row| {
            let (terms, weights) = vectors.row(row);
            let mut scores: AHashMap<u32, f64> = AHashMap::new();
            for (&term, &weight) in terms.iter().zip(weights) {
                for &(other, other_weight) in &postings[term as usize] {
                    *scores.entry(other).or_insert(0.0) += weight * other_weight;
                }
            }
            let mut candidates: Vec<MatchCandidate> = scores
                .into_iter()
                .filter(|&(_, score)| score >= params.threshold)
                .map(|(col, score)| MatchCandidate {
                    row,
                    col: col as usize,
                    score,
                })
                .collect();
            candidates.sort_unstable_by_key(|c| (OrderedFloat(-c.score), c.col));
            candidates.truncate(params.k);
            candidates
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::NgramVectorizer;

    fn matrix(values: &[&str]) -> SparseVectors {
        let docs: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        NgramVectorizer::default().fit_transform(&docs)
    }

    #[test]
    fn identical_rows_score_one() {
        let vectors = matrix(&["AUS ST", "AUS ST"]);
        let matches = top_k_cosine(&vectors, &TopKParams::default());
        let cross: Vec<_> = matches.iter().filter(|m| m.row != m.col).collect();
        assert_eq!(cross.len(), 2);
        for m in cross {
            assert!((m.score - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn dissimilar_rows_fall_under_the_threshold() {
        let vectors = matrix(&["AUS ST", "BIG CALM", "GOOD DOOM"]);
        let matches = top_k_cosine(&vectors, &TopKParams::default());
        assert!(matches.iter().all(|m| m.row == m.col));
    }

    #[test]
    fn near_duplicates_stay_above_the_threshold() {
        let vectors = matrix(&[
            "NAPERVILLE BITES AND SITE , LLC",
            "NAPERVILLE BITES AND SITES , LLC",
            "WOOW HVAC LLC",
        ]);
        let matches = top_k_cosine(&vectors, &TopKParams::default());
        let pair: Vec<_> = matches
            .iter()
            .filter(|m| m.row == 0 && m.col == 1)
            .collect();
        assert_eq!(pair.len(), 1);
        assert!(pair[0].score > 0.9 && pair[0].score < 1.0);
    }

    #[test]
    fn k_bounds_candidates_per_row() {
        let docs: Vec<&str> = vec!["SAME THING"; 10];
        let vectors = matrix(&docs);
        let params = TopKParams {
            k: 3,
            threshold: 0.8,
        };
        let matches = top_k_cosine(&vectors, &params);
        for row in 0..vectors.rows {
            assert!(matches.iter().filter(|m| m.row == row).count() <= 3);
        }
    }

    #[test]
    fn empty_rows_produce_no_matches() {
        let vectors = matrix(&["", "AUS ST"]);
        let matches = top_k_cosine(&vectors, &TopKParams::default());
        assert!(matches.iter().all(|m| m.row == 1 && m.col == 1));
    }
}
