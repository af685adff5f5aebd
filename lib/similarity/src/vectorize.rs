//! Character n-gram TF-IDF vectorization.
//!
//! Each prepared string becomes an L2-normalized sparse row over the n-gram
//! vocabulary, with smoothed inverse document frequency
//! `ln((1 + n_docs) / (1 + df)) + 1`. Cosine similarity between rows is then
//! a plain sparse dot product.

use ahash::AHashMap;

use crate::prep::prepare;

/// N-gram window length used for all facet kinds.
pub const NGRAM_LEN: usize = 3;

/// Compressed sparse row matrix of TF-IDF weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVectors {
    pub rows: usize,
    pub vocab_len: usize,
    /// Row start offsets into `indices`/`data`, length `rows + 1`.
    pub indptr: Vec<usize>,
    /// Term ids, sorted within each row.
    pub indices: Vec<u32>,
    pub data: Vec<f64>,
}

impl SparseVectors {
    pub fn row(&self, i: usize) -> (&[u32], &[f64]) {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }
}

/// Splits prepared strings into overlapping character n-grams and builds
/// the weighted sparse matrix over the resulting vocabulary.
#[derive(Debug, Clone, Copy)]
pub struct NgramVectorizer {
    n: usize,
}

impl Default for NgramVectorizer {
    fn default() -> Self {
        Self { n: NGRAM_LEN }
    }
}

impl NgramVectorizer {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    /// Overlapping n-grams of the prepared form of `value`. Strings shorter
    /// than the window produce no grams.
    pub fn ngrams(&self, value: &str) -> Vec<String> {
        let prepared = prepare(value);
        let chars: Vec<char> = prepared.chars().collect();
        if chars.len() < self.n {
            return Vec::new();
        }
        chars
            .windows(self.n)
            .map(|w| w.iter().collect())
            .collect()
    }

    /// Vectorize a document set. Vocabulary order follows first appearance,
    /// so the output is deterministic for a fixed input order.
    pub fn fit_transform(&self, documents: &[String]) -> SparseVectors {
        let mut vocabulary: AHashMap<String, u32> = AHashMap::new();
        let mut doc_terms: Vec<Vec<(u32, f64)>> = Vec::with_capacity(documents.len());
        let mut document_frequency: Vec<u32> = Vec::new();

        for document in documents {
            let mut counts: AHashMap<u32, f64> = AHashMap::new();
            for gram in self.ngrams(document) {
                let next_id = vocabulary.len() as u32;
                let term = *vocabulary.entry(gram).or_insert(next_id);
                if term as usize == document_frequency.len() {
                    document_frequency.push(0);
                }
                *counts.entry(term).or_insert(0.0) += 1.0;
            }
            for &term in counts.keys() {
                document_frequency[term as usize] += 1;
            }
            let mut terms: Vec<(u32, f64)> = counts.into_iter().collect();
            terms.sort_unstable_by_key(|(term, _)| *term);
            doc_terms.push(terms);
        }

        let n_docs = documents.len() as f64;
        let idf: Vec<f64> = document_frequency
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let mut indptr = Vec::with_capacity(documents.len() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for terms in doc_terms {
            let mut weights: Vec<f64> = terms
                .iter()
                .map(|&(term, tf)| tf * idf[term as usize])
                .collect();
            let norm = weights.iter().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                for w in &mut weights {
                    *w /= norm;
                }
            }
            for (&(term, _), weight) in terms.iter().zip(weights) {
                indices.push(term);
                data.push(weight);
            }
            indptr.push(indices.len());
        }

        SparseVectors {
            rows: documents.len(),
            vocab_len: vocabulary.len(),
            indptr,
            indices,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ngrams_window_the_prepared_string() {
        let vectorizer = NgramVectorizer::default();
        assert_eq!(vectorizer.ngrams("AUS ST"), ["AUS", "USS", "SST"]);
        assert!(vectorizer.ngrams("AB").is_empty());
        assert!(vectorizer.ngrams("").is_empty());
    }

    #[test]
    fn rows_are_l2_normalized() {
        let vectorizer = NgramVectorizer::default();
        let docs = vec!["AUS ST".to_string(), "BIG CALM".to_string()];
        let matrix = vectorizer.fit_transform(&docs);
        for i in 0..matrix.rows {
            let (_, weights) = matrix.row(i);
            let norm: f64 = weights.iter().map(|w| w * w).sum();
            assert!((norm - 1.0).abs() < 1e-9, "row {i} norm {norm}");
        }
    }

    #[test]
    fn identical_documents_share_identical_rows() {
        let vectorizer = NgramVectorizer::default();
        let docs = vec!["COOL COOL".to_string(), "COOL COOL".to_string()];
        let matrix = vectorizer.fit_transform(&docs);
        assert_eq!(matrix.row(0), matrix.row(1));
    }

    #[test]
    fn short_documents_produce_empty_rows() {
        let vectorizer = NgramVectorizer::default();
        let docs = vec!["".to_string(), "AUS ST".to_string()];
        let matrix = vectorizer.fit_transform(&docs);
        let (terms, _) = matrix.row(0);
        assert!(terms.is_empty());
        let (terms, _) = matrix.row(1);
        assert_eq!(terms.len(), 3);
    }

    #[test]
    fn rare_grams_outweigh_common_grams() {
        let vectorizer = NgramVectorizer::default();
        // "AAAB" shares AAA with both others; BBB is unique to it.
        let docs = vec![
            "AAAB B".to_string(),
            "AAAA".to_string(),
            "AAAC".to_string(),
        ];
        let matrix = vectorizer.fit_transform(&docs);
        let (terms, weights) = matrix.row(0);
        assert!(terms.len() >= 2);
        // The shared leading gram gets a lower weight than the unique tail.
        assert!(weights[0] < weights[weights.len() - 1]);
    }
}
