//! Similarity relations: the global per-facet output of fuzzy matching.
//!
//! A relation holds one row per unordered identifier pair with a cosine
//! similarity score. Link construction joins record pairs against a
//! [`SimilarityIndex`] built from the relation instead of recomputing
//! similarity per dataset pair.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::facet::FacetKind;
use crate::identity::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub id_a: EntityId,
    pub id_b: EntityId,
    pub value_a: String,
    pub value_b: String,
    pub score: f64,
}

/// Top-K similarity rows for one facet kind, sorted by score descending.
///
/// Invariants: `id_a != id_b` in every row, and at most one row exists per
/// unordered pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRelation {
    pub kind: FacetKind,
    pub pairs: Vec<SimilarityPair>,
}

impl SimilarityRelation {
    pub fn new(kind: FacetKind) -> Self {
        Self {
            kind,
            pairs: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Build the lookup index used at link time.
    pub fn index(&self) -> SimilarityIndex {
        let mut scores = AHashMap::with_capacity(self.pairs.len());
        let mut neighbors: AHashMap<EntityId, Vec<(EntityId, f64)>> = AHashMap::new();
        for pair in &self.pairs {
            scores.insert(ordered_key(pair.id_a, pair.id_b), pair.score);
            neighbors.entry(pair.id_a).or_default().push((pair.id_b, pair.score));
            neighbors.entry(pair.id_b).or_default().push((pair.id_a, pair.score));
        }
        SimilarityIndex { scores, neighbors }
    }
}

/// Order-independent lookup over one facet kind's similarity relation.
#[derive(Debug, Default)]
pub struct SimilarityIndex {
    scores: AHashMap<(EntityId, EntityId), f64>,
    neighbors: AHashMap<EntityId, Vec<(EntityId, f64)>>,
}

impl SimilarityIndex {
    pub fn score(&self, a: EntityId, b: EntityId) -> Option<f64> {
        self.scores.get(&ordered_key(a, b)).copied()
    }

    pub fn neighbors(&self, id: EntityId) -> &[(EntityId, f64)] {
        self.neighbors.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn ordered_key(a: EntityId, b: EntityId) -> (EntityId, EntityId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
