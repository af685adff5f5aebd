//! The persisted linkage store.
//!
//! Holds everything a run reads or writes: the per-facet registries, the
//! global similarity relations, the canonicalized record tables per
//! dataset, the link tables per dataset pair, and the set of dataset pairs
//! already linked. Registries only grow; every keyed relation is replaced
//! wholesale on recomputation. All containers iterate in key order so that
//! serialized snapshots are byte-identical across identical runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use linkx_core::{FacetKind, LinkTable, RecordTable, Registries, SimilarityRelation};

/// Per-dataset state: which facet columns have been registered and the
/// canonicalized tables kept for later across-dataset linkage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetState {
    pub columns: BTreeSet<String>,
    pub tables: Vec<RecordTable>,
}

/// In-memory form of the persisted store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkStore {
    registries: Registries,
    similarities: BTreeMap<FacetKind, SimilarityRelation>,
    datasets: BTreeMap<String, DatasetState>,
    links: BTreeMap<String, LinkTable>,
    linked_pairs: BTreeSet<String>,
}

/// Order-independent key for an unordered dataset pair: the sorted names
/// joined with `__`, so (a, b) and (b, a) collapse to one key.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}__{b}")
    } else {
        format!("{b}__{a}")
    }
}

impl LinkStore {
    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    pub fn registries_mut(&mut self) -> &mut Registries {
        &mut self.registries
    }

    pub fn similarity(&self, kind: FacetKind) -> Option<&SimilarityRelation> {
        self.similarities.get(&kind)
    }

    /// Create-or-replace the similarity relation for its facet kind.
    pub fn put_similarity(&mut self, relation: SimilarityRelation) {
        self.similarities.insert(relation.kind, relation);
    }

    pub fn dataset(&self, name: &str) -> Option<&DatasetState> {
        self.datasets.get(name)
    }

    pub fn dataset_names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    /// Create-or-replace a dataset's registered state.
    pub fn put_dataset(&mut self, name: &str, state: DatasetState) {
        self.datasets.insert(name.to_string(), state);
    }

    /// Whether every column in `columns` is already registered for `name`.
    pub fn has_columns<'a, I>(&self, name: &str, columns: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self.datasets.get(name) {
            Some(state) => columns.into_iter().all(|c| state.columns.contains(c)),
            None => false,
        }
    }

    pub fn link_table(&self, name: &str) -> Option<&LinkTable> {
        self.links.get(name)
    }

    pub fn link_table_names(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Create-or-replace a link table under its own name.
    pub fn put_link_table(&mut self, table: LinkTable) {
        self.links.insert(table.name.clone(), table);
    }

    pub fn pair_done(&self, key: &str) -> bool {
        self.linked_pairs.contains(key)
    }

    pub fn mark_pair(&mut self, key: String) {
        self.linked_pairs.insert(key);
    }

    pub fn linked_pair_count(&self) -> usize {
        self.linked_pairs.len()
    }
}
