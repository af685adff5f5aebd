//! Exact linkage engine.
//!
//! Candidate record pairs are generated by equality joins on facet
//! identifiers (and by similarity-relation joins when fuzzy matching is on),
//! never by cross products, so the output relation stays bounded by actual
//! agreement. Each candidate pair then gets one flag per compared column
//! combination: `Some(true)` when both identifiers are present and equal,
//! `Some(false)` when both are present and unequal, `None` when either side
//! is missing so no claim is made from absent data.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::identity::EntityId;
use crate::record::RecordTable;
use crate::relation::SimilarityIndex;

/// Per-run inputs shared by every link computation: identifiers excluded
/// from matching and the fuzzy lookup indexes (absent when fuzzy matching
/// is disabled).
pub struct LinkContext<'a> {
    pub excluded: &'a AHashSet<EntityId>,
    pub name_similarity: Option<&'a SimilarityIndex>,
    pub street_name_similarity: Option<&'a SimilarityIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRow {
    pub id_1: String,
    pub id_2: String,
    pub exact: Vec<Option<bool>>,
    pub fuzzy: Vec<Option<f64>>,
}

/// The combined exact + fuzzy link relation for one dataset pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkTable {
    pub name: String,
    pub id_columns: [String; 2],
    pub exact_columns: Vec<String>,
    pub fuzzy_columns: Vec<String>,
    pub rows: Vec<LinkRow>,
}

impl LinkTable {
    pub fn exact_column(&self, name: &str) -> Option<usize> {
        self.exact_columns.iter().position(|c| c == name)
    }

    pub fn fuzzy_column(&self, name: &str) -> Option<usize> {
        self.fuzzy_columns.iter().position(|c| c == name)
    }

    /// Rows are sorted by (id_1, id_2).
    pub fn row(&self, id_1: &str, id_2: &str) -> Option<&LinkRow> {
        self.rows
            .binary_search_by(|r| {
                (r.id_1.as_str(), r.id_2.as_str()).cmp(&(id_1, id_2))
            })
            .ok()
            .map(|i| &self.rows[i])
    }
}

/// Self-link a dataset: pairs of its own records agreeing on at least one
/// facet, restricted to `record_id_1 < record_id_2`.
pub fn create_within_links(
    dataset: &str,
    tables: &[RecordTable],
    ctx: &LinkContext<'_>,
) -> LinkTable {
    build_links(
        format!("{dataset}__{dataset}"),
        [format!("{dataset}_id_1"), format!("{dataset}_id_2")],
        tables,
        tables,
        true,
        ctx,
    )
}

/// Link two distinct datasets across the cross product of their configured
/// facet columns.
pub fn create_across_links(
    left_dataset: &str,
    left_tables: &[RecordTable],
    right_dataset: &str,
    right_tables: &[RecordTable],
    ctx: &LinkContext<'_>,
) -> LinkTable {
    build_links(
        format!("{left_dataset}__{right_dataset}"),
        [format!("{left_dataset}_id"), format!("{right_dataset}_id")],
        left_tables,
        right_tables,
        false,
        ctx,
    )
}

/// Identifier vector with a probe map from identifier to row indexes.
struct FacetIds {
    ids: Vec<Option<EntityId>>,
    rows_by_id: AHashMap<EntityId, SmallVec<[u32; 4]>>,
}

impl FacetIds {
    fn new(ids: Vec<Option<EntityId>>) -> Self {
        let mut rows_by_id: AHashMap<EntityId, SmallVec<[u32; 4]>> = AHashMap::new();
        for (row, id) in ids.iter().enumerate() {
            if let Some(id) = id {
                rows_by_id.entry(*id).or_default().push(row as u32);
            }
        }
        Self { ids, rows_by_id }
    }
}

struct AddressIndex {
    full: FacetIds,
    street: FacetIds,
    street_name: FacetIds,
    unit: Vec<Option<String>>,
    street_number: Vec<Option<String>>,
}

/// Exclusion- and skip-filtered view over one record table.
struct TableIndex {
    names: Vec<FacetIds>,
    addresses: Vec<AddressIndex>,
}

impl TableIndex {
    fn new(table: &RecordTable, excluded: &AHashSet<EntityId>) -> Self {
        let filter_ids = |ids: &[Option<EntityId>], skip: Option<&[bool]>| -> Vec<Option<EntityId>> {
            ids.iter()
                .enumerate()
                .map(|(row, id)| match id {
                    Some(id) if !excluded.contains(id) && !skip.is_some_and(|s| s[row]) => {
                        Some(*id)
                    }
                    _ => None,
                })
                .collect()
        };
        let filter_values = |values: &[Option<String>], skip: &[bool]| -> Vec<Option<String>> {
            values
                .iter()
                .enumerate()
                .map(|(row, v)| if skip[row] { None } else { v.clone() })
                .collect()
        };

        Self {
            names: table
                .names
                .iter()
                .map(|col| FacetIds::new(filter_ids(&col.ids, None)))
                .collect(),
            addresses: table
                .addresses
                .iter()
                .map(|col| AddressIndex {
                    full: FacetIds::new(filter_ids(&col.full_ids, Some(&col.skip))),
                    street: FacetIds::new(filter_ids(&col.street_ids, Some(&col.skip))),
                    street_name: FacetIds::new(filter_ids(&col.street_name_ids, Some(&col.skip))),
                    unit: filter_values(&col.unit, &col.skip),
                    street_number: filter_values(&col.street_number, &col.skip),
                })
                .collect(),
        }
    }
}

/// One compared (name column, name column) combination and its slots in the
/// output table.
struct NameCombo {
    left_table: usize,
    right_table: usize,
    left_col: usize,
    right_col: usize,
    exact: usize,
    fuzzy: Option<usize>,
}

struct AddressCombo {
    left_table: usize,
    right_table: usize,
    left_col: usize,
    right_col: usize,
    address: usize,
    street: usize,
    unit: usize,
    street_num: usize,
    street_name_fuzzy: Option<usize>,
}

fn build_links(
    name: String,
    id_columns: [String; 2],
    left: &[RecordTable],
    right: &[RecordTable],
    within: bool,
    ctx: &LinkContext<'_>,
) -> LinkTable {
    let table_pairs: Vec<(usize, usize)> = if within {
        (0..left.len())
            .flat_map(|i| (i..left.len()).map(move |j| (i, j)))
            .collect()
    } else {
        (0..left.len())
            .flat_map(|i| (0..right.len()).map(move |j| (i, j)))
            .collect()
    };

    // Assign every flag column up front so each row buffer can be sized once.
    let mut exact_columns: Vec<String> = Vec::new();
    let mut fuzzy_columns: Vec<String> = Vec::new();
    let mut name_combos: Vec<NameCombo> = Vec::new();
    let mut address_combos: Vec<AddressCombo> = Vec::new();

    for &(ti, tj) in &table_pairs {
        let (ta, tb) = (&left[ti], &right[tj]);
        let same_table = within && ti == tj;
        for (ci, ca) in ta.names.iter().enumerate() {
            for (cj, cb) in tb.names.iter().enumerate() {
                if same_table && cj < ci {
                    continue;
                }
                name_combos.push(NameCombo {
                    left_table: ti,
                    right_table: tj,
                    left_col: ci,
                    right_col: cj,
                    exact: push_column(
                        &mut exact_columns,
                        format!("{}_{}_name_match", ca.qualified, cb.qualified),
                    ),
                    fuzzy: ctx.name_similarity.map(|_| {
                        push_column(
                            &mut fuzzy_columns,
                            format!("{}_{}_name_fuzzy", ca.qualified, cb.qualified),
                        )
                    }),
                });
            }
        }
        for (ci, ca) in ta.addresses.iter().enumerate() {
            for (cj, cb) in tb.addresses.iter().enumerate() {
                if same_table && cj < ci {
                    continue;
                }
                address_combos.push(AddressCombo {
                    left_table: ti,
                    right_table: tj,
                    left_col: ci,
                    right_col: cj,
                    address: push_column(
                        &mut exact_columns,
                        format!("{}_{}_address_match", ca.qualified, cb.qualified),
                    ),
                    street: push_column(
                        &mut exact_columns,
                        format!("{}_{}_street_match", ca.qualified, cb.qualified),
                    ),
                    unit: push_column(
                        &mut exact_columns,
                        format!("{}_{}_unit_match", ca.qualified, cb.qualified),
                    ),
                    street_num: push_column(
                        &mut exact_columns,
                        format!("{}_{}_street_num_match", ca.qualified, cb.qualified),
                    ),
                    street_name_fuzzy: ctx.street_name_similarity.map(|_| {
                        push_column(
                            &mut fuzzy_columns,
                            format!("{}_{}_street_name_fuzzy", ca.qualified, cb.qualified),
                        )
                    }),
                });
            }
        }
    }

    let left_index: Vec<TableIndex> =
        left.iter().map(|t| TableIndex::new(t, ctx.excluded)).collect();
    let right_index: Vec<TableIndex> = if within {
        Vec::new()
    } else {
        right.iter().map(|t| TableIndex::new(t, ctx.excluded)).collect()
    };

    let n_exact = exact_columns.len();
    let n_fuzzy = fuzzy_columns.len();
    let mut rows: AHashMap<(String, String), (Vec<Option<bool>>, Vec<Option<f64>>)> =
        AHashMap::new();

    for &(ti, tj) in &table_pairs {
        let (ta, tb) = (&left[ti], &right[tj]);
        let ia = &left_index[ti];
        let ib = if within { &left_index[tj] } else { &right_index[tj] };
        let same_table = within && ti == tj;

        // Candidate generation: equality joins plus similarity joins.
        let mut candidates: AHashSet<(u32, u32)> = AHashSet::new();
        {
            let mut add = |i: u32, j: u32| {
                if same_table {
                    if i == j {
                        return;
                    }
                    let (a, b) = if ta.record_ids[i as usize] <= tb.record_ids[j as usize] {
                        (i, j)
                    } else {
                        (j, i)
                    };
                    candidates.insert((a, b));
                } else {
                    candidates.insert((i, j));
                }
            };

            for combo in combos_of(&name_combos, ti, tj) {
                join_equal(&ia.names[combo.left_col], &ib.names[combo.right_col], &mut add);
                if let Some(sim) = ctx.name_similarity {
                    join_similar(&ia.names[combo.left_col], &ib.names[combo.right_col], sim, &mut add);
                }
            }
            for combo in combos_of(&address_combos, ti, tj) {
                let (ca, cb) = (&ia.addresses[combo.left_col], &ib.addresses[combo.right_col]);
                join_equal(&ca.full, &cb.full, &mut add);
                join_equal(&ca.street, &cb.street, &mut add);
                if let Some(sim) = ctx.street_name_similarity {
                    join_similar(&ca.street_name, &cb.street_name, sim, &mut add);
                }
            }
        }

        debug!(
            table_1 = %ta.table,
            table_2 = %tb.table,
            candidates = candidates.len(),
            "generated candidate pairs"
        );

        // Flag every candidate for every combination of this table pair.
        for &(li, rj) in &candidates {
            let (li, rj) = (li as usize, rj as usize);
            let key = (ta.record_ids[li].clone(), tb.record_ids[rj].clone());
            let (exact, fuzzy) = rows
                .entry(key)
                .or_insert_with(|| (vec![None; n_exact], vec![None; n_fuzzy]));

            for combo in combos_of(&name_combos, ti, tj) {
                let a = ia.names[combo.left_col].ids[li];
                let b = ib.names[combo.right_col].ids[rj];
                exact[combo.exact] = id_flag(a, b);
                if let (Some(slot), Some(sim)) = (combo.fuzzy, ctx.name_similarity) {
                    fuzzy[slot] = fuzzy_score(a, b, sim);
                }
            }
            for combo in combos_of(&address_combos, ti, tj) {
                let (ca, cb) = (&ia.addresses[combo.left_col], &ib.addresses[combo.right_col]);
                exact[combo.address] = id_flag(ca.full.ids[li], cb.full.ids[rj]);
                exact[combo.street] = id_flag(ca.street.ids[li], cb.street.ids[rj]);
                exact[combo.unit] = value_flag(&ca.unit[li], &cb.unit[rj]);
                exact[combo.street_num] =
                    value_flag(&ca.street_number[li], &cb.street_number[rj]);
                if let (Some(slot), Some(sim)) =
                    (combo.street_name_fuzzy, ctx.street_name_similarity)
                {
                    fuzzy[slot] = fuzzy_score(ca.street_name.ids[li], cb.street_name.ids[rj], sim);
                }
            }
        }
    }

    let mut out: Vec<LinkRow> = rows
        .into_iter()
        .map(|((id_1, id_2), (exact, fuzzy))| LinkRow {
            id_1,
            id_2,
            exact,
            fuzzy,
        })
        .collect();
    out.sort_by(|a, b| (a.id_1.as_str(), a.id_2.as_str()).cmp(&(b.id_1.as_str(), b.id_2.as_str())));

    LinkTable {
        name,
        id_columns,
        exact_columns,
        fuzzy_columns,
        rows: out,
    }
}

fn push_column(columns: &mut Vec<String>, name: String) -> usize {
    columns.push(name);
    columns.len() - 1
}

trait TablePairCombo {
    fn tables(&self) -> (usize, usize);
}

impl TablePairCombo for NameCombo {
    fn tables(&self) -> (usize, usize) {
        (self.left_table, self.right_table)
    }
}

impl TablePairCombo for AddressCombo {
    fn tables(&self) -> (usize, usize) {
        (self.left_table, self.right_table)
    }
}

fn combos_of<C: TablePairCombo>(combos: &[C], ti: usize, tj: usize) -> impl Iterator<Item = &C> {
    combos.iter().filter(move |c| c.tables() == (ti, tj))
}

fn join_equal(a: &FacetIds, b: &FacetIds, add: &mut impl FnMut(u32, u32)) {
    for (i, id) in a.ids.iter().enumerate() {
        let Some(id) = id else { continue };
        if let Some(matches) = b.rows_by_id.get(id) {
            for &j in matches {
                add(i as u32, j);
            }
        }
    }
}

fn join_similar(
    a: &FacetIds,
    b: &FacetIds,
    sim: &SimilarityIndex,
    add: &mut impl FnMut(u32, u32),
) {
    for (i, id) in a.ids.iter().enumerate() {
        let Some(id) = id else { continue };
        for (other, _) in sim.neighbors(*id) {
            if let Some(matches) = b.rows_by_id.get(other) {
                for &j in matches {
                    add(i as u32, j);
                }
            }
        }
    }
}

fn id_flag(a: Option<EntityId>, b: Option<EntityId>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    }
}

fn value_flag(a: &Option<String>, b: &Option<String>) -> Option<bool> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    }
}

fn fuzzy_score(a: Option<EntityId>, b: Option<EntityId>, sim: &SimilarityIndex) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(sim.score(a, b).unwrap_or(0.0)),
        _ => None,
    }
}
