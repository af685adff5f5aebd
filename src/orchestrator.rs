//! The linkage pipeline.
//!
//! Decides which configured datasets still need work, loads and registers
//! them, rebuilds the global similarity relations when fuzzy matching is
//! on, and computes within- and across-dataset link tables, guaranteeing
//! each unordered dataset pair is processed at most once across incremental
//! runs.

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use linkx_core::{
    create_across_links, create_within_links, entity_id, Canonicalizer, EntityId, Error,
    FacetKind, LinkContext, RawTable, RecordTable, Result, TableSpec,
};
use linkx_similarity::{build_similarity, TopKParams};
use linkx_storage::{pair_key, DatasetState, LinkStore};

use crate::config::{DatasetConfig, LinkageConfig, TableConfig};

/// Tabular loading collaborator. Implementations own file formats and IO;
/// a load failure is fatal for that dataset only.
pub trait TableLoader {
    fn load(&self, dataset: &str, table: &TableConfig) -> Result<RawTable>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DatasetStatus {
    Loaded,
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetOutcome {
    pub dataset: String,
    pub status: DatasetStatus,
}

/// What one run did: per-dataset outcome and the link tables written.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub datasets: Vec<DatasetOutcome>,
    pub link_tables: Vec<String>,
}

impl RunSummary {
    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().filter_map(|o| match o.status {
            DatasetStatus::Loaded => Some(o.dataset.as_str()),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &str> {
        self.datasets.iter().filter_map(|o| match o.status {
            DatasetStatus::Failed(_) => Some(o.dataset.as_str()),
            _ => None,
        })
    }
}

/// Run the full load-and-link pipeline against an open store.
///
/// Dataset-level failures (missing file, unsupported format, empty input)
/// skip that dataset and continue; identifier collisions abort the whole
/// run since they would corrupt identity. The caller persists the store
/// afterwards, so a partially successful run keeps its successful subset.
pub fn run_linkage(
    store: &mut LinkStore,
    config: &LinkageConfig,
    loader: &dyn TableLoader,
    canonicalizer: &dyn Canonicalizer,
) -> Result<RunSummary> {
    config.validate()?;
    let started = Utc::now();

    let bad_addresses = canonical_bad_addresses(config, canonicalizer);
    let excluded = excluded_ids(config, canonicalizer);

    // Load every dataset whose facet columns are not yet fully registered.
    let mut outcomes = Vec::with_capacity(config.datasets.len());
    let mut loaded: Vec<&DatasetConfig> = Vec::new();
    for dataset in &config.datasets {
        let configured: Vec<String> = dataset
            .tables
            .iter()
            .flat_map(|t| t.qualified_columns(&dataset.name))
            .collect();
        let already_linked = !config.options.force_rebuild
            && store.has_columns(&dataset.name, configured.iter().map(String::as_str));
        if already_linked {
            info!(dataset = %dataset.name, "skipping dataset, already linked");
            outcomes.push(DatasetOutcome {
                dataset: dataset.name.clone(),
                status: DatasetStatus::Skipped,
            });
            continue;
        }

        match load_dataset(store, dataset, loader, canonicalizer, &bad_addresses) {
            Ok(state) => {
                info!(
                    dataset = %dataset.name,
                    tables = state.tables.len(),
                    "loaded and registered dataset"
                );
                store.put_dataset(&dataset.name, state);
                loaded.push(dataset);
                outcomes.push(DatasetOutcome {
                    dataset: dataset.name.clone(),
                    status: DatasetStatus::Loaded,
                });
            }
            Err(err @ Error::HashCollision { .. }) => return Err(err),
            Err(err) => {
                warn!(dataset = %dataset.name, error = %err, "dataset failed, continuing");
                outcomes.push(DatasetOutcome {
                    dataset: dataset.name.clone(),
                    status: DatasetStatus::Failed(err.to_string()),
                });
            }
        }
    }

    // Fuzzy relations are global per facet kind: rebuilt once when any
    // dataset was added, never per dataset pair.
    if config.options.fuzzy_matching && !loaded.is_empty() {
        for kind in [FacetKind::Name, FacetKind::StreetName] {
            if let Some(registry) = store.registries().registry(kind) {
                store.put_similarity(build_similarity(registry, &TopKParams::default()));
            }
        }
    }
    let name_index = config
        .options
        .fuzzy_matching
        .then(|| store.similarity(FacetKind::Name).map(|r| r.index()))
        .flatten();
    let street_name_index = config
        .options
        .fuzzy_matching
        .then(|| store.similarity(FacetKind::StreetName).map(|r| r.index()))
        .flatten();
    let ctx = LinkContext {
        excluded: &excluded,
        name_similarity: name_index.as_ref(),
        street_name_similarity: street_name_index.as_ref(),
    };

    let mut link_tables = Vec::new();

    for dataset in &loaded {
        let Some(state) = store.dataset(&dataset.name) else {
            continue;
        };
        let links = create_within_links(&dataset.name, &state.tables, &ctx);
        info!(dataset = %dataset.name, pairs = links.rows.len(), "created within links");
        link_tables.push(links.name.clone());
        store.put_link_table(links);
    }

    // Queue each unordered dataset pair at most once: pairs already linked
    // in a prior run and pairs queued twice in this run are both skipped.
    let others: Vec<String> = store.dataset_names().map(str::to_string).collect();
    let mut queued: HashSet<String> = HashSet::new();
    let mut pairs: Vec<(String, String, String)> = Vec::new();
    for dataset in &loaded {
        for other in &others {
            if *other == dataset.name {
                continue;
            }
            let key = pair_key(&dataset.name, other);
            let done = !config.options.force_rebuild && store.pair_done(&key);
            if done || !queued.insert(key.clone()) {
                continue;
            }
            pairs.push((dataset.name.clone(), other.clone(), key));
        }
    }

    for (left, right, key) in pairs {
        let (Some(left_state), Some(right_state)) = (store.dataset(&left), store.dataset(&right))
        else {
            continue;
        };
        let links = create_across_links(&left, &left_state.tables, &right, &right_state.tables, &ctx);
        info!(
            dataset_1 = %left,
            dataset_2 = %right,
            pairs = links.rows.len(),
            "created across links"
        );
        link_tables.push(links.name.clone());
        store.put_link_table(links);
        store.mark_pair(key);
    }

    Ok(RunSummary {
        started,
        finished: Utc::now(),
        datasets: outcomes,
        link_tables,
    })
}

/// Load, canonicalize and register one dataset. Facet columns absent from
/// the data are dropped for this run with a warning; everything else is a
/// hard failure for the dataset.
fn load_dataset(
    store: &mut LinkStore,
    dataset: &DatasetConfig,
    loader: &dyn TableLoader,
    canonicalizer: &dyn Canonicalizer,
    bad_addresses: &HashSet<String>,
) -> Result<DatasetState> {
    let mut state = DatasetState::default();
    for table_config in &dataset.tables {
        let raw = loader.load(&dataset.name, table_config)?;
        let spec = TableSpec {
            table: table_config.table_name.clone(),
            id_column: table_config.id_column.normalized.clone(),
            name_columns: present_columns(&raw, &dataset.name, &table_config.name_columns),
            address_columns: present_columns(&raw, &dataset.name, &table_config.address_columns),
        };
        let mut table = RecordTable::from_raw(&raw, &spec, canonicalizer, bad_addresses)?;
        store.registries_mut().register_table(&mut table)?;
        state
            .columns
            .extend(table.facet_columns().map(str::to_string));
        state.tables.push(table);
    }
    Ok(state)
}

fn present_columns(
    raw: &RawTable,
    dataset: &str,
    columns: &[crate::config::ColumnRef],
) -> Vec<String> {
    columns
        .iter()
        .filter_map(|column| {
            if raw.column_index(&column.normalized).is_some() {
                Some(column.normalized.clone())
            } else {
                warn!(
                    dataset = %dataset,
                    table = %raw.table,
                    column = %column.original,
                    "column not found in data, dropping for this run"
                );
                None
            }
        })
        .collect()
}

/// Canonical forms of the configured bad-address placeholders. A non-empty
/// list also flags the empty canonical value.
fn canonical_bad_addresses(
    config: &LinkageConfig,
    canonicalizer: &dyn Canonicalizer,
) -> HashSet<String> {
    let mut bad: HashSet<String> = HashSet::new();
    for raw in &config.options.bad_addresses {
        bad.insert(raw.clone());
        if let Some(address) = canonicalizer.canonicalize_address(raw) {
            if let Some(street) = address.street() {
                bad.insert(street);
            }
            if let Some(full) = address.full {
                bad.insert(full);
            }
        }
    }
    if !bad.is_empty() {
        bad.insert(String::new());
    }
    bad
}

/// Identifiers of the configured link exclusions, in both raw and canonical
/// form so exclusion is applied to whichever the registry holds.
fn excluded_ids(config: &LinkageConfig, canonicalizer: &dyn Canonicalizer) -> AHashSet<EntityId> {
    let mut excluded = AHashSet::new();
    for raw in &config.options.link_exclusions {
        excluded.insert(entity_id(raw));
        if let Some(name) = canonicalizer.canonicalize_name(raw) {
            excluded.insert(entity_id(&name));
        }
        if let Some(address) = canonicalizer.canonicalize_address(raw) {
            if let Some(full) = address.full {
                excluded.insert(entity_id(&full));
            }
        }
    }
    excluded
}
