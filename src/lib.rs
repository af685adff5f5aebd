//! # linkx
//!
//! Incremental entity resolution across heterogeneous tabular datasets.
//!
//! linkx decides which records across and within datasets refer to the same
//! underlying entity (a person, a company, a parcel), using exact equality
//! of deterministic canonical-value identifiers together with approximate
//! textual similarity from n-gram TF-IDF cosine scores.
//!
//! ## Pipeline
//!
//! ```text
//! ┌───────────┐   ┌──────────┐   ┌────────────┐   ┌──────────────┐
//! │  Loader   │──>│ Canonic- │──>│ Registries │──>│ Exact links  │
//! │ (trait)   │   │ alizer   │   │ (per facet)│   │ within/across│
//! └───────────┘   │ (trait)  │   └────────────┘   └──────────────┘
//!                 └──────────┘         │                 │
//!                                ┌───────────┐    ┌─────────────┐
//!                                │ Similarity│───>│ Link tables │
//!                                │ (top-K)   │    │ (store)     │
//!                                └───────────┘    └─────────────┘
//! ```
//!
//! Text cleaning, file IO, configuration files and export are external
//! collaborators: implement [`Canonicalizer`] and [`TableLoader`], build a
//! [`LinkageConfig`], then call [`run_linkage`] against an open
//! [`StoreManager`]. Reruns are idempotent: registries only grow, link
//! tables are replaced wholesale, and each unordered dataset pair is linked
//! exactly once across runs.
//!
//! ## Crate Structure
//!
//! - `linkx-core` - facet kinds, identity hashing, registries, exact linkage
//! - `linkx-similarity` - n-gram TF-IDF vectorization and sparse top-K cosine search
//! - `linkx-storage` - persisted store, snapshots, single-writer manager

pub mod config;
pub mod orchestrator;

// Re-export core types
pub use linkx_core::{
    create_across_links, create_within_links, entity_id, optional_entity_id, CanonicalAddress,
    Canonicalizer, EntityId, EntityRegistry, Error, FacetKind, LinkContext, LinkRow, LinkTable,
    RawTable, RecordTable, Registries, Result, SimilarityIndex, SimilarityPair, SimilarityRelation,
    TableSpec,
};

// Re-export similarity engine
pub use linkx_similarity::{build_similarity, NgramVectorizer, TopKParams};

// Re-export storage
pub use linkx_storage::{pair_key, DatasetState, LinkStore, StoreManager};

pub use config::{ColumnRef, DatasetConfig, LinkageConfig, RunOptions, TableConfig};
pub use orchestrator::{run_linkage, DatasetOutcome, DatasetStatus, RunSummary, TableLoader};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        run_linkage, CanonicalAddress, Canonicalizer, ColumnRef, DatasetConfig, DatasetStatus,
        EntityId, Error, FacetKind, LinkStore, LinkTable, LinkageConfig, RawTable, Result,
        RunOptions, RunSummary, StoreManager, TableConfig, TableLoader,
    };
}

/// Install a process-wide `tracing` subscriber with `RUST_LOG`-style
/// filtering on top of the given default level.
pub fn init_tracing(level: tracing::Level) {
    use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
