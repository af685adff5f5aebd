//! # linkx Core
//!
//! Core library for the linkx entity linkage engine.
//!
//! This crate provides the fundamental data structures and algorithms:
//!
//! - [`identity`] - Deterministic identifier hashing for canonical values
//! - [`EntityRegistry`] / [`Registries`] - Append-only canonical-value registries per facet
//! - [`RecordTable`] - Canonicalized source tables ready for linkage
//! - [`create_within_links`] / [`create_across_links`] - Exact linkage over facet identifiers
//! - [`SimilarityRelation`] - Per-facet fuzzy similarity rows consumed at link time
//!
//! ## Example
//!
//! ```rust
//! use linkx_core::{FacetKind, Registries};
//!
//! let mut registries = Registries::default();
//! let added = registries
//!     .ensure(FacetKind::Name)
//!     .register(["GRONKA PROPERTIES INC", "MOBUCASA INC"])
//!     .unwrap();
//! assert_eq!(added, 2);
//! assert!(registries.exists(FacetKind::Name));
//! ```

pub mod error;
pub mod facet;
pub mod identity;
pub mod link;
pub mod record;
pub mod registry;
pub mod relation;

pub use error::{Error, Result};
pub use facet::FacetKind;
pub use identity::{entity_id, optional_entity_id, EntityId};
pub use link::{create_across_links, create_within_links, LinkContext, LinkRow, LinkTable};
pub use record::{
    AddressColumn, CanonicalAddress, Canonicalizer, NameColumn, RawTable, RecordTable, TableSpec,
};
pub use registry::{EntityRegistry, Registries};
pub use relation::{SimilarityIndex, SimilarityPair, SimilarityRelation};
