//! Entity registries: append-only, deduplicated mappings from canonical
//! value to identifier, one registry per facet kind.
//!
//! Registration is a set union by canonical value. An identifier, once
//! assigned, is never overwritten and entries are never deleted, so
//! identifiers stay stable across incremental runs. A reverse map is kept
//! so that two distinct canonical values mapping to the same identifier is
//! detected and reported instead of silently merging unrelated entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::facet::FacetKind;
use crate::identity::{self, EntityId};
use crate::record::RecordTable;

/// Deduplicated canonical-value -> identifier store for one facet kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRegistry {
    kind: FacetKind,
    entries: BTreeMap<String, EntityId>,
    by_id: BTreeMap<EntityId, String>,
}

impl EntityRegistry {
    pub fn new(kind: FacetKind) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
            by_id: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> FacetKind {
        self.kind
    }

    /// Union a batch of canonical values into the registry.
    ///
    /// Values already present keep their identifier. Returns the number of
    /// entries added. A value whose identifier is already held by a
    /// different value fails the whole run with [`Error::HashCollision`].
    pub fn register<'a, I>(&mut self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut added = 0;
        for value in values {
            if self.entries.contains_key(value) {
                continue;
            }
            let id = identity::entity_id(value);
            if let Some(existing) = self.by_id.get(&id) {
                return Err(Error::HashCollision {
                    id,
                    value_a: existing.clone(),
                    value_b: value.to_string(),
                });
            }
            self.entries.insert(value.to_string(), id);
            self.by_id.insert(id, value.to_string());
            added += 1;
        }
        Ok(added)
    }

    pub fn get(&self, value: &str) -> Option<EntityId> {
        self.entries.get(value).copied()
    }

    pub fn value_of(&self, id: EntityId) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in canonical-value order, for reproducible export.
    pub fn iter(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.entries.iter().map(|(value, id)| (value.as_str(), *id))
    }

    #[cfg(test)]
    pub(crate) fn insert_raw(&mut self, value: &str, id: EntityId) {
        self.entries.insert(value.to_string(), id);
        self.by_id.insert(id, value.to_string());
    }
}

/// The full registry set, one [`EntityRegistry`] per facet kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registries {
    inner: BTreeMap<FacetKind, EntityRegistry>,
}

impl Registries {
    /// Whether a registry for this facet kind has been created yet.
    pub fn exists(&self, kind: FacetKind) -> bool {
        self.inner.contains_key(&kind)
    }

    pub fn registry(&self, kind: FacetKind) -> Option<&EntityRegistry> {
        self.inner.get(&kind)
    }

    pub fn ensure(&mut self, kind: FacetKind) -> &mut EntityRegistry {
        self.inner
            .entry(kind)
            .or_insert_with(|| EntityRegistry::new(kind))
    }

    /// Attach identifiers to every facet column of a canonicalized table and
    /// union the distinct canonical values into the matching registries.
    ///
    /// Single-writer step: callers registering several tables in one run
    /// must do so sequentially through the same `Registries` value.
    pub fn register_table(&mut self, table: &mut RecordTable) -> Result<()> {
        for col in &mut table.names {
            col.ids = col
                .values
                .iter()
                .map(|v| identity::optional_entity_id(v.as_deref()))
                .collect();
            self.ensure(FacetKind::Name)
                .register(col.values.iter().flatten().map(String::as_str))?;
        }
        for col in &mut table.addresses {
            col.full_ids = col
                .full
                .iter()
                .map(|v| identity::optional_entity_id(v.as_deref()))
                .collect();
            col.street_ids = col
                .street
                .iter()
                .map(|v| identity::optional_entity_id(v.as_deref()))
                .collect();
            col.street_name_ids = col
                .street_name
                .iter()
                .map(|v| identity::optional_entity_id(v.as_deref()))
                .collect();
            self.ensure(FacetKind::Address)
                .register(col.full.iter().flatten().map(String::as_str))?;
            self.ensure(FacetKind::Street)
                .register(col.street.iter().flatten().map(String::as_str))?;
            self.ensure(FacetKind::StreetName)
                .register(col.street_name.iter().flatten().map(String::as_str))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_deduplicates_values() {
        let mut registry = EntityRegistry::new(FacetKind::Name);
        let added = registry
            .register(["SANJAY PATEL", "MOBUCASA INC", "SANJAY PATEL"])
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn register_is_monotonic_and_never_overwrites() {
        let mut registry = EntityRegistry::new(FacetKind::Name);
        registry.register(["A", "B"]).unwrap();
        let id_a = registry.get("A").unwrap();
        let id_b = registry.get("B").unwrap();

        let added = registry.register(["B", "C"]).unwrap();
        assert_eq!(added, 1);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get("A"), Some(id_a));
        assert_eq!(registry.get("B"), Some(id_b));
    }

    #[test]
    fn registration_matches_identity_hash() {
        let mut registry = EntityRegistry::new(FacetKind::Address);
        registry.register(["8041 SAYRE AVE BURBANK IL 60459"]).unwrap();
        assert_eq!(
            registry.get("8041 SAYRE AVE BURBANK IL 60459"),
            Some(identity::entity_id("8041 SAYRE AVE BURBANK IL 60459"))
        );
    }

    #[test]
    fn identifier_collision_is_detected() {
        let mut registry = EntityRegistry::new(FacetKind::Name);
        // Plant an entry that squats on B's identifier under a different value.
        registry.insert_raw("A", identity::entity_id("B"));
        let err = registry.register(["B"]).unwrap_err();
        assert!(matches!(err, Error::HashCollision { .. }));
    }

    #[test]
    fn registry_iteration_is_sorted_by_value() {
        let mut registry = EntityRegistry::new(FacetKind::Name);
        registry.register(["C", "A", "B"]).unwrap();
        let values: Vec<&str> = registry.iter().map(|(v, _)| v).collect();
        assert_eq!(values, ["A", "B", "C"]);
    }

    #[test]
    fn registries_exists_tracks_creation() {
        let mut registries = Registries::default();
        assert!(!registries.exists(FacetKind::Name));
        registries.ensure(FacetKind::Name).register(["X"]).unwrap();
        assert!(registries.exists(FacetKind::Name));
        assert!(!registries.exists(FacetKind::Street));
    }
}
