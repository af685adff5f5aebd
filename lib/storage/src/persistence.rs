//! Snapshot persistence for the link store.
//!
//! The whole store is serialized with bincode and written through a
//! temporary file that is atomically renamed into place, so readers never
//! observe a half-written snapshot.

use anyhow::{Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior::AllowOverwrite};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::LinkStore;

const SNAPSHOT_FILE: &str = "linkstore.bin";

pub struct SnapshotPersistence {
    snapshot_path: PathBuf,
}

impl SnapshotPersistence {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;
        Ok(Self {
            snapshot_path: data_dir.join(SNAPSHOT_FILE),
        })
    }

    /// Load the snapshot, or `None` when no snapshot has been written yet.
    pub fn load(&self) -> Result<Option<LinkStore>> {
        if !self.snapshot_path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.snapshot_path)
            .with_context(|| format!("reading {}", self.snapshot_path.display()))?;
        let store = bincode::deserialize(&bytes)
            .with_context(|| format!("decoding {}", self.snapshot_path.display()))?;
        Ok(Some(store))
    }

    /// Serialize and atomically replace the snapshot.
    pub fn save(&self, store: &LinkStore) -> Result<()> {
        let bytes = bincode::serialize(store).context("encoding link store")?;
        AtomicFile::new(&self.snapshot_path, AllowOverwrite)
            .write(|f| f.write_all(&bytes))
            .with_context(|| format!("writing {}", self.snapshot_path.display()))?;
        Ok(())
    }

    /// Raw snapshot bytes, for change detection and tests.
    pub fn snapshot_bytes(store: &LinkStore) -> Result<Vec<u8>> {
        bincode::serialize(store).context("encoding link store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkx_core::FacetKind;

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = SnapshotPersistence::new(dir.path()).unwrap();

        assert!(persistence.load().unwrap().is_none());

        let mut store = LinkStore::default();
        store
            .registries_mut()
            .ensure(FacetKind::Name)
            .register(["SANJAY PATEL", "MOBUCASA INC"])
            .unwrap();
        persistence.save(&store).unwrap();

        let loaded = persistence.load().unwrap().unwrap();
        let registry = loaded.registries().registry(FacetKind::Name).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("SANJAY PATEL"),
            store
                .registries()
                .registry(FacetKind::Name)
                .unwrap()
                .get("SANJAY PATEL")
        );
    }

    #[test]
    fn identical_stores_serialize_identically() {
        let mut a = LinkStore::default();
        let mut b = LinkStore::default();
        for store in [&mut a, &mut b] {
            store
                .registries_mut()
                .ensure(FacetKind::Street)
                .register(["8041 SAYRE AVE", "645 LEAMINGTON"])
                .unwrap();
        }
        assert_eq!(
            SnapshotPersistence::snapshot_bytes(&a).unwrap(),
            SnapshotPersistence::snapshot_bytes(&b).unwrap()
        );
    }
}
