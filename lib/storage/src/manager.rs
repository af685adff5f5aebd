//! Store manager: owns the open store and its on-disk snapshot.
//!
//! The registry union invariant assumes a single writer, so the store sits
//! behind a `parking_lot::RwLock`; a linkage run takes the write guard for
//! the full load-and-link sequence while exporters take read guards.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::path::Path;
use tracing::info;

use linkx_core::{Error, Result};

use crate::persistence::SnapshotPersistence;
use crate::store::LinkStore;

pub struct StoreManager {
    store: RwLock<LinkStore>,
    persistence: SnapshotPersistence,
}

impl StoreManager {
    /// Open a store directory, loading the existing snapshot if present.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let persistence =
            SnapshotPersistence::new(&data_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let store = match persistence.load().map_err(|e| Error::Storage(e.to_string()))? {
            Some(store) => {
                info!(
                    datasets = store.dataset_names().count(),
                    links = store.link_table_names().count(),
                    "loaded existing link store"
                );
                store
            }
            None => LinkStore::default(),
        };
        Ok(Self {
            store: RwLock::new(store),
            persistence,
        })
    }

    /// Read access for exporters and reporting.
    pub fn read(&self) -> RwLockReadGuard<'_, LinkStore> {
        self.store.read()
    }

    /// Exclusive access for a linkage run. Hold the guard for the whole run.
    pub fn write(&self) -> RwLockWriteGuard<'_, LinkStore> {
        self.store.write()
    }

    /// Persist the current store state.
    pub fn save(&self) -> Result<()> {
        let store = self.store.read();
        self.persistence
            .save(&store)
            .map_err(|e| Error::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkx_core::FacetKind;

    #[test]
    fn open_save_reopen_keeps_registrations() {
        let dir = tempfile::tempdir().unwrap();

        {
            let manager = StoreManager::open(dir.path()).unwrap();
            manager
                .write()
                .registries_mut()
                .ensure(FacetKind::Name)
                .register(["SANJAY PATEL"])
                .unwrap();
            manager.save().unwrap();
        }

        let reopened = StoreManager::open(dir.path()).unwrap();
        let store = reopened.read();
        assert_eq!(
            store.registries().registry(FacetKind::Name).unwrap().len(),
            1
        );
    }

    #[test]
    fn open_on_empty_directory_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        assert_eq!(manager.read().dataset_names().count(), 0);
    }
}
