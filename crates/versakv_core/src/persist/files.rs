//! Snapshot persistence over storage backends.

use super::snapshot::{
    decode_manager, decode_store, encode_manager, encode_store, ManagerSnapshot, StoreSnapshot,
};
use super::{PersistedState, Persistence};
use crate::error::CoreResult;
use parking_lot::Mutex;
use std::path::Path;
use versakv_storage::{FileBackend, InMemoryBackend, StorageBackend};

/// Keeps the two snapshots in a pair of storage backends.
///
/// Every save replaces the previous blob whole, so a crash mid-save leaves
/// the last good snapshot in place.
pub struct SnapshotFiles {
    data: Mutex<Box<dyn StorageBackend>>,
    state: Mutex<Box<dyn StorageBackend>>,
}

impl SnapshotFiles {
    /// Creates snapshot storage over the given backends.
    pub fn new(data: Box<dyn StorageBackend>, state: Box<dyn StorageBackend>) -> Self {
        Self {
            data: Mutex::new(data),
            state: Mutex::new(state),
        }
    }

    /// Creates snapshot storage that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(
            Box::new(InMemoryBackend::new()),
            Box::new(InMemoryBackend::new()),
        )
    }

    /// Opens file-backed snapshot storage.
    ///
    /// With `sync` set every save is fsynced before it is published.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened.
    pub fn open(data_path: &Path, state_path: &Path, sync: bool) -> CoreResult<Self> {
        let data = FileBackend::open(data_path)?.sync_on_replace(sync);
        let state = FileBackend::open(state_path)?.sync_on_replace(sync);
        Ok(Self::new(Box::new(data), Box::new(state)))
    }

    fn write(backend: &Mutex<Box<dyn StorageBackend>>, bytes: &[u8]) -> CoreResult<()> {
        let mut backend = backend.lock();
        backend.replace(bytes)?;
        backend.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for SnapshotFiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotFiles").finish_non_exhaustive()
    }
}

impl Persistence for SnapshotFiles {
    fn load(&self) -> CoreResult<PersistedState> {
        let data = self.data.lock().read_all()?;
        let state = self.state.lock().read_all()?;

        let store = if data.is_empty() {
            StoreSnapshot::new()
        } else {
            decode_store(&data).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring unreadable data snapshot");
                StoreSnapshot::new()
            })
        };

        let manager = if state.is_empty() {
            ManagerSnapshot::default()
        } else {
            decode_manager(&state).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "ignoring unreadable state snapshot");
                ManagerSnapshot::default()
            })
        };

        Ok(PersistedState { store, manager })
    }

    fn save_store(&self, snapshot: &StoreSnapshot) -> CoreResult<()> {
        let bytes = encode_store(snapshot)?;
        Self::write(&self.data, &bytes)
    }

    fn save_manager(&self, snapshot: &ManagerSnapshot) -> CoreResult<()> {
        let bytes = encode_manager(snapshot)?;
        Self::write(&self.state, &bytes)
    }
}
