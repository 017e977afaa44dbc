//! Snapshot persistence.
//!
//! The engine hands complete snapshots to a [`Persistence`] implementation
//! after every commit and abort, and asks it for the last saved state once
//! at startup. Persistence is best-effort: the engine logs failed saves and
//! keeps running, and unreadable snapshots are treated as absent.

mod files;
mod snapshot;

pub use files::SnapshotFiles;
pub use snapshot::{
    decode_manager, decode_store, encode_manager, encode_store, ManagerSnapshot, StoreSnapshot,
    SNAPSHOT_VERSION,
};

use crate::error::CoreResult;

/// Everything restored at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    /// Saved version chains.
    pub store: StoreSnapshot,
    /// Saved Tid counter and active set.
    pub manager: ManagerSnapshot,
}

/// Saves and loads engine snapshots.
pub trait Persistence: Send + Sync {
    /// Loads the last saved state.
    ///
    /// Missing or corrupt snapshots yield the default (empty) parts.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures reading the underlying storage.
    fn load(&self) -> CoreResult<PersistedState>;

    /// Saves all version chains.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be written.
    fn save_store(&self, snapshot: &StoreSnapshot) -> CoreResult<()>;

    /// Saves the Tid counter and active set.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be written.
    fn save_manager(&self, snapshot: &ManagerSnapshot) -> CoreResult<()>;
}

/// Persistence that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

impl Persistence for NoopPersistence {
    fn load(&self) -> CoreResult<PersistedState> {
        Ok(PersistedState::default())
    }

    fn save_store(&self, _snapshot: &StoreSnapshot) -> CoreResult<()> {
        Ok(())
    }

    fn save_manager(&self, _snapshot: &ManagerSnapshot) -> CoreResult<()> {
        Ok(())
    }
}
