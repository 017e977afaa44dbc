//! Engine facade and recovery.

use crate::config::Config;
#[cfg(feature = "std")]
use crate::dir::DatabaseDir;
use crate::error::CoreResult;
use crate::mvcc::VersionStore;
use crate::persist::{NoopPersistence, PersistedState, Persistence};
use crate::stats::EngineStats;
use crate::transaction::{Transaction, TransactionManager};
use crate::types::{Key, ReadResult, TransactionId, Value};
#[cfg(feature = "std")]
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The engine handle.
///
/// `Engine` owns everything a running instance needs: the version store,
/// the transaction manager with its lock table and undo log, persistence,
/// and statistics. Independent engines share nothing.
///
/// # Opening an Engine
///
/// ```rust,ignore
/// use versakv_core::Engine;
/// use std::path::Path;
///
/// let engine = Engine::open(Path::new("my_data"))?;
///
/// engine.transaction(|tx| {
///     tx.put("balance", 100)?;
///     tx.inc("balance")?;
///     Ok(())
/// })?;
/// ```
///
/// # In-Memory Engines
///
/// For testing, use `Engine::open_in_memory()`:
///
/// ```rust,ignore
/// let engine = Engine::open_in_memory();
/// ```
pub struct Engine {
    /// Data directory (holds the lock). None for in-memory engines.
    #[cfg(feature = "std")]
    dir: Option<DatabaseDir>,
    store: Arc<VersionStore>,
    manager: TransactionManager,
    stats: Arc<EngineStats>,
}

impl Engine {
    /// Opens an engine over a data directory.
    ///
    /// The directory is created if needed, locked against other engines,
    /// and any saved snapshots are loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another engine has the directory locked (`DatabaseLocked`)
    /// - The directory is missing and `create_if_missing` is false
    /// - I/O errors occur
    #[cfg(feature = "std")]
    pub fn open(path: &Path) -> CoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens an engine over a data directory with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use versakv_core::{Config, Engine};
    /// use std::path::Path;
    ///
    /// let config = Config::default()
    ///     .sync_on_flush(false)
    ///     .persist_on_begin(false);
    ///
    /// let engine = Engine::open_with_config(Path::new("my_data"), config)?;
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    #[cfg(feature = "std")]
    pub fn open_with_config(path: &Path, config: Config) -> CoreResult<Self> {
        use crate::persist::SnapshotFiles;

        let dir = DatabaseDir::open(path, config.create_if_missing)?;
        let files = SnapshotFiles::open(&dir.data_path(), &dir.state_path(), config.sync_on_flush)?;

        let mut engine = Self::with_persistence(config, Arc::new(files))?;
        engine.dir = Some(dir);
        Ok(engine)
    }

    /// Creates an engine that keeps nothing across restarts.
    #[must_use]
    pub fn open_in_memory() -> Self {
        let stats = Arc::new(EngineStats::new());
        let store = Arc::new(VersionStore::new(Arc::clone(&stats)));
        let persistence: Arc<dyn Persistence> = Arc::new(NoopPersistence);
        let manager = TransactionManager::new(
            Arc::clone(&store),
            persistence,
            Arc::clone(&stats),
            &Config::default(),
        );

        Self {
            #[cfg(feature = "std")]
            dir: None,
            store,
            manager,
            stats,
        }
    }

    /// Creates an engine over any persistence, loading its saved state.
    ///
    /// Useful for restart tests with in-memory snapshot storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence cannot be read.
    pub fn with_persistence(config: Config, persistence: Arc<dyn Persistence>) -> CoreResult<Self> {
        let stats = Arc::new(EngineStats::new());
        let store = Arc::new(VersionStore::new(Arc::clone(&stats)));

        let state = persistence.load()?;
        let next_tid = Self::recover(&store, state);

        let manager = TransactionManager::with_next_tid(
            Arc::clone(&store),
            persistence,
            Arc::clone(&stats),
            &config,
            next_tid,
        );

        Ok(Self {
            #[cfg(feature = "std")]
            dir: None,
            store,
            manager,
            stats,
        })
    }

    /// Restores saved chains and returns the first Tid to allocate.
    ///
    /// Transactions that were active at save time never terminated, and
    /// their undo entries were not saved; their versions are purged.
    fn recover(store: &VersionStore, state: PersistedState) -> TransactionId {
        let PersistedState { store: chains, manager } = state;
        let restored_keys = chains.len();
        store.restore(chains);

        for tid in &manager.active {
            let purged = store.purge_tid(*tid);
            if purged > 0 {
                warn!(tid = %tid, versions = purged, "purged versions of unfinished transaction");
            }
        }

        let from_chains = store
            .max_tid()
            .map_or(TransactionId::new(1), TransactionId::next);
        let next_tid = manager.next_tid.max(from_chains);

        if restored_keys > 0 || !manager.active.is_empty() {
            info!(
                keys = restored_keys,
                unfinished = manager.active.len(),
                next_tid = %next_tid,
                "recovered from snapshot"
            );
        }
        next_tid
    }

    /// Begins a transaction and returns its Tid.
    pub fn begin(&self) -> TransactionId {
        self.manager.begin()
    }

    /// Writes `value` for `key` in transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::put`].
    pub fn put(&self, key: impl Into<Key>, value: Value, tid: TransactionId) -> CoreResult<()> {
        self.manager.put(&key.into(), value, tid)
    }

    /// Reads `key` as seen by `tid`, waiting out uncommitted versions.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::get`].
    pub fn get(&self, key: impl Into<Key>, tid: TransactionId) -> CoreResult<ReadResult> {
        self.manager.get(&key.into(), tid)
    }

    /// Increments `key` in transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::inc`].
    pub fn inc(&self, key: impl Into<Key>, tid: TransactionId) -> CoreResult<Value> {
        self.manager.inc(&key.into(), tid)
    }

    /// Decrements `key` in transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::dec`].
    pub fn dec(&self, key: impl Into<Key>, tid: TransactionId) -> CoreResult<Value> {
        self.manager.dec(&key.into(), tid)
    }

    /// Deletes `key` in transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::del`].
    pub fn del(&self, key: impl Into<Key>, tid: TransactionId) -> CoreResult<()> {
        self.manager.del(&key.into(), tid)
    }

    /// Commits transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::commit`].
    pub fn commit(&self, tid: TransactionId) -> CoreResult<()> {
        self.manager.commit(tid)
    }

    /// Aborts transaction `tid`.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::abort`].
    pub fn abort(&self, tid: TransactionId) -> CoreResult<()> {
        self.manager.abort(tid)
    }

    /// Executes a function within a transaction.
    ///
    /// Commits if the closure returns `Ok`, aborts if it returns `Err`. A
    /// transaction that already aborted itself is not aborted twice.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let total = engine.transaction(|tx| {
    ///     tx.dec("from")?;
    ///     tx.inc("to")
    /// })?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or the commit error.
    pub fn transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CoreResult<T>,
    {
        let tid = self.manager.begin();
        let tx = Transaction::new(&self.manager, tid);

        match f(&tx) {
            Ok(value) => {
                self.manager.commit(tid)?;
                Ok(value)
            }
            Err(e) => {
                if self.manager.is_active(tid) {
                    self.manager.abort(tid)?;
                }
                Err(e)
            }
        }
    }

    /// Saves both snapshots now.
    ///
    /// # Errors
    ///
    /// Returns an error if either snapshot could not be written.
    pub fn flush(&self) -> CoreResult<()> {
        self.manager.flush()
    }

    /// Flushes and closes the engine, releasing the directory lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails.
    pub fn close(self) -> CoreResult<()> {
        self.flush()
    }

    /// Returns the version store.
    #[must_use]
    pub fn store(&self) -> &VersionStore {
        &self.store
    }

    /// Returns the transaction manager.
    #[must_use]
    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// Returns the engine statistics.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Returns the data directory path, if file-backed.
    #[cfg(feature = "std")]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(DatabaseDir::path)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("manager", &self.manager)
            .field("keys", &self.store.key_count())
            .finish_non_exhaustive()
    }
}
