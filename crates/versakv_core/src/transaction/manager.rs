//! Transaction manager.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::mvcc::{DeltaOutcome, VersionStore};
use crate::persist::{ManagerSnapshot, Persistence};
use crate::stats::EngineStats;
use crate::transaction::lock::LockTable;
use crate::transaction::undo::{OpKind, UndoLog};
use crate::types::{Key, ReadResult, TransactionId, Value};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Bookkeeping guarded by the manager's own mutex.
#[derive(Debug)]
struct ManagerState {
    next_tid: TransactionId,
    active: HashSet<TransactionId>,
    /// Keys each active transaction holds the write lock for.
    write_sets: HashMap<TransactionId, HashSet<Key>>,
    /// Bumped on every commit and abort; blocked readers wait for a change.
    terminations: u64,
}

impl ManagerState {
    fn snapshot(&self) -> ManagerSnapshot {
        let mut active: Vec<_> = self.active.iter().copied().collect();
        active.sort_unstable();
        ManagerSnapshot {
            next_tid: self.next_tid,
            active,
        }
    }
}

/// Runs transactions against a [`VersionStore`].
///
/// The transaction manager provides:
/// - Tid allocation and the active-transaction set
/// - Write-write exclusion through per-key locks held until commit or abort
/// - Blocking reads that wait for the author of an uncommitted version
/// - Rollback of aborted transactions from the undo log
///
/// ## Blocking Reads
///
/// A read that lands on a version whose author is still active suspends
/// until some transaction commits or aborts, then evaluates visibility
/// again. Wake-ups are broadcast; every waiter re-checks.
///
/// ## Locks
///
/// A transaction takes the write lock of a key on its first write to it and
/// keeps it until it terminates. Locks are taken in the order keys are
/// touched, so two transactions writing the same keys in opposite orders
/// can deadlock.
pub struct TransactionManager {
    store: Arc<VersionStore>,
    undo: UndoLog,
    locks: LockTable,
    persistence: Arc<dyn Persistence>,
    stats: Arc<EngineStats>,
    persist_on_begin: bool,
    state: Mutex<ManagerState>,
    /// Signalled on every commit and abort.
    terminated: Condvar,
    /// Serializes snapshot saves so a newer snapshot is never overwritten
    /// by an older one.
    flush_lock: Mutex<()>,
}

impl TransactionManager {
    /// Creates a transaction manager whose first Tid is 1.
    pub fn new(
        store: Arc<VersionStore>,
        persistence: Arc<dyn Persistence>,
        stats: Arc<EngineStats>,
        config: &Config,
    ) -> Self {
        Self::with_next_tid(store, persistence, stats, config, TransactionId::new(1))
    }

    /// Creates a transaction manager resuming Tid allocation at `next_tid`.
    pub fn with_next_tid(
        store: Arc<VersionStore>,
        persistence: Arc<dyn Persistence>,
        stats: Arc<EngineStats>,
        config: &Config,
        next_tid: TransactionId,
    ) -> Self {
        Self {
            store,
            undo: UndoLog::new(),
            locks: LockTable::new(),
            persistence,
            stats,
            persist_on_begin: config.persist_on_begin,
            state: Mutex::new(ManagerState {
                next_tid,
                active: HashSet::new(),
                write_sets: HashMap::new(),
                terminations: 0,
            }),
            terminated: Condvar::new(),
            flush_lock: Mutex::new(()),
        }
    }

    /// Begins a new transaction and returns its Tid.
    pub fn begin(&self) -> TransactionId {
        let tid = {
            let mut state = self.state.lock();
            let tid = state.next_tid;
            state.next_tid = tid.next();
            state.active.insert(tid);
            state.write_sets.insert(tid, HashSet::new());
            tid
        };

        if self.persist_on_begin {
            self.persist_manager();
        }

        self.stats.record_begin();
        debug!(tid = %tid, "transaction begun");
        tid
    }

    /// Writes `value` for `key`.
    ///
    /// Blocks while another transaction holds the key's write lock.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if `tid` is not active.
    pub fn put(&self, key: &Key, value: Value, tid: TransactionId) -> CoreResult<()> {
        self.ensure_lock(key, tid, OpKind::Put)?;
        self.store.put(key, value, tid);
        self.record_write(tid, OpKind::Put, key);
        Ok(())
    }

    /// Increments the value of `key` and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAborted` after aborting `tid` if the key has no
    /// value or the increment overflows, and `InvariantViolation` if `tid`
    /// is not active.
    pub fn inc(&self, key: &Key, tid: TransactionId) -> CoreResult<Value> {
        self.ensure_lock(key, tid, OpKind::Inc)?;
        let outcome = self.store.inc(key, tid);
        self.finish_delta(key, tid, OpKind::Inc, outcome)
    }

    /// Decrements the value of `key` and returns the new value.
    ///
    /// # Errors
    ///
    /// Same as [`inc`](Self::inc).
    pub fn dec(&self, key: &Key, tid: TransactionId) -> CoreResult<Value> {
        self.ensure_lock(key, tid, OpKind::Dec)?;
        let outcome = self.store.dec(key, tid);
        self.finish_delta(key, tid, OpKind::Dec, outcome)
    }

    /// Deletes `key` by writing a tombstone.
    ///
    /// # Errors
    ///
    /// Returns `TransactionAborted` after aborting `tid` if the key has no
    /// value to delete, and `InvariantViolation` if `tid` is not active.
    pub fn del(&self, key: &Key, tid: TransactionId) -> CoreResult<()> {
        self.ensure_lock(key, tid, OpKind::Del)?;
        if !self.store.current(key).is_value() {
            return Err(self.self_abort(tid, format!("del on missing key {key}")));
        }
        self.store.del(key, tid);
        self.record_write(tid, OpKind::Del, key);
        Ok(())
    }

    /// Reads `key` as seen by `tid`.
    ///
    /// Never returns [`ReadResult::NotCommitted`]: when the visible version
    /// belongs to an active transaction the call blocks until a transaction
    /// terminates and then reads again. A transaction reading a key it
    /// wrote itself therefore blocks until another transaction terminates.
    ///
    /// `tid` does not have to be active; any point in history can be read.
    ///
    /// # Errors
    ///
    /// None today. The `Result` matches the write operations so a
    /// transaction body can use `?` on every call.
    pub fn get(&self, key: &Key, tid: TransactionId) -> CoreResult<ReadResult> {
        self.stats.record_read();

        let mut state = self.state.lock();
        loop {
            let result = self.store.get(key, tid, &state.active);
            if result != ReadResult::NotCommitted {
                return Ok(result);
            }

            self.stats.record_read_wait();
            debug!(tid = %tid, key = %key, "read waiting for uncommitted version");
            let epoch = state.terminations;
            while state.terminations == epoch {
                self.terminated.wait(&mut state);
            }
        }
    }

    /// Commits `tid`.
    ///
    /// Saves the manager state and the store, wakes blocked readers, and
    /// releases the transaction's write locks.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if `tid` is not active. Persistence
    /// failures are logged and counted, never returned.
    pub fn commit(&self, tid: TransactionId) -> CoreResult<()> {
        let write_set = {
            let mut state = self.state.lock();
            let Some(write_set) = state.write_sets.remove(&tid) else {
                drop(state);
                return Err(self.inactive(tid, "commit"));
            };
            state.active.remove(&tid);
            state.terminations += 1;
            write_set
        };

        self.persist_all();
        self.terminated.notify_all();
        let released = self.release_locks(tid, &write_set);
        self.undo.discard(tid);

        self.stats.record_commit();
        info!(tid = %tid, keys = write_set.len(), "transaction committed");
        released
    }

    /// Aborts `tid`, removing every version it wrote.
    ///
    /// The versions are unrolled while `tid` is still active, so no reader
    /// ever takes them for committed data.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if `tid` is not active.
    pub fn abort(&self, tid: TransactionId) -> CoreResult<()> {
        let write_set = self.claim_for_abort(tid)?;

        let ops = self.undo.ops(tid);
        for entry in ops.iter().rev() {
            self.store.unroll_by_tid(&entry.key, tid);
        }

        self.finish_abort(tid, &write_set)?;
        info!(tid = %tid, undone = ops.len(), "transaction aborted");
        Ok(())
    }

    /// Saves both snapshots now, in line with concurrent commits and aborts.
    ///
    /// # Errors
    ///
    /// Returns the first save error.
    pub(crate) fn flush(&self) -> CoreResult<()> {
        let _flush = self.flush_lock.lock();
        let manager = self.state.lock().snapshot();
        self.persistence.save_manager(&manager)?;
        self.persistence.save_store(&self.store.snapshot())
    }

    /// Returns true if `tid` has begun and not yet terminated.
    #[must_use]
    pub fn is_active(&self, tid: TransactionId) -> bool {
        self.state.lock().active.contains(&tid)
    }

    /// Returns the number of active transactions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    /// Returns the active Tids in ascending order.
    #[must_use]
    pub fn active_tids(&self) -> Vec<TransactionId> {
        self.state.lock().snapshot().active
    }

    /// Returns the Tid the next `begin` will hand out.
    #[must_use]
    pub fn next_tid(&self) -> TransactionId {
        self.state.lock().next_tid
    }

    /// Returns the transaction holding the write lock for `key`, if any.
    #[must_use]
    pub fn lock_owner(&self, key: &Key) -> Option<TransactionId> {
        self.locks.owner(key)
    }

    /// Returns the version store.
    #[must_use]
    pub fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Takes the write lock for `key` unless `tid` already holds it.
    fn ensure_lock(&self, key: &Key, tid: TransactionId, op: OpKind) -> CoreResult<()> {
        {
            let state = self.state.lock();
            match state.write_sets.get(&tid) {
                Some(write_set) if write_set.contains(key) => return Ok(()),
                Some(_) => {}
                None => {
                    drop(state);
                    return Err(self.inactive(tid, &op.to_string()));
                }
            }
        }

        // Wait for the key outside the manager mutex.
        self.locks.acquire(key, tid);

        let mut state = self.state.lock();
        if let Some(write_set) = state.write_sets.get_mut(&tid) {
            write_set.insert(key.clone());
            return Ok(());
        }
        drop(state);

        // Terminated by another thread while waiting.
        self.locks.release(key, tid);
        Err(self.inactive(tid, &op.to_string()))
    }

    /// Takes `tid`'s write set so no commit or write can run for it.
    ///
    /// `tid` stays in the active set until [`finish_abort`](Self::finish_abort).
    fn claim_for_abort(&self, tid: TransactionId) -> CoreResult<HashSet<Key>> {
        let mut state = self.state.lock();
        match state.write_sets.remove(&tid) {
            Some(write_set) if state.active.contains(&tid) => Ok(write_set),
            _ => {
                drop(state);
                Err(self.inactive(tid, "abort"))
            }
        }
    }

    fn finish_abort(&self, tid: TransactionId, write_set: &HashSet<Key>) -> CoreResult<()> {
        {
            let mut state = self.state.lock();
            state.active.remove(&tid);
            state.terminations += 1;
        }

        self.persist_all();
        self.terminated.notify_all();
        let released = self.release_locks(tid, write_set);
        self.undo.discard(tid);

        self.stats.record_abort();
        released
    }

    fn finish_delta(
        &self,
        key: &Key,
        tid: TransactionId,
        op: OpKind,
        outcome: DeltaOutcome,
    ) -> CoreResult<Value> {
        match outcome {
            DeltaOutcome::Applied(value) => {
                self.record_write(tid, op, key);
                Ok(value)
            }
            DeltaOutcome::NotFound => Err(self.self_abort(tid, format!("{op} on missing key {key}"))),
            DeltaOutcome::Overflow => {
                Err(self.self_abort(tid, format!("{op} on key {key} overflows")))
            }
        }
    }

    fn record_write(&self, tid: TransactionId, op: OpKind, key: &Key) {
        self.undo.append(tid, op, key.clone());
        self.stats.record_write();
    }

    /// Aborts `tid` on the caller's behalf and builds the error to return.
    fn self_abort(&self, tid: TransactionId, reason: String) -> CoreError {
        self.stats.record_self_abort();
        match self.abort(tid) {
            Ok(()) => CoreError::transaction_aborted(tid, reason),
            Err(e) => e,
        }
    }

    fn release_locks(&self, tid: TransactionId, write_set: &HashSet<Key>) -> CoreResult<()> {
        let mut result = Ok(());
        for key in write_set {
            if !self.locks.release(key, tid) {
                error!(tid = %tid, key = %key, "write lock not held by its transaction");
                result = Err(CoreError::invariant_violation(format!(
                    "{tid} released lock on {key} it did not own"
                )));
            }
        }
        result
    }

    fn inactive(&self, tid: TransactionId, op: &str) -> CoreError {
        error!(tid = %tid, op, "operation on inactive transaction");
        CoreError::unknown_transaction(tid)
    }

    fn persist_manager(&self) {
        let _flush = self.flush_lock.lock();
        let snapshot = self.state.lock().snapshot();
        if let Err(e) = self.persistence.save_manager(&snapshot) {
            self.persistence_failed("state", &e);
        }
    }

    fn persist_all(&self) {
        let _flush = self.flush_lock.lock();
        let manager = self.state.lock().snapshot();
        if let Err(e) = self.persistence.save_manager(&manager) {
            self.persistence_failed("state", &e);
        }
        let store = self.store.snapshot();
        if let Err(e) = self.persistence.save_store(&store) {
            self.persistence_failed("data", &e);
        }
    }

    fn persistence_failed(&self, snapshot: &str, err: &CoreError) {
        self.stats.record_persistence_failure();
        warn!(snapshot, error = %err, "snapshot save failed");
    }
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionManager")
            .field("next_tid", &state.next_tid)
            .field("active_count", &state.active.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::{NoopPersistence, SnapshotFiles};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn create_manager() -> TransactionManager {
        TransactionManager::new(
            Arc::new(VersionStore::default()),
            Arc::new(NoopPersistence),
            Arc::new(EngineStats::new()),
            &Config::default(),
        )
    }

    fn key(s: &str) -> Key {
        Key::from(s)
    }

    #[test]
    fn begin_allocates_increasing_tids() {
        let tm = create_manager();
        let t1 = tm.begin();
        let t2 = tm.begin();
        assert_eq!(t1, TransactionId::new(1));
        assert_eq!(t2, TransactionId::new(2));
        assert_eq!(tm.active_count(), 2);
        assert_eq!(tm.next_tid(), TransactionId::new(3));
    }

    #[test]
    fn commit_empty_transaction() {
        let tm = create_manager();
        let tid = tm.begin();
        tm.commit(tid).unwrap();
        assert!(!tm.is_active(tid));
        assert_eq!(tm.active_count(), 0);
    }

    #[test]
    fn committed_put_is_visible_to_later_tid() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 3, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        assert_eq!(tm.get(&key("A"), t2).unwrap(), ReadResult::Value(3));
    }

    #[test]
    fn inc_after_commit() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 3, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        assert_eq!(tm.inc(&key("A"), t2).unwrap(), 4);
        tm.commit(t2).unwrap();

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("A"), t3).unwrap(), ReadResult::Value(4));
    }

    #[test]
    fn dec_returns_decremented_value() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 3, t1).unwrap();
        assert_eq!(tm.dec(&key("A"), t1).unwrap(), 2);
        assert_eq!(tm.dec(&key("A"), t1).unwrap(), 1);
        tm.commit(t1).unwrap();
    }

    #[test]
    fn abort_reverts_increment() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 3, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        tm.inc(&key("A"), t2).unwrap();
        tm.abort(t2).unwrap();

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("A"), t3).unwrap(), ReadResult::Value(3));
        let chain = tm.store().chain(&key("A")).unwrap();
        assert!(!chain.contains_tid(t2));
        assert_eq!(chain.open_count(), 1);
    }

    #[test]
    fn abort_of_first_writer_leaves_empty_chain() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("fresh"), 1, t1).unwrap();
        tm.put(&key("fresh"), 2, t1).unwrap();
        tm.abort(t1).unwrap();

        let t2 = tm.begin();
        assert_eq!(tm.get(&key("fresh"), t2).unwrap(), ReadResult::NotFound);
        assert!(tm.store().chain(&key("fresh")).unwrap().is_empty());
    }

    #[test]
    fn inc_on_missing_key_self_aborts() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("other"), 1, t1).unwrap();

        let err = tm.inc(&key("missing"), t1).unwrap_err();
        assert!(err.is_aborted());
        assert!(!tm.is_active(t1));
        // The earlier write was rolled back too.
        assert!(tm.store().chain(&key("other")).unwrap().is_empty());
        assert_eq!(tm.lock_owner(&key("other")), None);
        assert_eq!(tm.lock_owner(&key("missing")), None);
    }

    #[test]
    fn del_on_missing_key_self_aborts() {
        let tm = create_manager();
        let t1 = tm.begin();
        let err = tm.del(&key("missing"), t1).unwrap_err();
        assert!(err.is_aborted());
        assert!(!tm.is_active(t1));
    }

    #[test]
    fn dec_on_deleted_key_self_aborts() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 1, t1).unwrap();
        tm.del(&key("A"), t1).unwrap();
        let err = tm.dec(&key("A"), t1).unwrap_err();
        assert!(err.is_aborted());
    }

    #[test]
    fn overflow_self_aborts() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("max"), Value::MAX, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        let err = tm.inc(&key("max"), t2).unwrap_err();
        assert!(err.is_aborted());

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("max"), t3).unwrap(), ReadResult::Value(Value::MAX));
    }

    #[test]
    fn deleted_key_reads_not_found() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 1, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        tm.del(&key("A"), t2).unwrap();
        tm.commit(t2).unwrap();

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("A"), t3).unwrap(), ReadResult::NotFound);
        // Older readers still see the value.
        assert_eq!(tm.get(&key("A"), t1).unwrap(), ReadResult::Value(1));
    }

    #[test]
    fn read_before_first_version_is_not_valid() {
        let tm = create_manager();
        let t1 = tm.begin();
        let t2 = tm.begin();
        tm.put(&key("A"), 9, t2).unwrap();
        tm.commit(t2).unwrap();

        assert_eq!(tm.get(&key("A"), t1).unwrap(), ReadResult::NotValid);
    }

    #[test]
    fn operations_on_inactive_tid_are_fatal() {
        let tm = create_manager();
        let tid = tm.begin();
        tm.commit(tid).unwrap();

        assert!(tm.commit(tid).unwrap_err().is_fatal());
        assert!(tm.abort(tid).unwrap_err().is_fatal());
        assert!(tm.put(&key("A"), 1, tid).unwrap_err().is_fatal());
        assert!(tm.inc(&key("A"), tid).unwrap_err().is_fatal());

        let never = TransactionId::new(99);
        assert!(tm.commit(never).unwrap_err().is_fatal());
    }

    #[test]
    fn commit_releases_locks() {
        let tm = create_manager();
        let tid = tm.begin();
        tm.put(&key("A"), 1, tid).unwrap();
        tm.put(&key("B"), 2, tid).unwrap();
        assert_eq!(tm.lock_owner(&key("A")), Some(tid));

        tm.commit(tid).unwrap();
        assert_eq!(tm.lock_owner(&key("A")), None);
        assert_eq!(tm.lock_owner(&key("B")), None);
    }

    #[test]
    fn blocked_read_returns_after_commit() {
        let tm = Arc::new(create_manager());
        let t1 = tm.begin();
        tm.put(&key("A"), 5, t1).unwrap();
        let t2 = tm.begin();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let tm = Arc::clone(&tm);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let result = tm.get(&key("A"), t2).unwrap();
                done.store(true, Ordering::SeqCst);
                result
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));

        tm.commit(t1).unwrap();
        assert_eq!(reader.join().unwrap(), ReadResult::Value(5));
    }

    #[test]
    fn blocked_read_falls_back_after_abort() {
        let tm = Arc::new(create_manager());
        let t1 = tm.begin();
        tm.put(&key("A"), 3, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        tm.put(&key("A"), 100, t2).unwrap();
        let t3 = tm.begin();

        let reader = {
            let tm = Arc::clone(&tm);
            thread::spawn(move || tm.get(&key("A"), t3).unwrap())
        };

        thread::sleep(Duration::from_millis(50));
        tm.abort(t2).unwrap();
        assert_eq!(reader.join().unwrap(), ReadResult::Value(3));
    }

    #[test]
    fn claimed_abort_refuses_commit() {
        let tm = create_manager();
        let t1 = tm.begin();
        tm.put(&key("A"), 1, t1).unwrap();
        tm.commit(t1).unwrap();

        let t2 = tm.begin();
        tm.put(&key("A"), 2, t2).unwrap();

        let write_set = tm.claim_for_abort(t2).unwrap();
        assert!(tm.is_active(t2));
        assert!(tm.commit(t2).unwrap_err().is_fatal());
        assert!(tm.put(&key("B"), 7, t2).is_err());
        assert!(tm.store().chain(&key("A")).unwrap().contains_tid(t2));

        for entry in tm.undo.ops(t2).iter().rev() {
            tm.store.unroll_by_tid(&entry.key, t2);
        }
        tm.finish_abort(t2, &write_set).unwrap();

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("A"), t3).unwrap(), ReadResult::Value(1));
        assert_eq!(tm.lock_owner(&key("A")), None);
    }

    #[test]
    fn racing_commit_and_abort_keep_one_outcome() {
        let tm = create_manager();
        let seed = tm.begin();
        tm.put(&key("A"), 0, seed).unwrap();
        tm.commit(seed).unwrap();

        for round in 1..=100 {
            let tid = tm.begin();
            let before = tm.store().current(&key("A"));
            tm.put(&key("A"), round, tid).unwrap();

            let (committed, aborted) = thread::scope(|scope| {
                let commit = scope.spawn(|| tm.commit(tid));
                let abort = scope.spawn(|| tm.abort(tid));
                (commit.join().unwrap(), abort.join().unwrap())
            });
            assert!(committed.is_ok() != aborted.is_ok(), "round {round}");

            let chain = tm.store().chain(&key("A")).unwrap();
            assert_eq!(chain.open_count(), 1);
            if committed.is_ok() {
                assert_eq!(tm.store().current(&key("A")), ReadResult::Value(round));
            } else {
                assert_eq!(tm.store().current(&key("A")), before);
            }
            assert!(!tm.is_active(tid));
            assert_eq!(tm.lock_owner(&key("A")), None);
        }
    }

    #[test]
    fn second_writer_waits_for_first() {
        let tm = Arc::new(create_manager());
        let t1 = tm.begin();
        tm.put(&key("A"), 1, t1).unwrap();
        let t2 = tm.begin();

        let wrote = Arc::new(AtomicBool::new(false));
        let writer = {
            let tm = Arc::clone(&tm);
            let wrote = Arc::clone(&wrote);
            thread::spawn(move || {
                tm.put(&key("A"), 2, t2).unwrap();
                wrote.store(true, Ordering::SeqCst);
                tm.commit(t2).unwrap();
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!wrote.load(Ordering::SeqCst));
        assert_eq!(tm.store().chain(&key("A")).unwrap().len(), 1);

        tm.commit(t1).unwrap();
        writer.join().unwrap();

        let t3 = tm.begin();
        assert_eq!(tm.get(&key("A"), t3).unwrap(), ReadResult::Value(2));
    }

    #[test]
    fn commit_saves_snapshots() {
        let files = Arc::new(SnapshotFiles::in_memory());
        let tm = TransactionManager::new(
            Arc::new(VersionStore::default()),
            Arc::clone(&files) as Arc<dyn Persistence>,
            Arc::new(EngineStats::new()),
            &Config::default(),
        );

        let t1 = tm.begin();
        let persisted = files.load().unwrap();
        assert_eq!(persisted.manager.active, vec![t1]);

        tm.put(&key("A"), 7, t1).unwrap();
        tm.commit(t1).unwrap();

        let persisted = files.load().unwrap();
        assert!(persisted.manager.active.is_empty());
        assert_eq!(persisted.manager.next_tid, TransactionId::new(2));
        assert_eq!(persisted.store.len(), 1);
    }

    #[test]
    fn begin_skips_save_when_disabled() {
        let files = Arc::new(SnapshotFiles::in_memory());
        let tm = TransactionManager::new(
            Arc::new(VersionStore::default()),
            Arc::clone(&files) as Arc<dyn Persistence>,
            Arc::new(EngineStats::new()),
            &Config::default().persist_on_begin(false),
        );

        tm.begin();
        assert!(files.load().unwrap().manager.active.is_empty());
    }

    #[test]
    fn resumes_at_given_tid() {
        let tm = TransactionManager::with_next_tid(
            Arc::new(VersionStore::default()),
            Arc::new(NoopPersistence),
            Arc::new(EngineStats::new()),
            &Config::default(),
            TransactionId::new(40),
        );
        assert_eq!(tm.begin(), TransactionId::new(40));
    }
}
