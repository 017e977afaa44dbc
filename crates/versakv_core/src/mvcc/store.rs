//! Version store: one chain per key, lock-free reads.

use crate::mvcc::version::VersionChain;
use crate::stats::EngineStats;
use crate::types::{Key, ReadResult, TransactionId, Value};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Outcome of an increment or decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// The new version was appended with this value.
    Applied(Value),
    /// The key has no chain or its current version is a tombstone.
    NotFound,
    /// The new value would not fit in a [`Value`].
    Overflow,
}

/// Stores a version chain per key.
///
/// The store knows nothing about transaction state beyond the ids it is
/// handed. Callers serialize writers per key (the transaction manager's
/// key locks do); each write still publishes a complete new chain under
/// the map's entry guard, so a concurrent reader observes the chain either
/// before or after the write.
#[derive(Debug)]
pub struct VersionStore {
    chains: DashMap<Key, Arc<VersionChain>>,
    stats: Arc<EngineStats>,
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::new(Arc::new(EngineStats::new()))
    }
}

impl VersionStore {
    /// Creates an empty store reporting into `stats`.
    pub fn new(stats: Arc<EngineStats>) -> Self {
        Self {
            chains: DashMap::new(),
            stats,
        }
    }

    /// Writes `value` for `key` as transaction `tid`.
    pub fn put(&self, key: &Key, value: Value, tid: TransactionId) {
        self.append(key, Some(value), tid);
    }

    /// Writes a tombstone for `key` as transaction `tid`.
    pub fn del(&self, key: &Key, tid: TransactionId) {
        self.append(key, None, tid);
    }

    /// Appends `current + 1` for `key`.
    pub fn inc(&self, key: &Key, tid: TransactionId) -> DeltaOutcome {
        self.apply_delta(key, 1, tid)
    }

    /// Appends `current - 1` for `key`.
    pub fn dec(&self, key: &Key, tid: TransactionId) -> DeltaOutcome {
        self.apply_delta(key, -1, tid)
    }

    /// Reads `key` as seen by transaction `tid`.
    ///
    /// `active` is the set of transactions that have not terminated; a
    /// covering version created by one of them yields
    /// [`ReadResult::NotCommitted`], even when `tid` is its author.
    pub fn get(&self, key: &Key, tid: TransactionId, active: &HashSet<TransactionId>) -> ReadResult {
        // Clone the Arc so the scan runs without holding the shard guard.
        let Some(chain) = self.chains.get(key).map(|c| Arc::clone(c.value())) else {
            return ReadResult::NotFound;
        };
        chain.visible(tid, active)
    }

    /// Returns the value of the current version, ignoring visibility.
    ///
    /// Only meaningful to a caller holding the key's write lock.
    pub fn current(&self, key: &Key) -> ReadResult {
        self.chains
            .get(key)
            .and_then(|c| c.latest().copied())
            .and_then(|v| v.value)
            .map_or(ReadResult::NotFound, ReadResult::Value)
    }

    /// Removes the newest version of `key` created by `tid`.
    ///
    /// Returns false (and logs) if there was nothing to remove.
    pub fn unroll_by_tid(&self, key: &Key, tid: TransactionId) -> bool {
        let removed = match self.chains.get_mut(key) {
            Some(mut slot) => {
                let mut chain = VersionChain::clone(&slot);
                let removed = chain.unroll(tid);
                if removed {
                    *slot = Arc::new(chain);
                }
                removed
            }
            None => false,
        };

        if !removed {
            warn!(key = %key, tid = %tid, "unroll found no version for transaction");
        }
        removed
    }

    /// Removes every version created by `tid` from every chain.
    ///
    /// Used on startup for transactions that never terminated. Returns the
    /// number of versions removed.
    pub fn purge_tid(&self, tid: TransactionId) -> usize {
        let mut removed = 0;
        for mut slot in self.chains.iter_mut() {
            if !slot.contains_tid(tid) {
                continue;
            }
            let mut chain = VersionChain::clone(&slot);
            while chain.unroll(tid) {
                removed += 1;
            }
            *slot = Arc::new(chain);
        }
        removed
    }

    /// Returns a copy of the chain for `key`.
    pub fn chain(&self, key: &Key) -> Option<VersionChain> {
        self.chains.get(key).map(|c| VersionChain::clone(c.value()))
    }

    /// Returns the number of keys with a chain.
    pub fn key_count(&self) -> usize {
        self.chains.len()
    }

    /// Returns the total number of versions across all chains.
    pub fn version_count(&self) -> usize {
        self.chains.iter().map(|c| c.len()).sum()
    }

    /// Returns the largest `tid_begin` stored, if any.
    pub fn max_tid(&self) -> Option<TransactionId> {
        self.chains
            .iter()
            .filter_map(|c| c.versions().iter().map(|v| v.tid_begin).max())
            .max()
    }

    /// Copies every chain, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<Key, VersionChain> {
        self.chains
            .iter()
            .map(|entry| (entry.key().clone(), VersionChain::clone(entry.value())))
            .collect()
    }

    /// Replaces the store contents with `chains`.
    pub fn restore(&self, chains: BTreeMap<Key, VersionChain>) {
        self.chains.clear();
        for (key, chain) in chains {
            self.chains.insert(key, Arc::new(chain));
        }
    }

    fn append(&self, key: &Key, value: Option<Value>, tid: TransactionId) {
        let newer = match self.chains.entry(key.clone()) {
            Entry::Occupied(mut slot) => {
                let mut chain = VersionChain::clone(slot.get());
                let newer = chain.append(value, tid);
                slot.insert(Arc::new(chain));
                newer
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(VersionChain::single(value, tid)));
                None
            }
        };
        self.note_ordering(key, tid, newer);
    }

    fn apply_delta(&self, key: &Key, delta: Value, tid: TransactionId) -> DeltaOutcome {
        let Some(mut slot) = self.chains.get_mut(key) else {
            return DeltaOutcome::NotFound;
        };
        let Some(current) = slot.latest().and_then(|v| v.value) else {
            return DeltaOutcome::NotFound;
        };
        let Some(next) = current.checked_add(delta) else {
            return DeltaOutcome::Overflow;
        };

        let mut chain = VersionChain::clone(&slot);
        let newer = chain.append(Some(next), tid);
        *slot = Arc::new(chain);
        drop(slot);

        self.note_ordering(key, tid, newer);
        DeltaOutcome::Applied(next)
    }

    fn note_ordering(&self, key: &Key, tid: TransactionId, newer: Option<TransactionId>) {
        if let Some(newer) = newer {
            self.stats.record_ordering_anomaly();
            warn!(key = %key, tid = %tid, newer = %newer, "write closed a version created by a newer transaction");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::Version;
    use std::thread;

    fn tid(n: i64) -> TransactionId {
        TransactionId::new(n)
    }

    fn key(s: &str) -> Key {
        Key::from(s)
    }

    fn none_active() -> HashSet<TransactionId> {
        HashSet::new()
    }

    #[test]
    fn get_missing_key_is_not_found() {
        let store = VersionStore::default();
        assert_eq!(store.get(&key("A"), tid(1), &none_active()), ReadResult::NotFound);
    }

    #[test]
    fn put_then_get() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        assert_eq!(store.get(&key("A"), tid(2), &none_active()), ReadResult::Value(3));
        assert_eq!(store.get(&key("A"), tid(0), &none_active()), ReadResult::NotValid);
    }

    #[test]
    fn put_appends_and_closes() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        store.put(&key("A"), 5, tid(2));

        let chain = store.chain(&key("A")).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.versions()[0].tid_end, tid(2));
        assert_eq!(chain.open_count(), 1);
        assert_eq!(store.version_count(), 2);
    }

    #[test]
    fn inc_and_dec_return_new_value() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));

        assert_eq!(store.inc(&key("A"), tid(2)), DeltaOutcome::Applied(4));
        assert_eq!(store.dec(&key("A"), tid(3)), DeltaOutcome::Applied(3));
        assert_eq!(store.dec(&key("A"), tid(4)), DeltaOutcome::Applied(2));
        assert_eq!(store.get(&key("A"), tid(5), &none_active()), ReadResult::Value(2));
    }

    #[test]
    fn inc_missing_or_deleted_key_is_not_found() {
        let store = VersionStore::default();
        assert_eq!(store.inc(&key("A"), tid(1)), DeltaOutcome::NotFound);
        assert_eq!(store.key_count(), 0);

        store.put(&key("A"), 1, tid(1));
        store.del(&key("A"), tid(2));
        assert_eq!(store.dec(&key("A"), tid(3)), DeltaOutcome::NotFound);
        assert_eq!(store.chain(&key("A")).unwrap().len(), 2);
    }

    #[test]
    fn inc_overflow_leaves_chain_untouched() {
        let store = VersionStore::default();
        store.put(&key("A"), Value::MAX, tid(1));
        assert_eq!(store.inc(&key("A"), tid(2)), DeltaOutcome::Overflow);
        assert_eq!(store.chain(&key("A")).unwrap().len(), 1);
    }

    #[test]
    fn del_is_a_tombstone() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        store.del(&key("A"), tid(2));

        assert_eq!(store.get(&key("A"), tid(3), &none_active()), ReadResult::NotFound);
        assert_eq!(store.get(&key("A"), tid(1), &none_active()), ReadResult::Value(3));
        assert_eq!(store.current(&key("A")), ReadResult::NotFound);
    }

    #[test]
    fn active_author_reads_not_committed() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        let active: HashSet<_> = [tid(1)].into_iter().collect();

        assert_eq!(store.get(&key("A"), tid(2), &active), ReadResult::NotCommitted);
        assert_eq!(store.get(&key("A"), tid(1), &active), ReadResult::NotCommitted);
        assert_eq!(store.current(&key("A")), ReadResult::Value(3));
    }

    #[test]
    fn older_tid_write_is_counted_not_rejected() {
        let stats = Arc::new(EngineStats::new());
        let store = VersionStore::new(Arc::clone(&stats));
        store.put(&key("A"), 1, tid(5));
        store.put(&key("A"), 2, tid(3));

        assert_eq!(stats.ordering_anomalies(), 1);
        assert_eq!(store.chain(&key("A")).unwrap().len(), 2);
    }

    #[test]
    fn unroll_restores_previous_value() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        store.inc(&key("A"), tid(2));

        assert!(store.unroll_by_tid(&key("A"), tid(2)));
        assert_eq!(
            store.chain(&key("A")).unwrap().versions(),
            &[Version::open(Some(3), tid(1))]
        );
        assert_eq!(store.get(&key("A"), tid(3), &none_active()), ReadResult::Value(3));
    }

    #[test]
    fn unroll_missing_key_returns_false() {
        let store = VersionStore::default();
        assert!(!store.unroll_by_tid(&key("nope"), tid(1)));
    }

    #[test]
    fn unroll_first_write_makes_key_absent() {
        let store = VersionStore::default();
        store.put(&key("A"), 3, tid(1));
        assert!(store.unroll_by_tid(&key("A"), tid(1)));

        assert_eq!(store.get(&key("A"), tid(2), &none_active()), ReadResult::NotFound);
        assert_eq!(store.inc(&key("A"), tid(2)), DeltaOutcome::NotFound);

        store.put(&key("A"), 7, tid(3));
        assert_eq!(store.get(&key("A"), tid(4), &none_active()), ReadResult::Value(7));
    }

    #[test]
    fn purge_tid_removes_from_all_chains() {
        let store = VersionStore::default();
        store.put(&key("A"), 1, tid(1));
        store.put(&key("B"), 1, tid(1));
        store.put(&key("A"), 2, tid(2));
        store.inc(&key("A"), tid(2));
        store.put(&key("B"), 5, tid(2));

        assert_eq!(store.purge_tid(tid(2)), 3);
        assert_eq!(store.get(&key("A"), tid(9), &none_active()), ReadResult::Value(1));
        assert_eq!(store.get(&key("B"), tid(9), &none_active()), ReadResult::Value(1));
    }

    #[test]
    fn snapshot_and_restore() {
        let store = VersionStore::default();
        store.put(&key("A"), 1, tid(1));
        store.put(&key("B"), 2, tid(4));
        assert_eq!(store.max_tid(), Some(tid(4)));

        let snapshot = store.snapshot();
        let other = VersionStore::default();
        other.put(&key("stale"), 9, tid(1));
        other.restore(snapshot.clone());

        assert_eq!(other.snapshot(), snapshot);
        assert_eq!(other.chain(&key("stale")), None);
    }

    #[test]
    fn concurrent_writers_on_distinct_keys() {
        let store = Arc::new(VersionStore::default());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let k = Key::from(format!("k{t}"));
                    store.put(&k, 0, tid(1));
                    for n in 2..=51 {
                        store.inc(&k, tid(n));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for t in 0..4 {
            let k = Key::from(format!("k{t}"));
            assert_eq!(store.get(&k, tid(100), &none_active()), ReadResult::Value(50));
            assert_eq!(store.chain(&k).unwrap().open_count(), 1);
        }
    }

    #[test]
    fn readers_never_see_partial_chains() {
        let store = Arc::new(VersionStore::default());
        store.put(&key("A"), 0, tid(1));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 2..500 {
                    store.inc(&key("A"), tid(n));
                }
            })
        };

        for _ in 0..500 {
            let chain = store.chain(&key("A")).unwrap();
            assert_eq!(chain.open_count(), 1);
            assert!(store.get(&key("A"), TransactionId::MAX, &none_active()).is_value());
        }
        writer.join().unwrap();
    }
}
