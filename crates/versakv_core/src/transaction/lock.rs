//! Per-key write locks.

use crate::types::{Key, TransactionId};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Exclusive write lock for one key.
///
/// Unlike a mutex guard the lock outlives any single call: it stays owned
/// by a transaction until that transaction commits or aborts.
#[derive(Debug, Default)]
struct KeyLock {
    owner: Mutex<Option<TransactionId>>,
    released: Condvar,
}

/// Table of per-key write locks, created on first use.
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<Key, Arc<KeyLock>>,
}

impl LockTable {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `tid` owns the lock for `key`.
    ///
    /// Re-acquiring a lock the transaction already owns returns at once.
    pub fn acquire(&self, key: &Key, tid: TransactionId) {
        let lock = self.lock_for(key);
        let mut owner = lock.owner.lock();
        while let Some(current) = *owner {
            if current == tid {
                return;
            }
            lock.released.wait(&mut owner);
        }
        *owner = Some(tid);
    }

    /// Releases the lock for `key` if `tid` owns it.
    ///
    /// Returns false when `tid` is not the owner; the lock is left as is.
    pub fn release(&self, key: &Key, tid: TransactionId) -> bool {
        let Some(lock) = self.locks.get(key).map(|l| Arc::clone(&l)) else {
            return false;
        };
        let mut owner = lock.owner.lock();
        if *owner != Some(tid) {
            return false;
        }
        *owner = None;
        lock.released.notify_one();
        true
    }

    /// Returns the transaction currently holding `key`, if any.
    #[must_use]
    pub fn owner(&self, key: &Key) -> Option<TransactionId> {
        let lock = self.locks.get(key)?;
        let owner = lock.owner.lock();
        *owner
    }

    /// Returns the number of keys that have ever been locked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no key has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn lock_for(&self, key: &Key) -> Arc<KeyLock> {
        if let Some(lock) = self.locks.get(key) {
            return Arc::clone(&lock);
        }
        Arc::clone(&self.locks.entry(key.clone()).or_default())
    }
}
