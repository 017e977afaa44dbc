//! Borrowed transaction handle.

use crate::error::CoreResult;
use crate::transaction::TransactionManager;
use crate::types::{Key, ReadResult, TransactionId, Value};

/// An active transaction bound to its manager.
///
/// Handed to the closure of [`Engine::transaction`](crate::Engine::transaction);
/// every call forwards to the manager with this handle's Tid.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'a> {
    manager: &'a TransactionManager,
    tid: TransactionId,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(manager: &'a TransactionManager, tid: TransactionId) -> Self {
        Self { manager, tid }
    }

    /// Returns the transaction's Tid.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.tid
    }

    /// Returns true until the transaction commits or aborts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.manager.is_active(self.tid)
    }

    /// Writes `value` for `key`.
    pub fn put(&self, key: impl Into<Key>, value: Value) -> CoreResult<()> {
        self.manager.put(&key.into(), value, self.tid)
    }

    /// Reads `key`, waiting out uncommitted versions.
    pub fn get(&self, key: impl Into<Key>) -> CoreResult<ReadResult> {
        self.manager.get(&key.into(), self.tid)
    }

    /// Increments `key` and returns the new value.
    pub fn inc(&self, key: impl Into<Key>) -> CoreResult<Value> {
        self.manager.inc(&key.into(), self.tid)
    }

    /// Decrements `key` and returns the new value.
    pub fn dec(&self, key: impl Into<Key>) -> CoreResult<Value> {
        self.manager.dec(&key.into(), self.tid)
    }

    /// Deletes `key`.
    pub fn del(&self, key: impl Into<Key>) -> CoreResult<()> {
        self.manager.del(&key.into(), self.tid)
    }
}
