//! Per-transaction undo log.

use crate::types::{Key, TransactionId};
use dashmap::DashMap;
use std::fmt;

/// Kind of write recorded in the undo log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// A value was stored.
    Put,
    /// The value was incremented.
    Inc,
    /// The value was decremented.
    Dec,
    /// A tombstone was stored.
    Del,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Put => "put",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Del => "del",
        };
        f.write_str(name)
    }
}

/// One recorded write.
///
/// Only the key is needed for rollback: the store removes the version the
/// transaction created, so no prior value is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// What the transaction did.
    pub op: OpKind,
    /// The key it did it to.
    pub key: Key,
}

/// Ordered write intents of every live transaction.
#[derive(Debug, Default)]
pub struct UndoLog {
    entries: DashMap<TransactionId, Vec<UndoEntry>>,
}

impl UndoLog {
    /// Creates an empty undo log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry to the transaction's list.
    pub fn append(&self, tid: TransactionId, op: OpKind, key: Key) {
        self.entries
            .entry(tid)
            .or_default()
            .push(UndoEntry { op, key });
    }

    /// Returns the transaction's entries in insertion order.
    #[must_use]
    pub fn ops(&self, tid: TransactionId) -> Vec<UndoEntry> {
        self.entries
            .get(&tid)
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Drops everything recorded for the transaction.
    pub fn discard(&self, tid: TransactionId) {
        self.entries.remove(&tid);
    }

    /// Returns the number of transactions with recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
