//! Versions and version chains.

use crate::types::{ReadResult, TransactionId, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single immutable version of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Stored value; `None` marks a tombstone left by a delete.
    pub value: Option<Value>,
    /// Transaction that created this version.
    pub tid_begin: TransactionId,
    /// Transaction that superseded it, or `TransactionId::MAX`.
    pub tid_end: TransactionId,
}

impl Version {
    /// Creates a current (not yet superseded) version.
    #[must_use]
    pub const fn open(value: Option<Value>, tid: TransactionId) -> Self {
        Self {
            value,
            tid_begin: tid,
            tid_end: TransactionId::MAX,
        }
    }

    /// Returns true while nothing has superseded this version.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.tid_end == TransactionId::MAX
    }

    /// Returns true if this version is a delete marker.
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Returns true if `tid` falls in `[tid_begin, tid_end]`.
    #[must_use]
    pub fn covers(&self, tid: TransactionId) -> bool {
        self.tid_begin <= tid && tid <= self.tid_end
    }
}

/// The versions of one key, oldest first.
///
/// Between operations the last version is the only open one. Chains are
/// values: the store clones, edits, and republishes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionChain {
    versions: Vec<Version>,
}

impl VersionChain {
    /// Creates a chain holding one current version.
    #[must_use]
    pub fn single(value: Option<Value>, tid: TransactionId) -> Self {
        Self {
            versions: vec![Version::open(value, tid)],
        }
    }

    /// Builds a chain from raw versions, oldest first.
    #[must_use]
    pub fn from_versions(versions: Vec<Version>) -> Self {
        Self { versions }
    }

    /// Returns the versions, oldest first.
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Returns the number of versions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Returns true if every version was rolled back.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Returns the newest version.
    #[must_use]
    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Returns how many versions are open.
    ///
    /// Always 0 (empty chain) or 1 between operations.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.versions.iter().filter(|v| v.is_open()).count()
    }

    /// Returns true if any version was created by `tid`.
    #[must_use]
    pub fn contains_tid(&self, tid: TransactionId) -> bool {
        self.versions.iter().any(|v| v.tid_begin == tid)
    }

    /// Closes the current version at `tid` and appends a new current one.
    ///
    /// Returns the creator of the closed version when it is newer than
    /// `tid`. The write still goes through.
    pub fn append(&mut self, value: Option<Value>, tid: TransactionId) -> Option<TransactionId> {
        let mut newer = None;
        if let Some(current) = self.versions.last_mut() {
            current.tid_end = tid;
            if tid < current.tid_begin {
                newer = Some(current.tid_begin);
            }
        }
        self.versions.push(Version::open(value, tid));
        newer
    }

    /// Resolves a read at `tid`.
    ///
    /// Scans newest to oldest and answers from the first covering version.
    pub fn visible(&self, tid: TransactionId, active: &HashSet<TransactionId>) -> ReadResult {
        if self.versions.is_empty() {
            return ReadResult::NotFound;
        }

        match self.versions.iter().rev().find(|v| v.covers(tid)) {
            Some(v) if active.contains(&v.tid_begin) => ReadResult::NotCommitted,
            Some(v) => v.value.map_or(ReadResult::NotFound, ReadResult::Value),
            None => ReadResult::NotValid,
        }
    }

    /// Splices out the newest version created by `tid`.
    ///
    /// Neighbours are repaired so that ranges stay contiguous and the new
    /// last version is open. Returns false if `tid` has no version here.
    pub fn unroll(&mut self, tid: TransactionId) -> bool {
        let Some(i) = self.versions.iter().rposition(|v| v.tid_begin == tid) else {
            return false;
        };

        let last = self.versions.len() - 1;
        if i == last {
            self.versions.pop();
            if let Some(prev) = self.versions.last_mut() {
                prev.tid_end = TransactionId::MAX;
            }
        } else if i == 0 {
            self.versions.remove(0);
        } else {
            self.versions[i - 1].tid_end = self.versions[i + 1].tid_begin;
            self.versions.remove(i);
        }
        true
    }
}
