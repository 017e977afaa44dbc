//! Core type definitions for versakv.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored domain value.
pub type Value = i64;

/// Unique identifier for a transaction.
///
/// Transaction IDs are allocated once per `begin`, increase monotonically,
/// and are never reused for the lifetime of an engine (including restarts
/// from a snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub i64);

impl TransactionId {
    /// Placeholder for "no transaction".
    pub const NIL: Self = Self(-1);

    /// Open-ended upper bound; the `tid_end` of a version nobody superseded.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns the ID allocated after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NIL => f.write_str("txn:nil"),
            Self::MAX => f.write_str("txn:max"),
            Self(id) => write!(f, "txn:{id}"),
        }
    }
}

/// An opaque key.
///
/// Keys are immutable byte strings; cloning one only bumps a reference count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key(Bytes);

impl Key {
    /// Creates a key from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&[u8]> for Key {
    fn from(b: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(b))
    }
}

impl From<Vec<u8>> for Key {
    fn from(b: Vec<u8>) -> Self {
        Self(Bytes::from(b))
    }
}

impl From<&Key> for Key {
    fn from(k: &Key) -> Self {
        k.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Outcome of a point read.
///
/// The three non-value variants are distinct signals, not errors:
/// `NotValid` means the key has history but nothing covers the reader's
/// transaction, `NotFound` means the key has no history or was deleted,
/// and `NotCommitted` means the covering version belongs to a transaction
/// that is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    /// A committed value visible to the reader.
    Value(Value),
    /// No version covers the reader's transaction.
    NotValid,
    /// The covering version was written by a still-active transaction.
    NotCommitted,
    /// The key was never written, or its visible version is a tombstone.
    NotFound,
}

impl ReadResult {
    /// Returns the value, if any.
    #[must_use]
    pub const fn value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns true if the read produced a value.
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl fmt::Display for ReadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::NotValid => f.write_str("<not valid>"),
            Self::NotCommitted => f.write_str("<not committed>"),
            Self::NotFound => f.write_str("<not found>"),
        }
    }
}
