//! Multi-version storage.
//!
//! Every key owns an append-only chain of versions. Each version records
//! the transaction that created it (`tid_begin`) and the transaction that
//! superseded it (`tid_end`, or [`TransactionId::MAX`] while it is current):
//!
//! ```text
//! key "A"
//!   (3, txn:1, txn:4)      <- superseded by txn:4
//!   (4, txn:4, txn:9)      <- superseded by txn:9
//!   (tombstone, txn:9, max) <- current
//! ```
//!
//! A reader at transaction `t` sees the newest version whose
//! `[tid_begin, tid_end]` range contains `t`, unless its author is still
//! active. Chains are replaced wholesale on every write, so readers never
//! take a lock and never see a half-built chain.
//!
//! [`TransactionId::MAX`]: crate::TransactionId::MAX

mod store;
mod version;

pub use store::{DeltaOutcome, VersionStore};
pub use version::{Version, VersionChain};
