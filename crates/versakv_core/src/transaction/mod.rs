//! Transactions over the version store.
//!
//! - **Isolation**: a reader sees the newest version whose Tid range covers
//!   its own Tid, and waits for versions whose author is still active
//! - **Write exclusion**: one writer per key until it commits or aborts
//! - **Rollback**: aborts splice the transaction's versions out of their
//!   chains, driven by the undo log

mod handle;
mod lock;
mod manager;
mod undo;

pub use handle::Transaction;
pub use lock::LockTable;
pub use manager::TransactionManager;
pub use undo::{OpKind, UndoEntry, UndoLog};
