//! # versakv Core
//!
//! Multi-version key-value engine with transactional isolation.
//!
//! This crate provides:
//! - Version chains with Tid-range visibility
//! - Transaction management with per-key write locks and blocking reads
//! - Undo-log driven rollback that splices aborted versions out of chains
//! - Best-effort snapshot persistence
//!
//! ## Example
//!
//! ```rust
//! use versakv_core::{Engine, ReadResult};
//!
//! let engine = Engine::open_in_memory();
//!
//! let t1 = engine.begin();
//! engine.put("A", 3, t1).unwrap();
//! engine.commit(t1).unwrap();
//!
//! let t2 = engine.begin();
//! assert_eq!(engine.inc("A", t2).unwrap(), 4);
//! engine.abort(t2).unwrap();
//!
//! let t3 = engine.begin();
//! assert_eq!(engine.get("A", t3).unwrap(), ReadResult::Value(3));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "std")]
mod dir;
mod engine;
mod error;
pub mod mvcc;
pub mod persist;
mod stats;
pub mod transaction;
mod types;

pub use config::Config;
#[cfg(feature = "std")]
pub use dir::DatabaseDir;
pub use engine::Engine;
pub use error::{CoreError, CoreResult};
pub use mvcc::{DeltaOutcome, Version, VersionChain, VersionStore};
pub use persist::{ManagerSnapshot, NoopPersistence, PersistedState, Persistence, SnapshotFiles};
pub use stats::{EngineStats, StatsSnapshot};
pub use transaction::{OpKind, Transaction, TransactionManager};
pub use types::{Key, ReadResult, TransactionId, Value};
