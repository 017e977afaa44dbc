//! # versakv storage
//!
//! Snapshot storage backends for versakv.
//!
//! Backends are **opaque byte stores** holding exactly one blob each: the
//! latest snapshot written to them. They never interpret the bytes; the
//! engine's persistence layer owns the snapshot format.
//!
//! ## Design Principles
//!
//! - A write replaces the whole blob; readers never see a half-written one
//! - No knowledge of version chains, transactions, or encodings
//! - Must be `Send + Sync` so the engine can share them across threads
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and ephemeral engines
//! - [`FileBackend`] - Persistent storage using write-then-rename
//!
//! ## Example
//!
//! ```rust
//! use versakv_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.replace(b"snapshot v1").unwrap();
//! backend.replace(b"v2").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"v2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
