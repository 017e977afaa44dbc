//! # versakv Testkit
//!
//! Test utilities for versakv.
//!
//! This crate provides:
//! - Test fixtures and engine helpers
//! - Property-based workload generators using proptest
//! - A model-checking harness comparing the engine to a plain map
//! - Concurrency stress helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use versakv_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_engine() {
//!     with_temp_engine(|engine| {
//!         engine.transaction(|tx| tx.put("k", 1)).unwrap();
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
