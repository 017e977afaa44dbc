//! Test fixtures and engine helpers.
//!
//! Provides convenience functions for setting up test engines
//! and common test scenarios.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use versakv_core::{Config, Engine, Persistence, SnapshotFiles, Value};
use versakv_storage::{StorageBackend, StorageError, StorageResult};

/// A test engine with automatic cleanup.
pub struct TestEngine {
    /// The engine instance.
    pub engine: Engine,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestEngine {
    /// Creates a new in-memory test engine.
    pub fn memory() -> Self {
        Self {
            engine: Engine::open_in_memory(),
            temp_dir: None,
        }
    }

    /// Creates a new file-backed test engine in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let engine = Engine::open_with_config(&data_dir(&temp_dir), file_config())
            .expect("Failed to open file engine");

        Self {
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// Closes the engine and opens a new one over the same directory.
    ///
    /// Panics for in-memory engines.
    pub fn reopen(self) -> Self {
        let Self { engine, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file-backed engines can be reopened");
        engine.close().expect("Failed to close engine");

        let engine = Engine::open_with_config(&data_dir(&temp_dir), file_config())
            .expect("Failed to reopen file engine");
        Self {
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// Drops the engine without a final flush and opens a new one.
    ///
    /// Simulates a process that died between operations: only what the
    /// engine saved on its own survives.
    pub fn crash_and_reopen(self) -> Self {
        let Self { engine, temp_dir } = self;
        let temp_dir = temp_dir.expect("Only file-backed engines can be reopened");
        drop(engine);

        let engine = Engine::open_with_config(&data_dir(&temp_dir), file_config())
            .expect("Failed to reopen file engine");
        Self {
            engine,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the data directory if file-backed, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(data_dir)
    }
}

impl std::ops::Deref for TestEngine {
    type Target = Engine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

fn data_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("versakv")
}

fn file_config() -> Config {
    // fsync adds nothing to tests that never cut power.
    Config::default().sync_on_flush(false)
}

/// Runs a test with a temporary in-memory engine.
///
/// # Example
///
/// ```rust,ignore
/// use versakv_testkit::with_temp_engine;
///
/// #[test]
/// fn my_test() {
///     with_temp_engine(|engine| {
///         engine.transaction(|tx| tx.put("k", 1)).unwrap();
///     });
/// }
/// ```
pub fn with_temp_engine<F, R>(f: F) -> R
where
    F: FnOnce(&Engine) -> R,
{
    let test_engine = TestEngine::memory();
    f(&test_engine.engine)
}

/// Runs a test with a temporary file-backed engine.
pub fn with_file_engine<F, R>(f: F) -> R
where
    F: FnOnce(&Engine, &Path) -> R,
{
    let test_engine = TestEngine::file();
    let path = test_engine
        .path()
        .expect("File engine should have a path");
    f(&test_engine.engine, &path)
}

/// A backend whose writes always fail.
///
/// Reads see an empty blob.
#[derive(Debug, Default)]
pub struct FailingBackend;

impl StorageBackend for FailingBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn replace(&mut self, _data: &[u8]) -> StorageResult<()> {
        Err(StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            "injected write failure",
        )))
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(0)
    }
}

/// Persistence whose saves always fail.
pub fn failing_persistence() -> Arc<dyn Persistence> {
    Arc::new(SnapshotFiles::new(
        Box::new(FailingBackend),
        Box::new(FailingBackend),
    ))
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates an in-memory engine with `keys` committed in one transaction.
    pub fn seeded_engine(keys: &[(&str, Value)]) -> TestEngine {
        let test_engine = TestEngine::memory();
        test_engine
            .engine
            .transaction(|tx| {
                for (key, value) in keys {
                    tx.put(*key, *value)?;
                }
                Ok(())
            })
            .expect("Failed to seed engine");
        test_engine
    }

    /// Creates `count` accounts named `acct0..` each holding `balance`.
    pub fn accounts(engine: &Engine, count: usize, balance: Value) -> Vec<String> {
        let names: Vec<String> = (0..count).map(|i| format!("acct{i}")).collect();
        engine
            .transaction(|tx| {
                for name in &names {
                    tx.put(name.as_str(), balance)?;
                }
                Ok(())
            })
            .expect("Failed to create accounts");
        names
    }
}
