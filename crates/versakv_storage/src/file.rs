//! File-based storage backend for persistent snapshots.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Suffix of the staging file written before a blob is published.
const STAGING_SUFFIX: &str = "tmp";

/// A file-based storage backend.
///
/// Each `replace` writes the blob to `<path>.tmp`, syncs it when requested,
/// and renames it over `<path>`. A crash mid-write leaves either the old or
/// the new blob in place, never a mix of both.
///
/// # Example
///
/// ```no_run
/// use versakv_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("data.snapshot")).unwrap();
/// backend.replace(b"persistent data").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    staging: PathBuf,
    sync_on_replace: bool,
    size: RwLock<u64>,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The file itself is created lazily by the first `replace`. A stale
    /// staging file from an interrupted write is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if existing metadata cannot be read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let staging = staging_path(path);
        match fs::remove_file(&staging) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            staging,
            sync_on_replace: false,
            size: RwLock::new(size),
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Sets whether every `replace` fsyncs the staged file before publishing.
    #[must_use]
    pub fn sync_on_replace(mut self, value: bool) -> Self {
        self.sync_on_replace = value;
        self
    }

    /// Returns the path to the live file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let mut size = self.size.write();

        {
            let mut staged = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.staging)?;
            staged.write_all(data)?;
            staged.flush()?;
            if self.sync_on_replace {
                staged.sync_all()?;
            }
        }

        fs::rename(&self.staging, &self.path).map_err(|source| StorageError::Publish {
            staged: self.staging.clone(),
            target: self.path.clone(),
            source,
        })?;

        *size = data.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        // Every replace already closes its file
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        match File::open(&self.path) {
            Ok(file) => {
                file.sync_all()?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_open_missing_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.snapshot");

        let backend = FileBackend::open(&path).unwrap();
        assert!(backend.is_empty().unwrap());
        assert!(backend.read_all().unwrap().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn file_replace_and_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.snapshot");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.replace(b"hello world").unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_all().unwrap(), b"hello world");

        backend.replace(b"bye").unwrap();
        assert_eq!(backend.read_all().unwrap(), b"bye");
        assert!(!staging_path(&path).exists());
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.snapshot");

        {
            let mut backend = FileBackend::open(&path).unwrap().sync_on_replace(true);
            backend.replace(b"persistent data").unwrap();
            backend.sync().unwrap();
        }

        {
            let backend = FileBackend::open(&path).unwrap();
            assert_eq!(backend.size().unwrap(), 15);
            assert_eq!(backend.read_all().unwrap(), b"persistent data");
        }
    }

    #[test]
    fn file_open_removes_stale_staging() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.snapshot");
        fs::write(staging_path(&path), b"half written").unwrap();

        let backend = FileBackend::open(&path).unwrap();
        assert!(!staging_path(&path).exists());
        assert!(backend.read_all().unwrap().is_empty());
    }

    #[test]
    fn file_create_with_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("path").join("test.snapshot");

        let mut backend = FileBackend::open_with_create_dirs(&path).unwrap();
        backend.replace(b"x").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn file_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.snapshot");

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.path(), path);
    }
}
