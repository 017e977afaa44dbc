//! Storage backend trait definition.

use crate::error::StorageResult;

/// A single-blob storage backend.
///
/// Each backend holds the most recent blob handed to [`replace`]. The
/// engine rewrites its snapshots wholesale after every commit or abort, so
/// there is no append or random-access API.
///
/// # Invariants
///
/// - `read_all` returns exactly the bytes of the last successful `replace`
/// - A failed `replace` leaves the previous blob readable
/// - `sync` makes the current blob durable across power loss
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
///
/// [`replace`]: StorageBackend::replace
pub trait StorageBackend: Send + Sync {
    /// Reads the whole stored blob.
    ///
    /// An empty vector means nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the stored blob with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the new blob could not be written. The previous
    /// blob is still readable in that case.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Pushes buffered bytes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the size of the stored blob in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Returns true if no blob has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.size()? == 0)
    }
}
