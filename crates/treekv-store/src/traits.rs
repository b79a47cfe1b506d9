//! The [`BlobStore`] trait defining the storage interface.
//!
//! Any backend (in-memory, local filesystem, a remote mutable-filesystem
//! service) implements this trait to hold treekv values.

use crate::error::{StoreError, StoreResult};

/// A hierarchical, path-addressable store of byte blobs.
///
/// Paths are `/`-delimited and relative to the store root (see
/// [`crate::path`]). Entries are either files holding bytes or directories
/// holding named children.
///
/// Implementations must be thread-safe (`Send + Sync`); concurrent reads
/// and listings must be safe. Retries and timeouts are the implementation's
/// concern: errors are passed to callers unmodified.
pub trait BlobStore: Send + Sync {
    /// Create a directory, along with any missing ancestors.
    ///
    /// Fails with [`StoreError::AlreadyExists`] if anything already occupies
    /// `path`.
    fn mkdir(&self, path: &str) -> StoreResult<()>;

    /// Returns `true` if a file or directory exists at `path`.
    fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Read the file at `path`.
    ///
    /// Fails with [`StoreError::NotFound`] if nothing is stored there. An
    /// empty file reads as an empty vector, never as `NotFound`.
    fn read(&self, path: &str) -> StoreResult<Vec<u8>>;

    /// Write the file at `path`, replacing any previous contents and creating
    /// missing ancestor directories.
    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Write the file at `path` only if nothing exists there yet.
    ///
    /// Fails with [`StoreError::AlreadyExists`] rather than overwriting.
    fn create(&self, path: &str, data: &[u8]) -> StoreResult<()>;

    /// Names of the direct children of the directory at `path`, in the
    /// store's listing order.
    ///
    /// Fails with [`StoreError::NotADirectory`] if `path` is a file and with
    /// [`StoreError::NotFound`] if it does not exist.
    fn list_children(&self, path: &str) -> StoreResult<Vec<String>>;

    /// Delete the entry at `path`.
    ///
    /// Deleting an absent path is not an error. A non-empty directory is only
    /// removed when `recursive` is set.
    fn delete(&self, path: &str, recursive: bool) -> StoreResult<()>;

    /// Read the file at `path`, mapping [`StoreError::NotFound`] to `None`.
    fn read_opt(&self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.read(path) {
            Ok(data) => Ok(Some(data)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
