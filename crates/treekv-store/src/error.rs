/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Nothing is stored at the path.
    #[error("path not found: {path}")]
    NotFound { path: String },

    /// A file or directory already occupies the path.
    #[error("path already exists: {path}")]
    AlreadyExists { path: String },

    /// The path (or one of its ancestors) is a file where a directory is
    /// required.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// The path is a directory where a file is required.
    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    /// A non-recursive delete addressed a directory with children.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty { path: String },

    /// The path contains components the store cannot address.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    /// The store configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// An internal lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Transport or availability failure reported by a remote backend.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Returns `true` for [`StoreError::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }

    /// Returns `true` for [`StoreError::NotADirectory`].
    pub fn is_not_a_directory(&self) -> bool {
        matches!(self, StoreError::NotADirectory { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
