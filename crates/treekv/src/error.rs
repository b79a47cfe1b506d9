use thiserror::Error;
use treekv_key::KeyError;
use treekv_store::StoreError;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("key does not name a single path: {path:?}")]
    UnresolvedKey { path: String },

    #[error("payload error at {path}: {reason}")]
    Payload { path: String, reason: String },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for KvError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => KvError::NotFound { path },
            StoreError::AlreadyExists { path } => KvError::AlreadyExists { path },
            other => KvError::Store(other),
        }
    }
}

pub type KvResult<T> = Result<T, KvError>;

impl KvError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, KvError::AlreadyExists { .. })
    }
}
