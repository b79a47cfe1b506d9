use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::fs::FsBlobStore;
use crate::memory::InMemoryBlobStore;
use crate::traits::BlobStore;

/// Which backend to open, and how.
///
/// Read from TOML with the backend name as the `backend` key:
///
/// ```toml
/// backend = "filesystem"
/// root = "/var/lib/treekv"
/// create_root = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// A fresh [`InMemoryBlobStore`].
    #[default]
    Memory,
    /// An [`FsBlobStore`] rooted at `root`.
    Filesystem {
        root: PathBuf,
        /// Create `root` if it does not exist.
        #[serde(default = "default_create_root")]
        create_root: bool,
    },
}

fn default_create_root() -> bool {
    true
}

impl StoreConfig {
    /// A filesystem backend that creates its root on open.
    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self::Filesystem {
            root: root.into(),
            create_root: true,
        }
    }

    /// Parse a configuration from a TOML document.
    pub fn from_toml_str(source: &str) -> StoreResult<Self> {
        toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Render this configuration as TOML.
    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Open the configured backend.
    pub fn open(&self) -> StoreResult<Arc<dyn BlobStore>> {
        match self {
            StoreConfig::Memory => Ok(Arc::new(InMemoryBlobStore::new())),
            StoreConfig::Filesystem { root, create_root } => {
                let store = if *create_root {
                    FsBlobStore::open_or_create(root)?
                } else {
                    FsBlobStore::open(root)?
                };
                Ok(Arc::new(store))
            }
        }
    }
}
