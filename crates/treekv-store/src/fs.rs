//! Local-filesystem blob store.
//!
//! [`FsBlobStore`] maps store paths onto a directory tree below a root
//! directory: store directories are real directories and store files are
//! regular files. Listings are returned in name order.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::path::components;
use crate::traits::BlobStore;

/// Name prefix of files staged by `create`. Listings never show them.
const STAGING_PREFIX: &str = ".treekv-staged-";

/// A [`BlobStore`] backed by a local directory.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::NotFound {
                path: root.display().to_string(),
            });
        }
        info!(root = %root.display(), "filesystem blob store opened");
        Ok(Self { root })
    }

    /// Open a store, creating the root directory if it does not exist.
    pub fn open_or_create(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Self::open(root)
    }

    /// The directory this store lives in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, comps: &[&str]) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(comps);
        full
    }

    /// Metadata for `full`, or `None` if nothing is there. A path that runs
    /// through a regular file is absent, not an I/O failure.
    fn stat(&self, full: &Path) -> StoreResult<Option<fs::Metadata>> {
        match fs::metadata(full) {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                let through_file = full
                    .ancestors()
                    .skip(1)
                    .take_while(|p| p.starts_with(&self.root) && *p != self.root)
                    .any(Path::is_file);
                if through_file {
                    Ok(None)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    /// Create every missing directory above the last component.
    fn ensure_parents(&self, comps: &[&str]) -> StoreResult<()> {
        let mut dir = self.root.clone();
        let parents = comps.len().saturating_sub(1);
        for (i, name) in comps[..parents].iter().enumerate() {
            dir.push(name);
            match fs::metadata(&dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => {
                    return Err(StoreError::NotADirectory {
                        path: comps[..=i].join("/"),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => match fs::create_dir(&dir) {
                    Ok(()) => {}
                    // Lost a race with a concurrent writer; the directory is there now.
                    Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
                    Err(e) => return Err(e.into()),
                },
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn target_of<'p>(comps: &'p [&'p str], path: &str) -> StoreResult<&'p [&'p str]> {
    if comps.is_empty() {
        return Err(StoreError::IsADirectory {
            path: path.to_string(),
        });
    }
    Ok(comps)
}

impl BlobStore for FsBlobStore {
    fn mkdir(&self, path: &str) -> StoreResult<()> {
        let comps = components(path)?;
        let full = self.resolve(&comps);
        if comps.is_empty() || self.stat(&full)?.is_some() {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }
        self.ensure_parents(&comps)?;
        match fs::create_dir(&full) {
            Ok(()) => {
                debug!(path, "mkdir");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::AlreadyExists {
                path: path.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let comps = components(path)?;
        Ok(self.stat(&self.resolve(&comps))?.is_some())
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let comps = components(path)?;
        let full = self.resolve(&comps);
        match self.stat(&full)? {
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Some(meta) if meta.is_dir() => Err(StoreError::IsADirectory {
                path: path.to_string(),
            }),
            Some(_) => match fs::read(&full) {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound {
                    path: path.to_string(),
                }),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let comps = components(path)?;
        let comps = target_of(&comps, path)?;
        self.ensure_parents(comps)?;
        let full = self.resolve(comps);
        if full.is_dir() {
            return Err(StoreError::IsADirectory {
                path: path.to_string(),
            });
        }
        fs::write(&full, data)?;
        debug!(path, len = data.len(), "write");
        Ok(())
    }

    fn create(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let comps = components(path)?;
        let comps = target_of(&comps, path)?;
        self.ensure_parents(comps)?;
        let full = self.resolve(comps);
        let dir = full.parent().unwrap_or(self.root.as_path());

        // Staged next to the target so nothing partial ever sits at `full`.
        let mut staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(dir)?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;
        match staged.persist_noclobber(&full) {
            Ok(_) => {
                debug!(path, len = data.len(), "create");
                Ok(())
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists {
                    path: path.to_string(),
                })
            }
            Err(e) => Err(e.error.into()),
        }
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<String>> {
        let comps = components(path)?;
        let full = self.resolve(&comps);
        match self.stat(&full)? {
            None => {
                return Err(StoreError::NotFound {
                    path: path.to_string(),
                })
            }
            Some(meta) if !meta.is_dir() => {
                return Err(StoreError::NotADirectory {
                    path: path.to_string(),
                })
            }
            Some(_) => {}
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) if name.starts_with(STAGING_PREFIX) => {}
                Ok(name) => names.push(name),
                Err(raw) => warn!(path, name = ?raw, "skipping non-UTF-8 entry"),
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, path: &str, recursive: bool) -> StoreResult<()> {
        let comps = components(path)?;
        if comps.is_empty() {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: "cannot delete the store root".into(),
            });
        }
        let full = self.resolve(&comps);

        let result = match self.stat(&full)? {
            None => return Ok(()),
            Some(meta) if !meta.is_dir() => fs::remove_file(&full),
            Some(_) if recursive => fs::remove_dir_all(&full),
            Some(_) => {
                if fs::read_dir(&full)?.next().is_some() {
                    return Err(StoreError::DirectoryNotEmpty {
                        path: path.to_string(),
                    });
                }
                fs::remove_dir(&full)
            }
        };
        match result {
            Ok(()) => {
                debug!(path, recursive, "delete");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
