//! In-memory blob store for testing and ephemeral use.
//!
//! [`InMemoryBlobStore`] keeps a directory tree of `BTreeMap`s behind a
//! `RwLock`. It implements the full [`BlobStore`] contract and lists
//! children in name order.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::path::components;
use crate::traits::BlobStore;

type Dir = BTreeMap<String, Node>;

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir(Dir),
}

impl Node {
    fn file_count(&self) -> usize {
        match self {
            Node::File(_) => 1,
            Node::Dir(children) => children.values().map(Node::file_count).sum(),
        }
    }
}

/// An in-memory implementation of [`BlobStore`].
///
/// Data is lost when the store is dropped.
pub struct InMemoryBlobStore {
    root: RwLock<Dir>,
}

impl InMemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of files currently stored, at any depth.
    pub fn file_count(&self) -> StoreResult<usize> {
        let root = self.read_tree()?;
        Ok(root.values().map(Node::file_count).sum())
    }

    fn read_tree(&self) -> StoreResult<RwLockReadGuard<'_, Dir>> {
        self.root
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write_tree(&self) -> StoreResult<RwLockWriteGuard<'_, Dir>> {
        self.root
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the node at `comps`. Walking through a file counts as absent.
fn lookup<'a>(root: &'a Dir, comps: &[&str]) -> Option<&'a Node> {
    let (last, parents) = comps.split_last()?;
    let mut dir = root;
    for name in parents {
        match dir.get(*name)? {
            Node::Dir(children) => dir = children,
            Node::File(_) => return None,
        }
    }
    dir.get(*last)
}

/// The directory at `comps`, optionally creating missing directories.
fn dir_mut<'a>(root: &'a mut Dir, comps: &[&str], create: bool) -> StoreResult<&'a mut Dir> {
    let mut dir = root;
    for (i, name) in comps.iter().enumerate() {
        let node = if create {
            dir.entry(name.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()))
        } else {
            dir.get_mut(*name).ok_or_else(|| StoreError::NotFound {
                path: comps[..=i].join("/"),
            })?
        };
        dir = match node {
            Node::Dir(children) => children,
            Node::File(_) => {
                return Err(StoreError::NotADirectory {
                    path: comps[..=i].join("/"),
                })
            }
        };
    }
    Ok(dir)
}

/// Split off the final component, refusing to address the root itself.
fn split_target<'p>(comps: &'p [&'p str], path: &str) -> StoreResult<(&'p str, &'p [&'p str])> {
    comps
        .split_last()
        .map(|(last, parents)| (*last, parents))
        .ok_or_else(|| StoreError::IsADirectory {
            path: path.to_string(),
        })
}

impl BlobStore for InMemoryBlobStore {
    fn mkdir(&self, path: &str) -> StoreResult<()> {
        let comps = components(path)?;
        let Some((name, parents)) = comps.split_last() else {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        };

        let mut root = self.write_tree()?;
        let parent = dir_mut(&mut root, parents, true)?;
        if parent.contains_key(*name) {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }
        parent.insert(name.to_string(), Node::Dir(BTreeMap::new()));
        debug!(path, "mkdir");
        Ok(())
    }

    fn exists(&self, path: &str) -> StoreResult<bool> {
        let comps = components(path)?;
        if comps.is_empty() {
            return Ok(true);
        }
        let root = self.read_tree()?;
        Ok(lookup(&root, &comps).is_some())
    }

    fn read(&self, path: &str) -> StoreResult<Vec<u8>> {
        let comps = components(path)?;
        let root = self.read_tree()?;
        match lookup(&root, &comps) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir(_)) => Err(StoreError::IsADirectory {
                path: path.to_string(),
            }),
            None if comps.is_empty() => Err(StoreError::IsADirectory {
                path: path.to_string(),
            }),
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let comps = components(path)?;
        let (name, parents) = split_target(&comps, path)?;

        let mut root = self.write_tree()?;
        let parent = dir_mut(&mut root, parents, true)?;
        if let Some(Node::Dir(_)) = parent.get(name) {
            return Err(StoreError::IsADirectory {
                path: path.to_string(),
            });
        }
        parent.insert(name.to_string(), Node::File(data.to_vec()));
        debug!(path, len = data.len(), "write");
        Ok(())
    }

    fn create(&self, path: &str, data: &[u8]) -> StoreResult<()> {
        let comps = components(path)?;
        let (name, parents) = split_target(&comps, path)?;

        let mut root = self.write_tree()?;
        let parent = dir_mut(&mut root, parents, true)?;
        if parent.contains_key(name) {
            return Err(StoreError::AlreadyExists {
                path: path.to_string(),
            });
        }
        parent.insert(name.to_string(), Node::File(data.to_vec()));
        debug!(path, len = data.len(), "create");
        Ok(())
    }

    fn list_children(&self, path: &str) -> StoreResult<Vec<String>> {
        let comps = components(path)?;
        let root = self.read_tree()?;
        let dir = if comps.is_empty() {
            &*root
        } else {
            match lookup(&root, &comps) {
                Some(Node::Dir(children)) => children,
                Some(Node::File(_)) => {
                    return Err(StoreError::NotADirectory {
                        path: path.to_string(),
                    })
                }
                None => {
                    return Err(StoreError::NotFound {
                        path: path.to_string(),
                    })
                }
            }
        };
        Ok(dir.keys().cloned().collect())
    }

    fn delete(&self, path: &str, recursive: bool) -> StoreResult<()> {
        let comps = components(path)?;
        let Some((name, parents)) = comps.split_last() else {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: "cannot delete the store root".into(),
            });
        };

        let mut root = self.write_tree()?;
        let parent = match dir_mut(&mut root, parents, false) {
            Ok(parent) => parent,
            Err(StoreError::NotFound { .. } | StoreError::NotADirectory { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        if let Some(Node::Dir(children)) = parent.get(*name) {
            if !recursive && !children.is_empty() {
                return Err(StoreError::DirectoryNotEmpty {
                    path: path.to_string(),
                });
            }
        }
        if parent.remove(*name).is_some() {
            debug!(path, recursive, "delete");
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let files = self.file_count().unwrap_or_default();
        f.debug_struct("InMemoryBlobStore")
            .field("file_count", &files)
            .finish()
    }
}
