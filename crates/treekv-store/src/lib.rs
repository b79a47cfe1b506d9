//! Hierarchical blob storage for treekv.
//!
//! treekv stores every value as a file in a path-addressable store that
//! also has directories, in the manner of a mutable filesystem service.
//! This crate defines that store's interface and ships two backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlobStore`] trait:
//!
//! - [`InMemoryBlobStore`] -- directory tree in memory, for tests and embedding
//! - [`FsBlobStore`] -- a directory on the local filesystem
//!
//! [`StoreConfig`] selects and opens a backend, and can be read from TOML.
//!
//! # Design Rules
//!
//! 1. A missing file is always [`StoreError::NotFound`]; an empty file reads as
//!    an empty payload.
//! 2. `create` never overwrites. It is the only concurrency primitive offered.
//! 3. Listing a file fails with [`StoreError::NotADirectory`].
//! 4. Deleting an absent path succeeds.
//! 5. Backends never retry; all errors reach the caller.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod path;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use memory::InMemoryBlobStore;
pub use traits::BlobStore;
