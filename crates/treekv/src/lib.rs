//! treekv: key-value records over a hierarchical blob store.
//!
//! Values are addressed by composite [`KeyPath`]s that render to
//! directory paths, so related records share directories and a partial key
//! can find every record below it.
//!
//! ```
//! use std::sync::Arc;
//! use treekv::{BlobStore, FieldMap, InMemoryBlobStore, KeyPath, Level, QueryEngine, Record};
//!
//! let store: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
//!
//! for borrower in ["B1", "B2"] {
//!     let key = KeyPath::with_prefix(
//!         "loan",
//!         Level::from_pairs([("borrower", borrower), ("lender", "L1")]).unwrap(),
//!     )
//!     .unwrap()
//!     .then(Level::from_pairs([("loan", "LN1")]).unwrap())
//!     .then(Level::from_pairs([("payment", "P1")]).unwrap());
//!     Record::with_payload(key, b"250".to_vec(), store.clone()).write().unwrap();
//! }
//!
//! // Two fields are stored at the first level; the query knows one.
//! let query = KeyPath::with_prefix(
//!     "loan",
//!     Level::partial(FieldMap::from_pairs([("borrower", "B2")]).unwrap(), 2).unwrap(),
//! )
//! .unwrap();
//! let keys = QueryEngine::new(store).keys(&query).unwrap();
//! assert_eq!(keys.len(), 1);
//! assert_eq!(keys[0].to_path(), "loan/borrower_B2.lender_L1/loan_LN1/payment_P1");
//! ```
//!
//! # Modules
//!
//! - [`error`] -- [`KvError`] and the [`KvResult`] alias
//! - [`payload`] -- Byte codecs for record payloads
//! - [`record`] -- [`Record`]: read, write, create and delete one value
//! - [`query`] -- [`QueryEngine`]: lazy partial-key queries
//! - [`table`] -- Row-per-record [`Table`] projection
//!
//! Keys come from `treekv-key` and storage backends from `treekv-store`;
//! their main types are re-exported here.

pub mod error;
pub mod payload;
pub mod query;
pub mod record;
pub mod table;

pub use error::{KvError, KvResult};
pub use payload::{Json, Payload};
pub use query::{MalformedPolicy, QueryConfig, QueryEngine, Resolve};
pub use record::{Issued, Record};
pub use table::{Cell, Projection, Table};

// Re-export key and store types
pub use treekv_key::{FieldMap, KeyError, KeyPath, Level};
pub use treekv_store::{BlobStore, FsBlobStore, InMemoryBlobStore, StoreConfig, StoreError};
