//! Composite keys for treekv.
//!
//! A value in treekv is addressed by a multi-level key rather than a flat
//! name. Each level holds named fields; the whole chain renders to a path in
//! a hierarchical blob store, e.g.
//!
//! ```text
//! loan/borrower_B1.lender_L1/loan_LN1/payment_P1
//! ```
//!
//! Keys may be *partial*: a level can know fewer fields than the key format
//! requires. Partial keys only render up to the last fully known level and
//! are used to query for every stored key that extends them.
//!
//! # Modules
//!
//! - [`error`] -- Error types for key operations
//! - [`fields`] -- The ordered [`FieldMap`]
//! - [`level`] -- A single key [`Level`]
//! - [`key`] -- The [`KeyPath`] chain and its path encoding
//! - [`names`] -- Validation of names, values and prefixes

pub mod error;
pub mod fields;
pub mod key;
pub mod level;
pub mod names;

pub use error::{KeyError, KeyResult};
pub use fields::FieldMap;
pub use key::{KeyPath, Levels};
pub use level::Level;
