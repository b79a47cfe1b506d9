//! Composite keys and their path encoding.
//!
//! A [`KeyPath`] is an optional prefix plus a chain of [`Level`]s. It encodes
//! to a `/`-delimited path:
//!
//! ```text
//! path   := [ prefix "/" ] level ( "/" level )*
//! level  := field ( "." field )*
//! field  := name "_" value
//! ```
//!
//! Encoding stops at the first level that is not fully known. A partial key
//! therefore renders as the directory that has to be listed to discover the
//! rest of it, always ending in `/` (or the empty string when there is no
//! prefix and the root is unknown).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};
use crate::fields::FieldMap;
use crate::level::Level;
use crate::names::{validate_prefix, LEVEL_SEPARATOR};

/// A composite, hierarchical key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKeyPath")]
pub struct KeyPath {
    prefix: Option<String>,
    root: Level,
}

/// Unvalidated wire form of [`KeyPath`].
#[derive(Deserialize)]
struct RawKeyPath {
    prefix: Option<String>,
    root: Level,
}

impl TryFrom<RawKeyPath> for KeyPath {
    type Error = KeyError;

    fn try_from(raw: RawKeyPath) -> KeyResult<Self> {
        match raw.prefix {
            Some(prefix) => KeyPath::with_prefix(prefix, raw.root),
            None => Ok(KeyPath::new(raw.root)),
        }
    }
}

impl KeyPath {
    /// A key without a prefix.
    pub fn new(root: Level) -> Self {
        Self { prefix: None, root }
    }

    /// A key rooted under the directory `prefix`.
    pub fn with_prefix(prefix: impl Into<String>, root: Level) -> KeyResult<Self> {
        let prefix = prefix.into();
        validate_prefix(&prefix)?;
        Ok(Self {
            prefix: Some(prefix),
            root,
        })
    }

    /// Append `level` below the deepest level.
    ///
    /// ```
    /// use treekv_key::{KeyPath, Level};
    ///
    /// let key = KeyPath::with_prefix("loan", Level::from_pairs([("borrower", "B1")]).unwrap())
    ///     .unwrap()
    ///     .then(Level::from_pairs([("loan", "LN1")]).unwrap());
    /// assert_eq!(key.to_path(), "loan/borrower_B1/loan_LN1");
    /// ```
    pub fn then(mut self, level: Level) -> Self {
        self.push_level(level);
        self
    }

    /// Append `level` below the deepest level, in place.
    pub fn push_level(&mut self, level: Level) {
        self.root.append(level);
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn root(&self) -> &Level {
        &self.root
    }

    /// Iterate over the levels from the root down.
    pub fn levels(&self) -> Levels<'_> {
        Levels {
            next: Some(&self.root),
        }
    }

    /// The level at `depth` (0 is the root).
    pub fn level(&self, depth: usize) -> Option<&Level> {
        self.levels().nth(depth)
    }

    /// Number of levels in the chain.
    pub fn depth(&self) -> usize {
        self.levels().count()
    }

    /// Returns `true` if any level knows fewer fields than it expects.
    pub fn is_partial(&self) -> bool {
        self.levels().any(Level::is_partial)
    }

    /// Returns `true` if every level renders, i.e. the key names exactly one
    /// path.
    pub fn is_resolved(&self) -> bool {
        self.levels().all(Level::is_resolved)
    }

    /// Encode the key to a path.
    ///
    /// Stops at the first unresolved level; no segment is ever produced for
    /// fields that are not fully known.
    pub fn to_path(&self) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            out.push(LEVEL_SEPARATOR);
        }
        for (depth, level) in self.levels().enumerate() {
            if depth > 0 {
                out.push(LEVEL_SEPARATOR);
            }
            if !level.is_resolved() {
                break;
            }
            out.push_str(&level.fields().encode());
        }
        out
    }

    /// Decode a path produced by [`to_path`](Self::to_path).
    ///
    /// When `has_prefix` is set, the first component is taken verbatim as the
    /// prefix. Every remaining component must consist of `name_value` tokens.
    pub fn from_path(path: &str, has_prefix: bool) -> KeyResult<Self> {
        let mut components = path.split(LEVEL_SEPARATOR).filter(|c| !c.is_empty());

        let prefix = if has_prefix {
            let prefix = components.next().ok_or_else(|| KeyError::Parse {
                path: path.to_string(),
                prefix: None,
                reason: "path is empty".into(),
            })?;
            Some(prefix.to_string())
        } else {
            None
        };

        let parse_error = |reason: String| KeyError::Parse {
            path: path.to_string(),
            prefix: prefix.clone(),
            reason,
        };

        let mut levels = Vec::new();
        for component in components {
            let fields = FieldMap::decode(component).map_err(&parse_error)?;
            levels.push(Level::new(fields));
        }
        let root = chain(levels).ok_or_else(|| parse_error("path has no key levels".into()))?;

        if let Some(prefix) = &prefix {
            validate_prefix(prefix).map_err(|e| parse_error(e.to_string()))?;
        }

        Ok(Self { prefix, root })
    }

    /// Returns `true` if `other` extends this key.
    ///
    /// Prefixes must agree when `self` has one, and every field at every
    /// level of `self` must be present with an equal value at the same level
    /// of `other`. Levels of `self` without fields match anything, including
    /// a missing level.
    pub fn matches(&self, other: &KeyPath) -> bool {
        if !self.prefix_matches(other) {
            return false;
        }
        let mut theirs = other.levels();
        for mine in self.levels() {
            match theirs.next() {
                Some(level) if mine.matches(level) => {}
                Some(_) => return false,
                None if mine.fields().is_empty() => {}
                None => return false,
            }
        }
        true
    }

    /// Like [`matches`](Self::matches) but only compares the levels both keys
    /// have. Used while a candidate is still shallower than the query.
    pub fn matches_resolved(&self, candidate: &KeyPath) -> bool {
        self.prefix_matches(candidate)
            && self
                .levels()
                .zip(candidate.levels())
                .all(|(mine, theirs)| mine.matches(theirs))
    }

    fn prefix_matches(&self, other: &KeyPath) -> bool {
        match &self.prefix {
            Some(prefix) => other.prefix.as_deref() == Some(prefix.as_str()),
            None => true,
        }
    }

    /// The levels of `self` followed by the levels of `query` that lie deeper
    /// than `self` reaches.
    pub fn overlay(&self, query: &KeyPath) -> KeyPath {
        let mut levels: Vec<Level> = self.levels().map(Level::detached).collect();
        let depth = levels.len();
        levels.extend(query.levels().skip(depth).map(Level::detached));

        // `self` always contributes its root, so the chain is never empty.
        let root = chain(levels).unwrap_or_else(Level::any);
        KeyPath {
            prefix: self.prefix.clone().or_else(|| query.prefix.clone()),
            root,
        }
    }

    /// Flatten every level into one map. Deeper levels override fields of
    /// the same name in shallower ones.
    pub fn metadata(&self) -> FieldMap {
        let mut out = FieldMap::new();
        for level in self.levels() {
            for (name, value) in level.fields().iter() {
                out.upsert(name, value);
            }
        }
        out
    }
}

impl From<Level> for KeyPath {
    fn from(root: Level) -> Self {
        Self::new(root)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Iterator over the levels of a [`KeyPath`], root first.
#[derive(Clone, Debug)]
pub struct Levels<'a> {
    next: Option<&'a Level>,
}

impl<'a> Iterator for Levels<'a> {
    type Item = &'a Level;

    fn next(&mut self) -> Option<&'a Level> {
        let current = self.next?;
        self.next = current.child();
        Some(current)
    }
}

/// Link detached levels into a chain, first element at the root.
fn chain(mut levels: Vec<Level>) -> Option<Level> {
    let mut acc = levels.pop()?;
    while let Some(parent) = levels.pop() {
        acc = parent.with_child(acc);
    }
    Some(acc)
}
