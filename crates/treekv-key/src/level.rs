//! A single level of a composite key.

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};
use crate::fields::FieldMap;

/// One level of a [`KeyPath`](crate::KeyPath): a set of named fields that
/// renders to one path component, plus an optional deeper level.
///
/// `expected` is the number of fields the key format requires at this
/// level. A level holding fewer fields than expected is *partial*: its path
/// component is not known yet, so it can only be used for matching.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLevel")]
pub struct Level {
    fields: FieldMap,
    expected: usize,
    child: Option<Box<Level>>,
}

/// Unvalidated wire form of [`Level`].
#[derive(Deserialize)]
struct RawLevel {
    fields: FieldMap,
    expected: usize,
    child: Option<Box<Level>>,
}

impl TryFrom<RawLevel> for Level {
    type Error = KeyError;

    fn try_from(raw: RawLevel) -> KeyResult<Self> {
        let level = Level::new(raw.fields).with_expected(raw.expected)?;
        Ok(match raw.child {
            Some(child) => level.with_child(*child),
            None => level,
        })
    }
}

impl Level {
    /// An exact level holding `fields`.
    pub fn new(fields: FieldMap) -> Self {
        let expected = fields.len();
        Self {
            fields,
            expected,
            child: None,
        }
    }

    /// An exact level built from `(name, value)` pairs.
    ///
    /// ```
    /// use treekv_key::Level;
    ///
    /// let level = Level::from_pairs([("borrower", "B1"), ("lender", "L1")]).unwrap();
    /// assert!(!level.is_partial());
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> KeyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        Ok(Self::new(FieldMap::from_pairs(pairs)?))
    }

    /// A level that knows only some of its `expected` fields.
    pub fn partial(fields: FieldMap, expected: usize) -> KeyResult<Self> {
        Self::new(fields).with_expected(expected)
    }

    /// A level with no known fields. It matches anything and never renders.
    pub fn any() -> Self {
        Self::new(FieldMap::new())
    }

    /// Override the expected field count.
    pub fn with_expected(mut self, expected: usize) -> KeyResult<Self> {
        if expected < self.fields.len() {
            return Err(KeyError::ExpectedCountTooSmall {
                expected,
                actual: self.fields.len(),
            });
        }
        self.expected = expected;
        Ok(self)
    }

    /// Attach `child` as the next level, replacing any existing child.
    pub fn with_child(mut self, child: Level) -> Self {
        self.child = Some(Box::new(child));
        self
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn expected_count(&self) -> usize {
        self.expected
    }

    pub fn child(&self) -> Option<&Level> {
        self.child.as_deref()
    }

    /// Attach `level` below the deepest level of this chain.
    pub(crate) fn append(&mut self, level: Level) {
        match &mut self.child {
            Some(child) => child.append(level),
            None => self.child = Some(Box::new(level)),
        }
    }

    /// Returns `true` if fewer fields are known than the format expects.
    pub fn is_partial(&self) -> bool {
        self.expected > self.fields.len()
    }

    /// Returns `true` if this level can be rendered as a path component.
    pub fn is_resolved(&self) -> bool {
        !self.is_partial() && !self.fields.is_empty()
    }

    /// Returns `true` if every field of `self` appears in `other` with an
    /// equal value.
    pub fn matches(&self, other: &Level) -> bool {
        self.fields.is_subset_of(&other.fields)
    }

    /// A copy of this level without its child chain.
    pub(crate) fn detached(&self) -> Self {
        Self {
            fields: self.fields.clone(),
            expected: self.expected,
            child: None,
        }
    }
}
