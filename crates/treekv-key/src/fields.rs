//! Ordered field maps.
//!
//! [`FieldMap`] is the name → value mapping held by every key level. Names
//! are unique and insertion order is preserved, because the order of fields
//! decides the order of `name_value` tokens in the encoded path.

use serde::{Deserialize, Serialize};

use crate::error::{KeyError, KeyResult};
use crate::names::{
    validate_field_name, validate_field_value, FIELD_SEPARATOR, NAME_VALUE_SEPARATOR,
};

/// An ordered string → string map with unique keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<(String, String)>", into = "Vec<(String, String)>")]
pub struct FieldMap {
    entries: Vec<(String, String)>,
}

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from `(name, value)` pairs, validating every pair.
    ///
    /// Values are stringified with [`ToString`], so UUIDs and integers can be
    /// passed directly.
    pub fn from_pairs<I, K, V>(pairs: I) -> KeyResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.insert(name.as_ref(), value)?;
        }
        Ok(map)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by field name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if a field with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Append a new field.
    ///
    /// Fails if the name or value cannot be encoded, or if the name is
    /// already present.
    pub fn insert(&mut self, name: &str, value: impl ToString) -> KeyResult<()> {
        let value = value.to_string();
        validate_field_name(name)?;
        validate_field_value(name, &value)?;
        if self.contains(name) {
            return Err(KeyError::DuplicateField {
                name: name.to_string(),
            });
        }
        self.entries.push((name.to_string(), value));
        Ok(())
    }

    /// Set a field, overwriting the value in place if the name exists.
    ///
    /// Used when flattening levels, where deeper levels win.
    pub(crate) fn upsert(&mut self, name: &str, value: &str) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
    }

    /// Returns `true` if every field of `self` is present in `other` with an
    /// equal value. `other` may hold additional fields.
    pub fn is_subset_of(&self, other: &FieldMap) -> bool {
        self.iter().all(|(name, value)| other.get(name) == Some(value))
    }

    /// Render as `name_value` tokens joined by `.`.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                out.push(FIELD_SEPARATOR);
            }
            out.push_str(name);
            out.push(NAME_VALUE_SEPARATOR);
            out.push_str(value);
        }
        out
    }

    /// Parse one path component. The error is a human readable reason; the
    /// caller attaches the full path.
    pub(crate) fn decode(segment: &str) -> Result<Self, String> {
        let mut map = Self::new();
        for token in segment.split(FIELD_SEPARATOR) {
            let (name, value) = token
                .split_once(NAME_VALUE_SEPARATOR)
                .ok_or_else(|| format!("token {token:?} has no '_' separator"))?;
            map.insert(name, value).map_err(|e| e.to_string())?;
        }
        Ok(map)
    }
}

impl TryFrom<Vec<(String, String)>> for FieldMap {
    type Error = KeyError;

    fn try_from(pairs: Vec<(String, String)>) -> KeyResult<Self> {
        Self::from_pairs(pairs)
    }
}

impl From<FieldMap> for Vec<(String, String)> {
    fn from(map: FieldMap) -> Self {
        map.entries
    }
}
