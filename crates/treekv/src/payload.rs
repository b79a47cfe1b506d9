//! Payload codecs.
//!
//! A [`Record`](crate::Record) holds its payload as a typed value and stores
//! it as bytes. [`Payload`] converts between the two.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A value that can be stored as the contents of a record.
///
/// `Default` supplies the payload of a record that has not been read yet.
/// Every record gets its own default value.
pub trait Payload: Default {
    /// Serialize for storage.
    fn to_bytes(&self) -> Result<Vec<u8>, String>;

    /// Deserialize stored bytes. An empty slice is a valid stored payload.
    fn from_bytes(bytes: &[u8]) -> Result<Self, String>;
}

impl Payload for Vec<u8> {
    fn to_bytes(&self) -> Result<Vec<u8>, String> {
        Ok(self.clone())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        Ok(bytes.to_vec())
    }
}

impl Payload for String {
    fn to_bytes(&self) -> Result<Vec<u8>, String> {
        Ok(self.as_bytes().to_vec())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
    }
}

/// A payload stored as JSON.
///
/// An empty stored file decodes to `T::default()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> Payload for Json<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    fn to_bytes(&self) -> Result<Vec<u8>, String> {
        serde_json::to_vec(&self.0).map_err(|e| e.to_string())
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes).map(Json).map_err(|e| e.to_string())
    }
}
