//! A single stored value addressed by a fully resolved key.

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use treekv_key::KeyPath;
use treekv_store::BlobStore;

use crate::error::{KvError, KvResult};
use crate::payload::Payload;

/// Outcome of [`Record::get_or_create`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Issued {
    /// Nothing was stored under the key; the new payload was written.
    Created,
    /// A payload already existed and was read back.
    Retrieved,
}

/// A key, its payload and the store it lives in.
///
/// Records are cheap handles created per operation. The payload is only
/// transferred by [`read`](Self::read), [`write`](Self::write) and
/// [`create`](Self::create); nothing is cached between calls.
pub struct Record<P = Vec<u8>> {
    key: KeyPath,
    payload: P,
    store: Arc<dyn BlobStore>,
}

impl<P> Record<P> {
    pub fn key(&self) -> &KeyPath {
        &self.key
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub fn set_payload(&mut self, payload: P) {
        self.payload = payload;
    }

    pub fn into_payload(self) -> P {
        self.payload
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// The path this record is stored at.
    ///
    /// Fails with [`KvError::UnresolvedKey`] if the key does not name a
    /// single path.
    pub fn path(&self) -> KvResult<String> {
        if !self.key.is_resolved() {
            return Err(KvError::UnresolvedKey {
                path: self.key.to_path(),
            });
        }
        Ok(self.key.to_path())
    }
}

impl<P: Payload> Record<P> {
    /// A handle with a fresh default payload. Nothing is read.
    pub fn new(key: KeyPath, store: Arc<dyn BlobStore>) -> Self {
        Self::with_payload(key, P::default(), store)
    }

    pub fn with_payload(key: KeyPath, payload: P, store: Arc<dyn BlobStore>) -> Self {
        Self {
            key,
            payload,
            store,
        }
    }

    /// Load the stored payload, replacing the one held.
    ///
    /// A missing file is [`KvError::NotFound`]; an empty file is an empty
    /// payload.
    pub fn read(&mut self) -> KvResult<&P> {
        let path = self.path()?;
        let bytes = self.store.read(&path)?;
        self.payload = P::from_bytes(&bytes).map_err(|reason| KvError::Payload {
            path: path.clone(),
            reason,
        })?;
        debug!(path = %path, len = bytes.len(), "record read");
        Ok(&self.payload)
    }

    /// Store the payload, overwriting whatever is there.
    pub fn write(&self) -> KvResult<()> {
        let path = self.path()?;
        let bytes = self.encode(&path)?;
        self.store.write(&path, &bytes)?;
        Ok(())
    }

    /// Store the payload only if nothing is stored under the key yet.
    pub fn create(&self) -> KvResult<()> {
        let path = self.path()?;
        let bytes = self.encode(&path)?;
        self.store.create(&path, &bytes)?;
        Ok(())
    }

    /// Remove the stored value and anything below it. Deleting a record that
    /// was never written succeeds.
    pub fn delete(&self) -> KvResult<()> {
        let path = self.path()?;
        self.store.delete(&path, true)?;
        Ok(())
    }

    pub fn exists(&self) -> KvResult<bool> {
        let path = self.path()?;
        Ok(self.store.exists(&path)?)
    }

    /// Create the record with the payload from `make`, or read back the one
    /// already stored under `key`.
    ///
    /// `make` is only called once, before the create attempt. When two
    /// callers race, exactly one sees [`Issued::Created`].
    pub fn get_or_create(
        key: KeyPath,
        store: Arc<dyn BlobStore>,
        make: impl FnOnce() -> P,
    ) -> KvResult<(Self, Issued)> {
        let record = Self::with_payload(key, make(), store);
        match record.create() {
            Ok(()) => {
                debug!(key = %record.key, "record created");
                Ok((record, Issued::Created))
            }
            Err(KvError::AlreadyExists { .. }) => {
                let mut existing = Self::new(record.key, record.store);
                existing.read()?;
                debug!(key = %existing.key, "record retrieved");
                Ok((existing, Issued::Retrieved))
            }
            Err(e) => Err(e),
        }
    }

    fn encode(&self, path: &str) -> KvResult<Vec<u8>> {
        self.payload.to_bytes().map_err(|reason| KvError::Payload {
            path: path.to_string(),
            reason,
        })
    }
}

impl<P: fmt::Debug> fmt::Debug for Record<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("key", &self.key.to_path())
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}
