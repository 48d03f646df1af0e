//! In-process blob storage, for tests and ephemeral deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use uuid::Uuid;

use super::{BlobError, BlobResult, BlobStore};

#[derive(Debug)]
struct Entry {
    bytes: Vec<u8>,
    written_at: Instant,
}

/// Blob store holding bytes in a map.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Entry>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }
}

impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write(&self, bytes: &[u8]) -> BlobResult<String> {
        let key = Uuid::new_v4().simple().to_string();
        let entry = Entry {
            bytes: bytes.to_vec(),
            written_at: Instant::now(),
        };
        self.blobs.write().insert(key.clone(), entry);
        Ok(key)
    }

    fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.blobs
            .read()
            .get(key)
            .map(|entry| entry.bytes.clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        self.blobs
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    fn list_keys(&self, older_than: Duration) -> BlobResult<Vec<String>> {
        Ok(self
            .blobs
            .read()
            .iter()
            .filter(|(_, entry)| entry.written_at.elapsed() >= older_than)
            .map(|(key, _)| key.clone())
            .collect())
    }
}
