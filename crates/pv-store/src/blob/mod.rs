//! Blob storage backends.
//!
//! A [`BlobStore`] persists raw picture bytes under an opaque key chosen by
//! the store. Side effects are confined to the addressed key; only the
//! out-of-band sweep ever enumerates a store.

mod filesystem;
mod inline;
mod memory;

use std::time::Duration;

pub use filesystem::FilesystemBlobStore;
pub use inline::InlineBlobStore;
pub use memory::MemoryBlobStore;

/// Blob operation errors.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    #[error("blob {operation} failed for {key}: {source}")]
    Io {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("blob {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

impl BlobError {
    pub(crate) fn io(operation: &'static str, key: impl Into<String>, source: std::io::Error) -> Self {
        BlobError::Io {
            operation,
            key: key.into(),
            source,
        }
    }
}

/// Result type for blob operations.
pub type BlobResult<T> = std::result::Result<T, BlobError>;

/// Durable storage for raw picture bytes.
pub trait BlobStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Persist `bytes` and return the key they are stored under.
    ///
    /// A reader never observes a partially written blob.
    fn write(&self, bytes: &[u8]) -> BlobResult<String>;

    /// Read the bytes stored under `key`.
    fn read(&self, key: &str) -> BlobResult<Vec<u8>>;

    /// Remove the blob stored under `key`.
    fn delete(&self, key: &str) -> BlobResult<()>;

    /// Keys of blobs last modified more than `older_than` ago.
    ///
    /// Out-of-band maintenance only; request paths never call this.
    fn list_keys(&self, older_than: Duration) -> BlobResult<Vec<String>>;

    /// Remove leftovers of aborted writes older than `older_than`, returning
    /// how many were removed.
    fn purge_partial(&self, _older_than: Duration) -> BlobResult<usize> {
        Ok(0)
    }
}
