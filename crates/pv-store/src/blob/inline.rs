//! Inline blob storage.
//!
//! The key *is* the blob: bytes are base64-encoded into the key, which the
//! metadata row stores verbatim. Nothing touches the filesystem and the row
//! is the sole source of truth.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{BlobError, BlobResult, BlobStore};

/// Blob store that embeds bytes in the metadata record.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineBlobStore;

impl InlineBlobStore {
    pub fn new() -> Self {
        Self
    }
}

impl BlobStore for InlineBlobStore {
    fn name(&self) -> &'static str {
        "inline"
    }

    fn write(&self, bytes: &[u8]) -> BlobResult<String> {
        Ok(STANDARD.encode(bytes))
    }

    fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        if key.is_empty() {
            return Err(BlobError::NotFound(String::new()));
        }
        STANDARD.decode(key).map_err(|e| BlobError::Corrupt {
            key: abbreviate(key),
            reason: e.to_string(),
        })
    }

    fn delete(&self, _key: &str) -> BlobResult<()> {
        // The bytes go away with the row.
        Ok(())
    }

    fn list_keys(&self, _older_than: Duration) -> BlobResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Keys can be megabytes long; keep log lines readable.
fn abbreviate(key: &str) -> String {
    const MAX: usize = 32;
    match key.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}... ({} chars)", &key[..idx], key.len()),
        None => key.to_string(),
    }
}
