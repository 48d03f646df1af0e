//! Flat-directory blob storage.
//!
//! Blobs live directly under `root` as `{uuid}` files. Writes go to a hidden
//! `.tmp.{uuid}` file first, are synced, and are then renamed into place, so
//! a reader sees either nothing or the complete blob.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use super::{BlobError, BlobResult, BlobStore};

const TEMP_PREFIX: &str = ".tmp.";

/// Filesystem manager for picture blobs.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a key to its path, rejecting anything that is not a plain
    /// file name inside `root`.
    pub fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    fn entries_older_than(&self, older_than: Duration) -> BlobResult<Vec<(String, PathBuf)>> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BlobError::io("list", self.root.display().to_string(), e)),
        };

        let now = SystemTime::now();
        let mut out = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| BlobError::io("list", self.root.display().to_string(), e))?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                // Removed between readdir and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BlobError::io("stat", name, e)),
            };
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|m| now.duration_since(m).ok())
                .unwrap_or_default();
            if age >= older_than {
                out.push((name, entry.path()));
            }
        }
        Ok(out)
    }
}

impl BlobStore for FilesystemBlobStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn write(&self, bytes: &[u8]) -> BlobResult<String> {
        fs::create_dir_all(&self.root)
            .map_err(|e| BlobError::io("create_dir", self.root.display().to_string(), e))?;

        let key = Uuid::new_v4().simple().to_string();
        let final_path = self.root.join(&key);
        let temp_path = self.root.join(format!("{TEMP_PREFIX}{key}"));

        let written = (|| -> std::io::Result<()> {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp_path, &final_path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(BlobError::io("write", key, e));
        }

        tracing::trace!(key = %key, size = bytes.len(), "Blob written");
        Ok(key)
    }

    fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(key.to_string())
            } else {
                BlobError::io("read", key, e)
            }
        })
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BlobError::NotFound(key.to_string())
            } else {
                BlobError::io("delete", key, e)
            }
        })
    }

    fn list_keys(&self, older_than: Duration) -> BlobResult<Vec<String>> {
        Ok(self
            .entries_older_than(older_than)?
            .into_iter()
            .map(|(name, _)| name)
            .filter(|name| validate_key(name).is_ok())
            .collect())
    }

    fn purge_partial(&self, older_than: Duration) -> BlobResult<usize> {
        let mut removed = 0;
        for (name, path) in self.entries_older_than(older_than)? {
            if !name.starts_with(TEMP_PREFIX) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(BlobError::io("purge", name, e)),
            }
        }
        Ok(removed)
    }
}

/// Keys are plain, non-hidden file names.
fn validate_key(key: &str) -> BlobResult<()> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(BlobError::InvalidKey(key.to_string()))
    }
}
