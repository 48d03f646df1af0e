//! Shared fixtures for pv-store integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pv_core::{Error, NewPicture, Picture, PictureId, Result, SessionId, StoreMode};
use pv_db::pool::{init_memory_pool, init_pool};
use pv_store::blob::{FilesystemBlobStore, MemoryBlobStore};
use pv_store::{BlobError, BlobResult, BlobStore, MetadataIndex, PictureStore, SqliteIndex};

/// Store over an in-memory index and an in-memory blob map.
pub fn memory_store(mode: StoreMode) -> (PictureStore, Arc<MemoryBlobStore>, Arc<SqliteIndex>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let index = Arc::new(SqliteIndex::new(init_memory_pool().expect("memory pool")));
    let store = PictureStore::new(mode, blobs.clone(), index.clone());
    (store, blobs, index)
}

/// Store over a file-backed index and a blob directory, both under `dir`.
pub fn disk_store(mode: StoreMode, dir: &Path) -> (PictureStore, Arc<FilesystemBlobStore>, Arc<SqliteIndex>) {
    let db_path = dir.join("pictures.db");
    let pool = init_pool(db_path.to_str().expect("utf-8 path")).expect("file pool");
    let blobs = Arc::new(FilesystemBlobStore::new(dir.join("blobs")));
    let index = Arc::new(SqliteIndex::new(pool));
    let store = PictureStore::new(mode, blobs.clone(), index.clone());
    (store, blobs, index)
}

pub fn session(s: &str) -> SessionId {
    s.parse().expect("valid session")
}

/// Assert that every row's blob exists and every stored blob has a row.
pub fn assert_no_orphans(blobs: &dyn BlobStore, index: &dyn MetadataIndex) {
    let mut referenced = index.blob_keys().expect("blob keys");
    for key in &referenced {
        assert!(blobs.read(key).is_ok(), "row references missing blob {key}");
    }
    let mut stored = blobs.list_keys(Duration::ZERO).expect("list keys");
    referenced.sort();
    stored.sort();
    assert_eq!(stored, referenced, "stored blobs and referenced keys differ");
}

/// Index double that delegates to an inner index but can be told to fail
/// inserts and replacements.
pub struct FlakyIndex {
    pub inner: SqliteIndex,
    pub fail_writes: AtomicBool,
}

impl FlakyIndex {
    pub fn new() -> Self {
        Self {
            inner: SqliteIndex::new(init_memory_pool().expect("memory pool")),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::backend(operation, "test", "index offline"))
        } else {
            Ok(())
        }
    }
}

impl MetadataIndex for FlakyIndex {
    fn insert(&self, record: &NewPicture) -> Result<Picture> {
        self.check("index.insert")?;
        self.inner.insert(record)
    }

    fn get(&self, id: PictureId) -> Result<Option<Picture>> {
        self.inner.get(id)
    }

    fn get_latest(&self) -> Result<Option<Picture>> {
        self.inner.get_latest()
    }

    fn list_by_session(&self, session: &SessionId) -> Result<Vec<Picture>> {
        self.inner.list_by_session(session)
    }

    fn list_all(&self) -> Result<Vec<Picture>> {
        self.inner.list_all()
    }

    fn delete(&self, id: PictureId) -> Result<Option<Picture>> {
        self.inner.delete(id)
    }

    fn delete_latest(&self) -> Result<Option<Picture>> {
        self.inner.delete_latest()
    }

    fn replace_all(&self, record: &NewPicture) -> Result<(Picture, Vec<Picture>)> {
        self.check("index.replace")?;
        self.inner.replace_all(record)
    }

    fn blob_keys(&self) -> Result<Vec<String>> {
        self.inner.blob_keys()
    }
}

/// Blob store double whose writes always fail.
pub struct BrokenBlobs;

impl BlobStore for BrokenBlobs {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn write(&self, _bytes: &[u8]) -> BlobResult<String> {
        Err(BlobError::Io {
            operation: "write",
            key: "new".into(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk offline"),
        })
    }

    fn read(&self, key: &str) -> BlobResult<Vec<u8>> {
        Err(BlobError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> BlobResult<()> {
        Err(BlobError::NotFound(key.to_string()))
    }

    fn list_keys(&self, _older_than: Duration) -> BlobResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Index double that, once armed, removes the row it just resolved along
/// with its blob, as a Delete committing right after a Get's lookup would.
pub struct RacyIndex {
    pub inner: SqliteIndex,
    blobs: Arc<dyn BlobStore>,
    evict_next: AtomicBool,
}

impl RacyIndex {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            inner: SqliteIndex::new(init_memory_pool().expect("memory pool")),
            blobs,
            evict_next: AtomicBool::new(false),
        }
    }

    pub fn evict_next_lookup(&self) {
        self.evict_next.store(true, Ordering::SeqCst);
    }

    fn after_lookup(&self, row: Option<Picture>) -> Result<Option<Picture>> {
        if let Some(picture) = &row {
            if self.evict_next.swap(false, Ordering::SeqCst) {
                self.inner.delete(picture.id)?;
                self.blobs.delete(&picture.blob_key).expect("evict blob");
            }
        }
        Ok(row)
    }
}

impl MetadataIndex for RacyIndex {
    fn insert(&self, record: &NewPicture) -> Result<Picture> {
        self.inner.insert(record)
    }

    fn get(&self, id: PictureId) -> Result<Option<Picture>> {
        let row = self.inner.get(id)?;
        self.after_lookup(row)
    }

    fn get_latest(&self) -> Result<Option<Picture>> {
        let row = self.inner.get_latest()?;
        self.after_lookup(row)
    }

    fn list_by_session(&self, session: &SessionId) -> Result<Vec<Picture>> {
        self.inner.list_by_session(session)
    }

    fn list_all(&self) -> Result<Vec<Picture>> {
        self.inner.list_all()
    }

    fn delete(&self, id: PictureId) -> Result<Option<Picture>> {
        self.inner.delete(id)
    }

    fn delete_latest(&self) -> Result<Option<Picture>> {
        self.inner.delete_latest()
    }

    fn replace_all(&self, record: &NewPicture) -> Result<(Picture, Vec<Picture>)> {
        self.inner.replace_all(record)
    }

    fn blob_keys(&self) -> Result<Vec<String>> {
        self.inner.blob_keys()
    }
}
