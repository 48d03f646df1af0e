//! Picture store coordinating blob storage and metadata records.
//!
//! Ordering rules per operation:
//!
//! - **Put (sequential/session):** write blob, then insert row. If the insert
//!   fails the fresh blob is deleted before the error is returned.
//! - **Put (singleton):** write blob, then atomically replace every row with
//!   the new one, then delete the retired blobs. A failed retired-blob delete
//!   is logged and tolerated.
//! - **Get:** resolve row, then read blob. If the blob is gone, the row is
//!   resolved again: a row removed in the meantime is a plain not-found (or,
//!   for `latest`, one more attempt), while a row that still points at the
//!   missing blob is an [`Error::StorageInconsistency`].
//! - **Delete:** fetch-and-remove the row, then delete its blob.
//!
//! A crash between the two steps of any operation can at worst leave an
//! unreferenced blob behind, which [`PictureStore::sweep`] reclaims.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use pv_core::{
    Error, NewPicture, Picture, PictureRef, PictureSummary, Result, SessionId, StoreMode,
};

use crate::blob::{BlobError, BlobStore};
use crate::index::MetadataIndex;

/// An upload as decoded by the transport layer.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub filename: String,
    pub session_id: Option<SessionId>,
    pub bytes: Vec<u8>,
}

impl PutRequest {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            session_id: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session_id = Some(session);
        self
    }
}

/// A picture together with its bytes.
#[derive(Debug, Clone)]
pub struct StoredPicture {
    pub picture: Picture,
    pub bytes: Vec<u8>,
}

impl StoredPicture {
    pub fn content_type(&self) -> &'static str {
        self.picture.content_type()
    }
}

/// Outcome of an out-of-band orphan sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Blobs old enough to be considered.
    pub scanned: usize,
    /// Unreferenced blobs found (and removed unless dry-run).
    pub orphans: Vec<String>,
    /// Leftovers of aborted writes removed.
    pub partials_removed: usize,
}

/// High-level picture store over a [`BlobStore`] and a [`MetadataIndex`].
#[derive(Clone)]
pub struct PictureStore {
    mode: StoreMode,
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn MetadataIndex>,
}

impl PictureStore {
    /// Create a new `PictureStore`.
    ///
    /// # Arguments
    ///
    /// * `mode` - How pictures are keyed
    /// * `blobs` - Where picture bytes live
    /// * `index` - Where picture rows live
    pub fn new(mode: StoreMode, blobs: Arc<dyn BlobStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self { mode, blobs, index }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub fn blob_backend(&self) -> &'static str {
        self.blobs.name()
    }

    /// Store a new picture.
    ///
    /// In singleton mode the new picture atomically replaces whatever was
    /// stored before. In session mode `session_id` is required; in the other
    /// modes it is ignored.
    ///
    /// # Returns
    ///
    /// The stored [`Picture`] with its assigned id.
    pub fn put(&self, request: PutRequest) -> Result<Picture> {
        let filename = display_name(&request.filename)?;
        if request.bytes.is_empty() {
            return Err(Error::invalid("picture payload is empty"));
        }

        let session_id = match request.session_id {
            None if self.mode.requires_session() => {
                return Err(Error::invalid("a session id is required in session mode"));
            }
            Some(session) if !self.mode.requires_session() => {
                tracing::debug!(mode = %self.mode, %session, "Ignoring session outside session mode");
                None
            }
            session => session,
        };

        let blob_key = self
            .blobs
            .write(&request.bytes)
            .map_err(|e| blob_failure("blob.write", &filename, e))?;

        let record = NewPicture {
            filename,
            blob_key,
            session_id,
        };

        let picture = match self.mode {
            StoreMode::Singleton => self.commit_singleton(&record)?,
            StoreMode::Sequential | StoreMode::Session => self
                .index
                .insert(&record)
                .inspect_err(|_| self.discard_blob(&record.blob_key))?,
        };

        tracing::info!(
            id = %picture.id,
            filename = %picture.filename,
            size = request.bytes.len(),
            mode = %self.mode,
            "Picture stored"
        );
        Ok(picture)
    }

    fn commit_singleton(&self, record: &NewPicture) -> Result<Picture> {
        let (picture, retired) = self
            .index
            .replace_all(record)
            .inspect_err(|_| self.discard_blob(&record.blob_key))?;

        for old in retired {
            match self.blobs.delete(&old.blob_key) {
                Ok(()) => tracing::debug!(id = %old.id, "Retired previous picture"),
                Err(BlobError::NotFound(_)) => {
                    tracing::warn!(id = %old.id, "Retired picture had no blob");
                }
                Err(e) => {
                    tracing::warn!(id = %old.id, error = %e, "Failed to remove retired blob; leaving it for sweep");
                }
            }
        }
        Ok(picture)
    }

    /// Best-effort removal of a blob whose row was never committed.
    fn discard_blob(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key) {
            tracing::warn!(error = %e, "Failed to discard uncommitted blob; leaving it for sweep");
        }
    }

    /// Fetch a picture and its bytes.
    ///
    /// A picture deleted or replaced between resolving its row and reading
    /// its blob is reported as not found, never as an inconsistency.
    pub fn get(&self, target: PictureRef) -> Result<StoredPicture> {
        let mut picture = self.resolve(target)?;
        let mut retried = false;
        loop {
            match self.blobs.read(&picture.blob_key) {
                Ok(bytes) => return Ok(StoredPicture { picture, bytes }),
                Err(BlobError::NotFound(_)) => {
                    let current = self.index.get(picture.id)?;
                    if current.is_some_and(|row| row.blob_key == picture.blob_key) {
                        return Err(self.inconsistent(&picture));
                    }
                    tracing::debug!(id = %picture.id, "Picture removed while being read");
                    if target != PictureRef::Latest || retried {
                        return Err(Error::not_found("picture", target));
                    }
                    retried = true;
                    picture = self.resolve(target)?;
                }
                Err(BlobError::InvalidKey(_) | BlobError::Corrupt { .. }) => {
                    return Err(self.inconsistent(&picture));
                }
                Err(e) => return Err(blob_failure("blob.read", picture.id, e)),
            }
        }
    }

    fn inconsistent(&self, picture: &Picture) -> Error {
        tracing::error!(
            id = %picture.id,
            backend = self.blobs.name(),
            "Picture row references a missing or unreadable blob"
        );
        Error::inconsistency(picture.id, short_key(&picture.blob_key))
    }

    /// Fetch a picture's metadata without its bytes.
    pub fn resolve(&self, target: PictureRef) -> Result<Picture> {
        let row = match target {
            PictureRef::Latest => self.index.get_latest()?,
            PictureRef::Id(id) => self.index.get(id)?,
        };
        row.ok_or_else(|| Error::not_found("picture", target))
    }

    /// List pictures without their bytes, in insertion order.
    ///
    /// Session mode requires `session` and lists only that gallery; the
    /// other modes list everything and ignore `session`.
    pub fn list(&self, session: Option<&SessionId>) -> Result<Vec<PictureSummary>> {
        let rows = match session {
            _ if !self.mode.requires_session() => self.index.list_all()?,
            Some(session) => self.index.list_by_session(session)?,
            None => {
                return Err(Error::invalid("a session id is required in session mode"));
            }
        };
        Ok(rows.iter().map(Picture::summary).collect())
    }

    /// Delete a picture.
    ///
    /// Succeeds once the row is gone, whether or not the blob was still
    /// present.
    ///
    /// # Returns
    ///
    /// The removed [`Picture`].
    pub fn delete(&self, target: PictureRef) -> Result<Picture> {
        let removed = match target {
            PictureRef::Latest => self.index.delete_latest()?,
            PictureRef::Id(id) => self.index.delete(id)?,
        };
        let picture = removed.ok_or_else(|| Error::not_found("picture", target))?;

        match self.blobs.delete(&picture.blob_key) {
            Ok(()) => {}
            Err(BlobError::NotFound(_)) => {
                tracing::warn!(id = %picture.id, "Deleted picture had no blob");
            }
            Err(e) => {
                tracing::warn!(id = %picture.id, error = %e, "Failed to remove blob of deleted picture; leaving it for sweep");
            }
        }

        tracing::info!(id = %picture.id, filename = %picture.filename, "Picture deleted");
        Ok(picture)
    }

    /// Reclaim blobs that no row references.
    ///
    /// Only blobs last modified more than `grace` ago are considered, so an
    /// upload between its blob write and its row insert is left alone.
    pub fn sweep(&self, grace: Duration, dry_run: bool) -> Result<SweepReport> {
        let candidates = self
            .blobs
            .list_keys(grace)
            .map_err(|e| blob_failure("blob.list", "*", e))?;
        let referenced: HashSet<String> = self.index.blob_keys()?.into_iter().collect();

        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for key in candidates {
            if referenced.contains(&key) {
                continue;
            }
            if !dry_run {
                match self.blobs.delete(&key) {
                    Ok(()) | Err(BlobError::NotFound(_)) => {}
                    Err(e) => return Err(blob_failure("blob.delete", &key, e)),
                }
            }
            report.orphans.push(key);
        }

        if !dry_run {
            report.partials_removed = self
                .blobs
                .purge_partial(grace)
                .map_err(|e| blob_failure("blob.purge", "*", e))?;
        }

        tracing::info!(
            scanned = report.scanned,
            orphans = report.orphans.len(),
            partials = report.partials_removed,
            dry_run,
            "Sweep finished"
        );
        Ok(report)
    }
}

/// Reduce a client filename to its final path component.
fn display_name(raw: &str) -> Result<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(Error::invalid("filename is empty"));
    }
    Ok(name.to_string())
}

fn blob_failure(operation: &str, key: impl std::fmt::Display, err: BlobError) -> Error {
    Error::backend(operation, key, err)
}

/// Inline keys embed the whole picture; never put one in an error message.
fn short_key(key: &str) -> String {
    if key.len() > 64 {
        format!("{}...", &key[..key.char_indices().nth(64).map_or(key.len(), |(i, _)| i)])
    } else {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobStore;
    use crate::index::SqliteIndex;
    use pv_db::pool::init_memory_pool;

    fn store(mode: StoreMode) -> (PictureStore, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        let index = Arc::new(SqliteIndex::new(init_memory_pool().unwrap()));
        (PictureStore::new(mode, blobs.clone(), index), blobs)
    }

    #[test]
    fn display_name_strips_directories() {
        assert_eq!(display_name("a.jpg").unwrap(), "a.jpg");
        assert_eq!(display_name("../../etc/a.jpg").unwrap(), "a.jpg");
        assert_eq!(display_name("C:\\photos\\b.png").unwrap(), "b.png");
        assert!(display_name("").is_err());
        assert!(display_name("   ").is_err());
        assert!(display_name("dir/").is_err());
    }

    #[test]
    fn short_key_truncates() {
        assert_eq!(short_key("abc"), "abc");
        let long = "x".repeat(200);
        assert_eq!(short_key(&long).len(), 67);
    }

    #[test]
    fn put_get_roundtrip() {
        let (store, _) = store(StoreMode::Sequential);
        let pic = store.put(PutRequest::new("a.png", b"png bytes".to_vec())).unwrap();
        let got = store.get(pic.id.into()).unwrap();
        assert_eq!(got.bytes, b"png bytes");
        assert_eq!(got.content_type(), "image/png");
        assert_eq!(got.picture, pic);
    }

    #[test]
    fn empty_payload_is_rejected_before_any_write() {
        let (store, blobs) = store(StoreMode::Sequential);
        let err = store.put(PutRequest::new("a.jpg", Vec::new())).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(blobs.is_empty());
        assert!(store.list(None).unwrap().is_empty());
    }

    #[test]
    fn empty_filename_is_rejected() {
        let (store, blobs) = store(StoreMode::Sequential);
        let err = store.put(PutRequest::new("", b"x".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(blobs.is_empty());
    }

    #[test]
    fn session_mode_requires_session() {
        let (store, blobs) = store(StoreMode::Session);
        let err = store.put(PutRequest::new("a.jpg", b"x".to_vec())).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(blobs.is_empty());
        assert!(matches!(store.list(None), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn session_ignored_outside_session_mode() {
        let (store, _) = store(StoreMode::Sequential);
        let pic = store
            .put(PutRequest::new("a.jpg", b"x".to_vec()).with_session("s1".parse().unwrap()))
            .unwrap();
        assert!(pic.session_id.is_none());
    }

    #[test]
    fn missing_blob_is_inconsistency() {
        let (store, blobs) = store(StoreMode::Sequential);
        let pic = store.put(PutRequest::new("a.jpg", b"x".to_vec())).unwrap();
        blobs.delete(&pic.blob_key).unwrap();

        let err = store.get(pic.id.into()).unwrap_err();
        assert!(matches!(err, Error::StorageInconsistency { .. }));
    }

    #[test]
    fn delete_tolerates_missing_blob() {
        let (store, blobs) = store(StoreMode::Sequential);
        let pic = store.put(PutRequest::new("a.jpg", b"x".to_vec())).unwrap();
        blobs.delete(&pic.blob_key).unwrap();

        let removed = store.delete(pic.id.into()).unwrap();
        assert_eq!(removed.id, pic.id);
        assert!(matches!(
            store.delete(pic.id.into()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn latest_on_empty_store_is_not_found() {
        let (store, _) = store(StoreMode::Singleton);
        assert!(matches!(
            store.get(PictureRef::Latest),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(PictureRef::Latest),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn singleton_replaces_previous_picture() {
        let (store, blobs) = store(StoreMode::Singleton);
        let a = store.put(PutRequest::new("a.jpg", b"A".to_vec())).unwrap();
        let b = store.put(PutRequest::new("b.jpg", b"B".to_vec())).unwrap();

        assert_eq!(store.get(PictureRef::Latest).unwrap().bytes, b"B");
        assert_eq!(store.list(None).unwrap(), vec![b.summary()]);
        assert!(!blobs.contains(&a.blob_key));
        assert_eq!(blobs.len(), 1);
    }

    #[test]
    fn sweep_reclaims_unreferenced_blobs() {
        let (store, blobs) = store(StoreMode::Sequential);
        let kept = store.put(PutRequest::new("a.jpg", b"x".to_vec())).unwrap();
        let orphan = blobs.write(b"stray").unwrap();

        let dry = store.sweep(Duration::ZERO, true).unwrap();
        assert_eq!(dry.orphans, vec![orphan.clone()]);
        assert!(blobs.contains(&orphan));

        let report = store.sweep(Duration::ZERO, false).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.orphans, vec![orphan.clone()]);
        assert!(!blobs.contains(&orphan));
        assert!(blobs.contains(&kept.blob_key));
    }

    #[test]
    fn sweep_spares_blobs_inside_grace_period() {
        let (store, blobs) = store(StoreMode::Sequential);
        let in_flight = blobs.write(b"not yet indexed").unwrap();

        let report = store.sweep(Duration::from_secs(3600), false).unwrap();
        assert_eq!(report.scanned, 0);
        assert!(report.orphans.is_empty());
        assert!(blobs.contains(&in_flight));
    }
}
