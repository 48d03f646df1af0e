//! Metadata index: picture identity to blob key.
//!
//! [`MetadataIndex`] is the seam [`crate::PictureStore`] talks to;
//! [`SqliteIndex`] implements it over the `pv-db` pool. Every failure is
//! reported as [`Error::BackendUnavailable`] tagged with the operation and
//! the id or key it addressed.

use pv_core::{Error, NewPicture, Picture, PictureId, Result, SessionId};
use pv_db::pool::{get_conn, DbPool, PooledConnection};
use pv_db::queries::pictures;

/// Relational index of stored pictures.
pub trait MetadataIndex: Send + Sync {
    /// Persist a row, assigning its id in the same operation.
    fn insert(&self, record: &NewPicture) -> Result<Picture>;

    fn get(&self, id: PictureId) -> Result<Option<Picture>>;

    /// The most recently inserted row.
    fn get_latest(&self) -> Result<Option<Picture>>;

    /// A session's rows in insertion order.
    fn list_by_session(&self, session: &SessionId) -> Result<Vec<Picture>>;

    /// Every row in insertion order.
    fn list_all(&self) -> Result<Vec<Picture>>;

    /// Fetch-then-remove a row, returning it so its blob can be reclaimed.
    fn delete(&self, id: PictureId) -> Result<Option<Picture>>;

    /// Fetch-then-remove the most recently inserted row.
    fn delete_latest(&self) -> Result<Option<Picture>>;

    /// Remove every row and insert `record` as one atomic unit. Returns the
    /// inserted row and the retired ones.
    fn replace_all(&self, record: &NewPicture) -> Result<(Picture, Vec<Picture>)>;

    /// Every blob key referenced by a row.
    fn blob_keys(&self) -> Result<Vec<String>>;
}

/// [`MetadataIndex`] backed by the SQLite `pictures` table.
#[derive(Clone)]
pub struct SqliteIndex {
    pool: DbPool,
}

impl SqliteIndex {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self, operation: &str, key: impl std::fmt::Display) -> Result<PooledConnection> {
        get_conn(&self.pool).map_err(|e| Error::backend(operation, key, e))
    }
}

impl MetadataIndex for SqliteIndex {
    fn insert(&self, record: &NewPicture) -> Result<Picture> {
        let conn = self.conn("index.insert", &record.filename)?;
        pictures::insert_picture(&conn, record)
            .map_err(|e| Error::backend("index.insert", &record.filename, e))
    }

    fn get(&self, id: PictureId) -> Result<Option<Picture>> {
        let conn = self.conn("index.get", id)?;
        pictures::get_picture(&conn, id).map_err(|e| Error::backend("index.get", id, e))
    }

    fn get_latest(&self) -> Result<Option<Picture>> {
        let conn = self.conn("index.get_latest", "latest")?;
        pictures::get_latest(&conn).map_err(|e| Error::backend("index.get_latest", "latest", e))
    }

    fn list_by_session(&self, session: &SessionId) -> Result<Vec<Picture>> {
        let conn = self.conn("index.list", session)?;
        pictures::list_by_session(&conn, session)
            .map_err(|e| Error::backend("index.list", session, e))
    }

    fn list_all(&self) -> Result<Vec<Picture>> {
        let conn = self.conn("index.list", "*")?;
        pictures::list_all(&conn).map_err(|e| Error::backend("index.list", "*", e))
    }

    fn delete(&self, id: PictureId) -> Result<Option<Picture>> {
        let conn = self.conn("index.delete", id)?;
        pictures::delete_picture(&conn, id).map_err(|e| Error::backend("index.delete", id, e))
    }

    fn delete_latest(&self) -> Result<Option<Picture>> {
        let conn = self.conn("index.delete", "latest")?;
        pictures::delete_latest(&conn).map_err(|e| Error::backend("index.delete", "latest", e))
    }

    fn replace_all(&self, record: &NewPicture) -> Result<(Picture, Vec<Picture>)> {
        let conn = self.conn("index.replace", &record.filename)?;
        pictures::replace_all(&conn, record)
            .map_err(|e| Error::backend("index.replace", &record.filename, e))
    }

    fn blob_keys(&self) -> Result<Vec<String>> {
        let conn = self.conn("index.blob_keys", "*")?;
        pictures::list_blob_keys(&conn).map_err(|e| Error::backend("index.blob_keys", "*", e))
    }
}
