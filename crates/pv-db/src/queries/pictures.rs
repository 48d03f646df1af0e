//! Picture metadata CRUD operations.
//!
//! Every mutation that reads before it writes runs inside an immediate
//! transaction, so concurrent callers on other connections serialize on
//! the database write lock instead of observing a half-applied change.

use chrono::Utc;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use pv_core::{Error, NewPicture, Picture, PictureId, Result, SessionId};

use crate::models::{picture_from_row, PICTURE_COLS};

fn begin_immediate(conn: &Connection) -> Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))
}

/// Insert a row and return it with its assigned id.
///
/// The id comes from the same statement that persists the row.
pub fn insert_picture(conn: &Connection, new: &NewPicture) -> Result<Picture> {
    let created_at = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO pictures (filename, blob_key, session_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            new.filename,
            new.blob_key,
            new.session_id.as_ref().map(|s| s.as_str()),
            created_at,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Picture {
        id: PictureId::from(conn.last_insert_rowid()),
        filename: new.filename.clone(),
        blob_key: new.blob_key.clone(),
        session_id: new.session_id.clone(),
        created_at,
    })
}

/// Get a picture by ID.
pub fn get_picture(conn: &Connection, id: PictureId) -> Result<Option<Picture>> {
    let q = format!("SELECT {PICTURE_COLS} FROM pictures WHERE id = ?1");
    match conn.query_row(&q, [id.get()], picture_from_row) {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get the most recently inserted picture.
pub fn get_latest(conn: &Connection) -> Result<Option<Picture>> {
    let q = format!("SELECT {PICTURE_COLS} FROM pictures ORDER BY id DESC LIMIT 1");
    match conn.query_row(&q, [], picture_from_row) {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List a session's pictures in insertion order.
pub fn list_by_session(conn: &Connection, session: &SessionId) -> Result<Vec<Picture>> {
    let q = format!("SELECT {PICTURE_COLS} FROM pictures WHERE session_id = ?1 ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([session.as_str()], picture_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// List every picture in insertion order.
pub fn list_all(conn: &Connection) -> Result<Vec<Picture>> {
    let q = format!("SELECT {PICTURE_COLS} FROM pictures ORDER BY id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([], picture_from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

/// Delete a picture by ID, returning the removed row.
pub fn delete_picture(conn: &Connection, id: PictureId) -> Result<Option<Picture>> {
    let tx = begin_immediate(conn)?;
    let Some(picture) = get_picture(&tx, id)? else {
        return Ok(None);
    };
    tx.execute("DELETE FROM pictures WHERE id = ?1", [id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(Some(picture))
}

/// Delete the most recently inserted picture, returning the removed row.
pub fn delete_latest(conn: &Connection) -> Result<Option<Picture>> {
    let tx = begin_immediate(conn)?;
    let Some(picture) = get_latest(&tx)? else {
        return Ok(None);
    };
    tx.execute("DELETE FROM pictures WHERE id = ?1", [picture.id.get()])
        .map_err(|e| Error::database(e.to_string()))?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(Some(picture))
}

/// Remove every row and insert `new` as one transaction.
///
/// Returns the inserted row and the rows it retired.
pub fn replace_all(conn: &Connection, new: &NewPicture) -> Result<(Picture, Vec<Picture>)> {
    let tx = begin_immediate(conn)?;
    let retired = list_all(&tx)?;
    tx.execute("DELETE FROM pictures", [])
        .map_err(|e| Error::database(e.to_string()))?;
    let inserted = insert_picture(&tx, new)?;
    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok((inserted, retired))
}

/// Every blob key referenced by a row.
pub fn list_blob_keys(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT blob_key FROM pictures")
        .map_err(|e| Error::database(e.to_string()))?;
    let keys = stmt
        .query_map([], |row| row.get(0))
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(keys)
}
