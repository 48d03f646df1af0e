//! Row mapping for database tables.
//!
//! The domain types live in `pv-core`; this module knows how to build them
//! from a `rusqlite::Row` selected with [`PICTURE_COLS`].

use pv_core::{Picture, PictureId, SessionId};

/// Column list matching [`picture_from_row`].
pub const PICTURE_COLS: &str = "id, filename, blob_key, session_id, created_at";

/// Parse a session token from a nullable text column.
fn parse_opt_session(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<SessionId>> {
    let s: Option<String> = row.get(idx)?;
    match s {
        Some(v) => {
            let session = v.parse::<SessionId>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Build a [`Picture`] from a row selected with [`PICTURE_COLS`].
pub fn picture_from_row(row: &rusqlite::Row) -> rusqlite::Result<Picture> {
    Ok(Picture {
        id: PictureId::from(row.get::<_, i64>(0)?),
        filename: row.get(1)?,
        blob_key: row.get(2)?,
        session_id: parse_opt_session(row, 3)?,
        created_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn maps_row_with_and_without_session() {
        let conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO pictures (filename, blob_key, session_id, created_at)
             VALUES ('a.jpg', 'k1', NULL, 't1'), ('b.png', 'k2', 's1', 't2');",
        )
        .unwrap();

        let q = format!("SELECT {PICTURE_COLS} FROM pictures ORDER BY id");
        let mut stmt = conn.prepare(&q).unwrap();
        let rows: Vec<Picture> = stmt
            .query_map([], picture_from_row)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].filename, "a.jpg");
        assert!(rows[0].session_id.is_none());
        assert_eq!(rows[1].session_id.as_ref().map(|s| s.as_str()), Some("s1"));
        assert!(rows[0].id < rows[1].id);
    }

    #[test]
    fn invalid_session_text_is_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO pictures (filename, blob_key, session_id, created_at)
             VALUES ('a.jpg', 'k1', 'bad token!', 't')",
            [],
        )
        .unwrap();
        let q = format!("SELECT {PICTURE_COLS} FROM pictures");
        let result = conn.query_row(&q, [], picture_from_row);
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(3, _, _))
        ));
    }
}
