use std::path::Path;

use rusqlite::Connection;

use crate::error::PhotodexError;

/// Open (or create) the catalog database at `path` and apply the pragmas
/// this crate relies on: WAL for crash-safe resumability, a busy timeout so
/// a stray reader never produces `SQLITE_BUSY`, and foreign keys on so the
/// cascade-delete invariants in the schema are actually enforced.
pub fn open_connection(path: &Path) -> Result<Connection, PhotodexError> {
    let conn = Connection::open(path).map_err(PhotodexError::CatalogWrite)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(PhotodexError::CatalogWrite)?;
    Ok(conn)
}

/// Open an in-memory database, for tests. Foreign keys still enforced.
pub fn open_in_memory() -> Result<Connection, PhotodexError> {
    let conn = Connection::open_in_memory().map_err(PhotodexError::CatalogWrite)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(PhotodexError::CatalogWrite)?;
    Ok(conn)
}
