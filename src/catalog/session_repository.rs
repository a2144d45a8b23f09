use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use super::model::{ScanSession, ScanSessionStatus};

fn collect_rows<T, F>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    f: F,
) -> rusqlite::Result<Vec<T>>
where
    F: Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?;
    rows.collect()
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanSession> {
    let status_str: String = row.get("status")?;
    let source_root: String = row.get("source_root")?;
    Ok(ScanSession {
        id: row.get("id")?,
        source_root: source_root.into(),
        source_drive_uuid: row.get("source_drive_uuid")?,
        status: ScanSessionStatus::from_str(&status_str).unwrap_or(ScanSessionStatus::Failed),
        started_at_epoch: row.get("started_at_epoch")?,
        started_at_ymd: row.get("started_at_ymd")?,
        completed_at_epoch: row.get("completed_at_epoch")?,
        completed_at_ymd: row.get("completed_at_ymd")?,
        file_count: row.get("file_count")?,
        directory_count: row.get("directory_count")?,
        total_bytes: row.get("total_bytes")?,
        error_message: row.get("error_message")?,
    })
}

/// Find the existing session for a source root, if any, regardless of status.
pub fn find_by_root(conn: &Connection, source_root: &Path) -> rusqlite::Result<Option<ScanSession>> {
    let root_str = source_root.to_string_lossy().into_owned();
    conn.query_row(
        "SELECT * FROM scan_sessions WHERE source_root = ?1",
        params![root_str],
        row_to_session,
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, session_id: i64) -> rusqlite::Result<Option<ScanSession>> {
    conn.query_row(
        "SELECT * FROM scan_sessions WHERE id = ?1",
        params![session_id],
        row_to_session,
    )
    .optional()
}

/// Delete any existing session for this root (cascades files/completed_directories)
/// and insert a fresh `running` row. Used both for "start fresh" and for
/// replacing a previously `completed` session (spec §4.1 precondition).
pub fn create_fresh(
    conn: &Connection,
    source_root: &Path,
    source_drive_uuid: &str,
    started_at_epoch: f64,
    started_at_ymd: i64,
) -> rusqlite::Result<i64> {
    let root_str = source_root.to_string_lossy().into_owned();
    conn.execute(
        "DELETE FROM scan_sessions WHERE source_root = ?1",
        params![root_str],
    )?;
    conn.execute(
        "INSERT INTO scan_sessions (source_root, source_drive_uuid, status, started_at_epoch, started_at_ymd)
         VALUES (?1, ?2, 'running', ?3, ?4)",
        params![root_str, source_drive_uuid, started_at_epoch, started_at_ymd],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn mark_completed(
    conn: &Connection,
    session_id: i64,
    completed_at_epoch: f64,
    completed_at_ymd: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scan_sessions SET status = 'completed', completed_at_epoch = ?1, completed_at_ymd = ?2
         WHERE id = ?3",
        params![completed_at_epoch, completed_at_ymd, session_id],
    )?;
    Ok(())
}

pub fn mark_interrupted(conn: &Connection, session_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scan_sessions SET status = 'interrupted' WHERE id = ?1",
        params![session_id],
    )?;
    Ok(())
}

pub fn mark_failed(conn: &Connection, session_id: i64, error_message: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scan_sessions SET status = 'failed', error_message = ?1 WHERE id = ?2",
        params![error_message, session_id],
    )?;
    Ok(())
}

/// Add to the session's running counters (one call per committed directory).
pub fn bump_counters(
    conn: &Connection,
    session_id: i64,
    file_delta: i64,
    directory_delta: i64,
    bytes_delta: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE scan_sessions
         SET file_count = file_count + ?1, directory_count = directory_count + ?2, total_bytes = total_bytes + ?3
         WHERE id = ?4",
        params![file_delta, directory_delta, bytes_delta, session_id],
    )?;
    Ok(())
}

pub fn insert_completed_directory(
    conn: &Connection,
    session_id: i64,
    directory_path: &str,
    file_count: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO completed_directories (scan_session_id, directory_path, file_count)
         VALUES (?1, ?2, ?3)",
        params![session_id, directory_path, file_count],
    )?;
    Ok(())
}

/// All directory paths already committed for this session, for resume.
pub fn completed_directory_set(
    conn: &Connection,
    session_id: i64,
) -> rusqlite::Result<HashSet<String>> {
    let rows = collect_rows(
        conn,
        "SELECT directory_path FROM completed_directories WHERE scan_session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    Ok(rows.into_iter().collect())
}

/// Delete any rows in `files` under `directory_path` that were not covered by
/// a completed-directory commit (partial directory from a prior interrupted run).
pub fn delete_partial_directory(
    conn: &Connection,
    session_id: i64,
    directory_path: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM files WHERE scan_session_id = ?1 AND directory_path = ?2",
        params![session_id, directory_path],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use std::path::PathBuf;

    #[test]
    fn test_create_fresh_then_find_by_root() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/mnt/archive");
        let id = create_fresh(&conn, &root, "uuid-1", 100.0, 20240101).unwrap();
        let found = find_by_root(&conn, &root).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.status, ScanSessionStatus::Running);
        assert_eq!(found.source_drive_uuid, "uuid-1");
    }

    #[test]
    fn test_create_fresh_replaces_prior_session() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/mnt/archive");
        let first_id = create_fresh(&conn, &root, "uuid-1", 0.0, 20240101).unwrap();
        mark_completed(&conn, first_id, 10.0, 20240101).unwrap();
        let second_id = create_fresh(&conn, &root, "uuid-2", 20.0, 20240102).unwrap();
        assert_ne!(first_id, second_id);
        let found = find_by_root(&conn, &root).unwrap().unwrap();
        assert_eq!(found.id, second_id);
        assert_eq!(found.source_drive_uuid, "uuid-2");
    }

    #[test]
    fn test_completed_directory_set_and_bump_counters() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/mnt/archive");
        let id = create_fresh(&conn, &root, "uuid-1", 0.0, 20240101).unwrap();
        insert_completed_directory(&conn, id, "", 2).unwrap();
        insert_completed_directory(&conn, id, "sub", 3).unwrap();
        bump_counters(&conn, id, 5, 2, 1024).unwrap();

        let set = completed_directory_set(&conn, id).unwrap();
        assert!(set.contains(""));
        assert!(set.contains("sub"));

        let found = find_by_root(&conn, &root).unwrap().unwrap();
        assert_eq!(found.file_count, 5);
        assert_eq!(found.directory_count, 2);
        assert_eq!(found.total_bytes, 1024);
    }

    #[test]
    fn test_mark_failed_sets_status_and_message() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/mnt/archive");
        let id = create_fresh(&conn, &root, "uuid-1", 0.0, 20240101).unwrap();
        mark_failed(&conn, id, "catalog write failed").unwrap();
        let found = find_by_root(&conn, &root).unwrap().unwrap();
        assert_eq!(found.status, ScanSessionStatus::Failed);
        assert_eq!(found.error_message.as_deref(), Some("catalog write failed"));
    }
}
