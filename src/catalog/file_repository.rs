use rusqlite::{params, Connection};

use super::model::{NewFile, PathDateSignals, PlanningFileRow};
use crate::config::MetadataSelectionStrategy;

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

/// Insert one file row within the caller's directory-commit transaction.
pub fn insert_file(
    conn: &Connection,
    session_id: i64,
    file: &NewFile,
    scanned_at_epoch: f64,
    scanned_at_ymd: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO files (
            scan_session_id, source_path, directory_path, filename_full, filename_base,
            extension, size, mtime_epoch, mtime_ymd, ctime_epoch, ctime_ymd,
            birthtime_epoch, birthtime_ymd, atime_epoch, atime_ymd,
            scanned_at_epoch, scanned_at_ymd
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
        params![
            session_id,
            file.source_path,
            file.directory_path,
            file.filename_full,
            file.filename_base,
            file.extension,
            file.size,
            file.mtime_epoch,
            file.mtime_ymd,
            file.ctime_epoch,
            file.ctime_ymd,
            file.birthtime_epoch,
            file.birthtime_ymd,
            file.atime_epoch,
            file.atime_ymd,
            scanned_at_epoch,
            scanned_at_ymd,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Write the three path-date signals onto a file row (PathDateExtractor §4.2).
/// Idempotent: reruns overwrite with identical results on identical input.
pub fn update_path_dates(
    conn: &Connection,
    file_id: i64,
    signals: &PathDateSignals,
) -> rusqlite::Result<()> {
    let (h_date, h_src) = signals
        .hierarchy
        .as_ref()
        .map(|(d, s)| (Some(*d), Some(s.clone())))
        .unwrap_or((None, None));
    let (f_date, f_src) = signals
        .folder
        .as_ref()
        .map(|(d, s)| (Some(*d), Some(s.clone())))
        .unwrap_or((None, None));
    let (n_date, n_src) = signals
        .filename
        .as_ref()
        .map(|(d, s)| (Some(*d), Some(s.clone())))
        .unwrap_or((None, None));

    conn.execute(
        "UPDATE files SET
            date_path_hierarchy = ?1, date_path_hierarchy_source = ?2,
            date_path_folder = ?3, date_path_folder_source = ?4,
            date_path_filename = ?5, date_path_filename_source = ?6
         WHERE id = ?7",
        params![h_date, h_src, f_date, f_src, n_date, n_src, file_id],
    )?;
    Ok(())
}

/// All files for a session, for PathDateExtractor traversal. Byte-ordering is
/// not required at this stage (each file's date derives solely from its own
/// path), so a plain id-ascending scan is sufficient.
pub fn list_all_for_session(
    conn: &Connection,
    session_id: i64,
) -> rusqlite::Result<Vec<(i64, String)>> {
    collect_rows(
        conn,
        "SELECT id, source_path FROM files WHERE scan_session_id = ?1 ORDER BY id ASC",
        params![session_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

/// `(id, directory_path, filename_full)` for every file in a session, the
/// inputs PathDateExtractor needs for its three strategies.
pub fn list_path_components_for_session(
    conn: &Connection,
    session_id: i64,
) -> rusqlite::Result<Vec<(i64, String, String)>> {
    collect_rows(
        conn,
        "SELECT id, directory_path, filename_full FROM files WHERE scan_session_id = ?1 ORDER BY id ASC",
        params![session_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
}

/// Files selected for metadata extraction under the given strategy (spec §4.3).
/// `full`: supported extension, no existing `file_metadata` row.
/// `selective`: as `full`, plus no `date_path_folder` and no `date_path_filename`.
pub fn select_for_metadata_extraction(
    conn: &Connection,
    session_id: i64,
    strategy: MetadataSelectionStrategy,
    supported_extensions: &[&str],
    limit: Option<usize>,
) -> rusqlite::Result<Vec<(i64, String, i64)>> {
    let placeholders: String = supported_extensions
        .iter()
        .map(|_| "?")
        .collect::<Vec<_>>()
        .join(",");
    let mut sql = format!(
        "SELECT f.id, f.source_path, f.size FROM files f
         WHERE f.scan_session_id = ? AND f.extension IN ({})
           AND NOT EXISTS (SELECT 1 FROM file_metadata m WHERE m.file_id = f.id)",
        placeholders
    );
    if strategy == MetadataSelectionStrategy::Selective {
        sql.push_str(" AND f.date_path_folder IS NULL AND f.date_path_filename IS NULL");
    }
    sql.push_str(" ORDER BY f.id ASC");
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut bind: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(session_id)];
    for ext in supported_extensions {
        bind.push(Box::new(ext.to_string()));
    }
    let bind_refs: Vec<&dyn rusqlite::ToSql> = bind.iter().map(|b| b.as_ref()).collect();
    let rows = stmt.query_map(bind_refs.as_slice(), |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
    })?;
    rows.collect()
}

/// All distinct directory paths for a session's files plus any directory
/// recorded in `completed_directories` (covers empty directories), for Planner
/// folder resolution, ordered so ascending depth (separator count) comes first.
pub fn distinct_directory_paths(conn: &Connection, session_id: i64) -> rusqlite::Result<Vec<String>> {
    let mut dirs: Vec<String> = collect_rows(
        conn,
        "SELECT DISTINCT directory_path FROM files WHERE scan_session_id = ?1
         UNION
         SELECT DISTINCT directory_path FROM completed_directories WHERE scan_session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?;
    dirs.sort_by(|a, b| {
        let depth_a = a.matches('/').count();
        let depth_b = b.matches('/').count();
        depth_a.cmp(&depth_b).then_with(|| a.as_bytes().cmp(b.as_bytes()))
    });
    Ok(dirs)
}

/// Files directly within one source folder, with the inputs the Planner needs.
pub fn files_in_folder(
    conn: &Connection,
    session_id: i64,
    directory_path: &str,
) -> rusqlite::Result<Vec<PlanningFileRow>> {
    collect_rows(
        conn,
        "SELECT f.id, f.source_path, f.directory_path, f.filename_full, f.extension,
                f.date_path_folder, f.date_path_folder_source, f.date_path_filename,
                m.date_original_ymd, f.mtime_epoch
         FROM files f
         LEFT JOIN file_metadata m ON m.file_id = f.id
         WHERE f.scan_session_id = ?1 AND f.directory_path = ?2
         ORDER BY f.filename_full ASC",
        params![session_id, directory_path],
        |row| {
            Ok(PlanningFileRow {
                id: row.get(0)?,
                source_path: row.get(1)?,
                directory_path: row.get(2)?,
                filename_full: row.get(3)?,
                extension: row.get(4)?,
                date_path_folder: row.get(5)?,
                date_path_folder_source: row.get(6)?,
                date_path_filename: row.get(7)?,
                metadata_date_original_ymd: row.get(8)?,
                mtime_epoch: row.get(9)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::session_repository::create_fresh;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use std::path::PathBuf;

    fn sample_file(source_path: &str, directory_path: &str, filename: &str) -> NewFile {
        NewFile {
            source_path: source_path.to_string(),
            directory_path: directory_path.to_string(),
            filename_full: filename.to_string(),
            filename_base: filename.trim_end_matches(".jpg").to_string(),
            extension: Some("jpg".to_string()),
            size: 20_000,
            mtime_epoch: Some(0.0),
            mtime_ymd: Some(20240101),
            ctime_epoch: None,
            ctime_ymd: None,
            birthtime_epoch: None,
            birthtime_ymd: None,
            atime_epoch: None,
            atime_ymd: None,
        }
    }

    #[test]
    fn test_insert_and_update_path_dates_round_trip() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/root"), "uuid", 0.0, 20240101).unwrap();
        let file_id = insert_file(
            &conn,
            session_id,
            &sample_file("a/b.jpg", "a", "b.jpg"),
            0.0,
            20240101,
        )
        .unwrap();

        let signals = PathDateSignals {
            hierarchy: None,
            folder: Some((20230514, "2023_05_14".to_string())),
            filename: None,
        };
        update_path_dates(&conn, file_id, &signals).unwrap();

        let rows = files_in_folder(&conn, session_id, "a").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_path_folder, Some(20230514));
        assert_eq!(rows[0].date_path_filename, None);
    }

    #[test]
    fn test_select_for_metadata_extraction_excludes_existing_rows() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/root"), "uuid", 0.0, 20240101).unwrap();
        let f1 = insert_file(&conn, session_id, &sample_file("a/1.jpg", "a", "1.jpg"), 0.0, 20240101).unwrap();
        let _f2 = insert_file(&conn, session_id, &sample_file("a/2.jpg", "a", "2.jpg"), 0.0, 20240101).unwrap();

        conn.execute(
            "INSERT INTO file_metadata (file_id, extracted_at_epoch, extracted_at_ymd, extractor_version)
             VALUES (?1, 0.0, 20240101, 'v1')",
            params![f1],
        )
        .unwrap();

        let selected = select_for_metadata_extraction(
            &conn,
            session_id,
            MetadataSelectionStrategy::Full,
            &["jpg", "jpeg"],
            None,
        )
        .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].1, "a/2.jpg");
    }

    #[test]
    fn test_distinct_directory_paths_orders_by_depth_then_path() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/root"), "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &sample_file("b/1.jpg", "b", "1.jpg"), 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &sample_file("a/sub/1.jpg", "a/sub", "1.jpg"), 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &sample_file("1.jpg", "", "1.jpg"), 0.0, 20240101).unwrap();

        let dirs = distinct_directory_paths(&conn, session_id).unwrap();
        assert_eq!(dirs, vec!["".to_string(), "b".to_string(), "a/sub".to_string()]);
    }
}
