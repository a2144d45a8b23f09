use rusqlite::Connection;

use crate::catalog::file_repository;
use crate::config::{MetadataExtractorConfig, METADATA_IMAGE_EXTENSIONS, METADATA_VIDEO_EXTENSIONS};
use crate::error::PhotodexError;

/// Select files for metadata extraction under the configured strategy
/// (spec §4.3): supported extension, no existing `file_metadata` row, and
/// (for `selective`) neither path-folder nor path-filename date present.
pub fn select_files(
    conn: &Connection,
    session_id: i64,
    config: &MetadataExtractorConfig,
) -> Result<Vec<(i64, String, i64)>, PhotodexError> {
    let supported: Vec<&str> = METADATA_IMAGE_EXTENSIONS
        .iter()
        .chain(METADATA_VIDEO_EXTENSIONS.iter())
        .copied()
        .collect();

    let mut rows = file_repository::select_for_metadata_extraction(
        conn,
        session_id,
        config.strategy,
        &supported,
        config.limit,
    )
    .map_err(PhotodexError::CatalogWrite)?;

    if let Some(limit) = config.limit {
        rows.truncate(limit);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::file_repository::insert_file;
    use crate::catalog::model::NewFile;
    use crate::catalog::session_repository::create_fresh;
    use crate::config::MetadataSelectionStrategy;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use std::path::PathBuf;

    fn file(path: &str, ext: &str) -> NewFile {
        NewFile {
            source_path: path.to_string(),
            directory_path: "".to_string(),
            filename_full: path.to_string(),
            filename_base: path.to_string(),
            extension: Some(ext.to_string()),
            size: 20_000,
            mtime_epoch: None,
            mtime_ymd: None,
            ctime_epoch: None,
            ctime_ymd: None,
            birthtime_epoch: None,
            birthtime_ymd: None,
            atime_epoch: None,
            atime_ymd: None,
        }
    }

    #[test]
    fn test_selective_excludes_files_with_path_dates() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        let dated = insert_file(&conn, session_id, &file("a.jpg", "jpg"), 0.0, 20240101).unwrap();
        let undated = insert_file(&conn, session_id, &file("b.jpg", "jpg"), 0.0, 20240101).unwrap();
        conn.execute(
            "UPDATE files SET date_path_folder = 20230514 WHERE id = ?1",
            [dated],
        )
        .unwrap();

        let config = MetadataExtractorConfig {
            strategy: MetadataSelectionStrategy::Selective,
            ..Default::default()
        };
        let selected = select_files(&conn, session_id, &config).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, undated);
    }

    #[test]
    fn test_unsupported_extension_excluded() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("doc.pdf", "pdf"), 0.0, 20240101).unwrap();

        let selected = select_files(&conn, session_id, &MetadataExtractorConfig::default()).unwrap();
        assert!(selected.is_empty());
    }
}
