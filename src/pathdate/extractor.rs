use rusqlite::Connection;

use crate::catalog::file_repository;
use crate::catalog::model::{PathDateSignals, PathDateStats};
use crate::error::PhotodexError;
use crate::pathdate::{filename, folder, hierarchy};

/// Run the PathDateExtractor stage for one session (spec §4.2). Computes the
/// three independent path-date signals for every file and writes them.
/// Idempotent: rerunning overwrites with identical results on identical input.
pub fn run(conn: &Connection, session_id: i64) -> Result<PathDateStats, PhotodexError> {
    let mut stats = PathDateStats::default();
    let files = file_repository::list_path_components_for_session(conn, session_id)
        .map_err(PhotodexError::CatalogWrite)?;

    for (file_id, directory_path, filename_full) in files {
        let signals = PathDateSignals {
            hierarchy: hierarchy::extract(&directory_path),
            folder: folder::extract(&directory_path),
            filename: filename::extract(&filename_full),
        };
        if signals.hierarchy.is_some() {
            stats.hierarchy_matches += 1;
        }
        if signals.folder.is_some() {
            stats.folder_matches += 1;
        }
        if signals.filename.is_some() {
            stats.filename_matches += 1;
        }
        file_repository::update_path_dates(conn, file_id, &signals)
            .map_err(PhotodexError::CatalogWrite)?;
        stats.files_processed += 1;
    }

    tracing::info!(
        "pathdate: {} files processed — {} hierarchy, {} folder, {} filename matches",
        stats.files_processed,
        stats.hierarchy_matches,
        stats.folder_matches,
        stats.filename_matches,
    );

    Ok(stats)
}
