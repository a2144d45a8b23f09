use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rusqlite::Connection;

use crate::catalog::model::{FileMetadataOutcome, MetadataStats};
use crate::catalog::{metadata_repository, session_repository};
use crate::config::MetadataExtractorConfig;
use crate::dateutil::system_time_to_epoch_ymd;
use crate::error::PhotodexError;
use crate::metadata::normalize::normalize;
use crate::metadata::selection::select_files;
use crate::metadata::tool::{MetadataTool, ToolError};

/// Run the MetadataExtractor stage for one session (spec §4.3). Invokes the
/// external tool in batches and writes exactly one `file_metadata` row per
/// selected file, never raising a per-file error past this function.
pub fn run(
    conn: &Connection,
    session_id: i64,
    tool: &dyn MetadataTool,
    config: &MetadataExtractorConfig,
) -> Result<MetadataStats, PhotodexError> {
    let version = tool
        .probe_version()
        .map_err(|e| PhotodexError::ToolNotFound(e.to_string()))?;

    let session = session_repository::find_by_id(conn, session_id)
        .map_err(PhotodexError::CatalogWrite)?
        .ok_or_else(|| PhotodexError::CatalogWrite(rusqlite::Error::QueryReturnedNoRows))?;

    let selected = select_files(conn, session_id, config)?;
    let mut stats = MetadataStats::default();

    let (too_small, to_process): (Vec<_>, Vec<_>) = selected
        .into_iter()
        .partition(|(_, _, size)| (*size as u64) < config.min_file_size_bytes);

    for (file_id, _path, size) in too_small {
        let (epoch, ymd) = system_time_to_epoch_ymd(SystemTime::now()).unwrap_or((0.0, 0));
        let outcome = FileMetadataOutcome {
            extractor_version: version.clone(),
            skip_reason: Some(format!("file_too_small:{}_bytes", size)),
            ..Default::default()
        };
        metadata_repository::insert_outcome(conn, file_id, &outcome, epoch, ymd)
            .map_err(PhotodexError::CatalogWrite)?;
        stats.skipped += 1;
    }

    for batch in to_process.chunks(config.batch_size) {
        let absolute_paths: Vec<PathBuf> = batch
            .iter()
            .map(|(_, rel, _)| session.source_root.join(rel))
            .collect();
        let path_refs: Vec<&Path> = absolute_paths.iter().map(|p| p.as_path()).collect();

        let first_attempt = tool.run_batch_with_deadline(&path_refs, config.batch_timeout);
        let outcome = match first_attempt {
            Err(ToolError::TimedOut(_)) => {
                tracing::warn!("metadata: batch timed out after {:?}, retrying once", config.batch_timeout);
                tool.run_batch_with_deadline(&path_refs, config.batch_timeout)
            }
            other => other,
        };

        match outcome {
            Ok(results) => {
                record_batch_results(conn, &version, batch, &absolute_paths, &results, &mut stats)?;
            }
            Err(e) => {
                tracing::warn!("metadata: batch failed ({}), falling back to single-file", e);
                for ((file_id, _, _), path) in batch.iter().zip(absolute_paths.iter()) {
                    let single = std::slice::from_ref(&path.as_path());
                    match tool.run_batch_with_deadline(single, config.batch_timeout) {
                        Ok(results) if !results.is_empty() => {
                            record_one(conn, &version, *file_id, &results[0], &mut stats)?;
                        }
                        Ok(_) => {
                            record_error(conn, &version, *file_id, "tool returned no result", &mut stats)?;
                        }
                        Err(e) => {
                            record_error(conn, &version, *file_id, &e.to_string(), &mut stats)?;
                        }
                    }
                }
            }
        }
    }

    tracing::info!(
        "metadata: extracted {}, skipped {}, failed {}",
        stats.extracted,
        stats.skipped,
        stats.failed
    );

    Ok(stats)
}

fn record_batch_results(
    conn: &Connection,
    version: &str,
    batch: &[(i64, String, i64)],
    absolute_paths: &[PathBuf],
    results: &[serde_json::Value],
    stats: &mut MetadataStats,
) -> Result<(), PhotodexError> {
    for ((file_id, _, _), path) in batch.iter().zip(absolute_paths.iter()) {
        let path_str = path.to_string_lossy();
        let matched = results
            .iter()
            .find(|r| r.get("SourceFile").and_then(|v| v.as_str()) == Some(path_str.as_ref()));
        match matched {
            Some(result) => record_one(conn, version, *file_id, result, stats)?,
            None => record_error(conn, version, *file_id, "no result returned by metadata tool", stats)?,
        }
    }
    Ok(())
}

fn record_one(
    conn: &Connection,
    version: &str,
    file_id: i64,
    result: &serde_json::Value,
    stats: &mut MetadataStats,
) -> Result<(), PhotodexError> {
    let outcome = normalize(result, version);
    let (epoch, ymd) = system_time_to_epoch_ymd(SystemTime::now()).unwrap_or((0.0, 0));
    metadata_repository::insert_outcome(conn, file_id, &outcome, epoch, ymd)
        .map_err(PhotodexError::CatalogWrite)?;
    stats.extracted += 1;
    Ok(())
}

fn record_error(
    conn: &Connection,
    version: &str,
    file_id: i64,
    message: &str,
    stats: &mut MetadataStats,
) -> Result<(), PhotodexError> {
    let (epoch, ymd) = system_time_to_epoch_ymd(SystemTime::now()).unwrap_or((0.0, 0));
    let outcome = FileMetadataOutcome {
        extractor_version: version.to_string(),
        extraction_error: Some(message.to_string()),
        ..Default::default()
    };
    metadata_repository::insert_outcome(conn, file_id, &outcome, epoch, ymd)
        .map_err(PhotodexError::CatalogWrite)?;
    stats.failed += 1;
    stats.log_error(format!("file_id={}: {}", file_id, message));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::file_repository::insert_file;
    use crate::catalog::model::NewFile;
    use crate::catalog::session_repository::create_fresh;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use crate::metadata::tool::fake::FakeMetadataTool;
    use serde_json::json;
    use std::path::PathBuf;

    fn file(path: &str, size: i64) -> NewFile {
        NewFile {
            source_path: path.to_string(),
            directory_path: "".to_string(),
            filename_full: path.to_string(),
            filename_base: path.to_string(),
            extension: Some("jpg".to_string()),
            size,
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
    fn test_small_file_is_skipped_without_invoking_tool() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/root");
        let session_id = create_fresh(&conn, &root, "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("tiny.jpg", 100), 0.0, 20240101).unwrap();

        let tool = FakeMetadataTool::new("12.70");
        let config = MetadataExtractorConfig::default();
        let stats = run(&conn, session_id, &tool, &config).unwrap();
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.extracted, 0);

        let skip: Option<String> = conn
            .query_row("SELECT skip_reason FROM file_metadata", [], |row| row.get(0))
            .unwrap();
        assert_eq!(skip.as_deref(), Some("file_too_small:100_bytes"));
    }

    #[test]
    fn test_successful_extraction_matches_by_source_file() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/root");
        let session_id = create_fresh(&conn, &root, "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("a.jpg", 20_000), 0.0, 20240101).unwrap();

        let absolute = root.join("a.jpg").to_string_lossy().into_owned();
        let tool = FakeMetadataTool::new("12.70").with_result(
            &absolute,
            json!({"SourceFile": absolute, "EXIF:Make": "Sony"}),
        );
        let stats = run(&conn, session_id, &tool, &MetadataExtractorConfig::default()).unwrap();
        assert_eq!(stats.extracted, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_batch_crash_falls_back_to_single_file() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/root");
        let session_id = create_fresh(&conn, &root, "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("a.jpg", 20_000), 0.0, 20240101).unwrap();

        let absolute = root.join("a.jpg").to_string_lossy().into_owned();
        let tool = FakeMetadataTool::new("12.70")
            .with_result(&absolute, json!({"SourceFile": absolute, "EXIF:Make": "Sony"}))
            .failing_first_n_batches(1);
        let stats = run(&conn, session_id, &tool, &MetadataExtractorConfig::default()).unwrap();
        assert_eq!(stats.extracted, 1);
    }

    #[test]
    fn test_batch_timeout_retries_once_then_falls_back_to_single_file() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let root = PathBuf::from("/root");
        let session_id = create_fresh(&conn, &root, "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("a.jpg", 20_000), 0.0, 20240101).unwrap();

        let absolute = root.join("a.jpg").to_string_lossy().into_owned();
        // Two simulated timeouts: the first attempt, then its one retry —
        // both must be exhausted before fallback reaches the per-file call.
        let tool = FakeMetadataTool::new("12.70")
            .with_result(&absolute, json!({"SourceFile": absolute, "EXIF:Make": "Sony"}))
            .timing_out_first_n_batches(2);
        let stats = run(&conn, session_id, &tool, &MetadataExtractorConfig::default()).unwrap();
        assert_eq!(stats.extracted, 1);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn test_missing_tool_is_fatal() {
        struct AbsentTool;
        impl MetadataTool for AbsentTool {
            fn probe_version(&self) -> Result<String, crate::metadata::tool::ToolError> {
                Err(crate::metadata::tool::ToolError::Failed("not found".into()))
            }
            fn run_batch(&self, _paths: &[&std::path::Path]) -> Result<Vec<serde_json::Value>, crate::metadata::tool::ToolError> {
                unreachable!()
            }
        }
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/root"), "uuid", 0.0, 20240101).unwrap();
        let result = run(&conn, session_id, &AbsentTool, &MetadataExtractorConfig::default());
        assert!(result.is_err());
    }
}
