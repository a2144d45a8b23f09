use std::collections::{HashMap, HashSet};

use rusqlite::Connection;

use crate::catalog::model::{FolderPlanRow, NewFilePlan, PlanStats};
use crate::catalog::{file_repository, plan_repository};
use crate::config::PlannerConfig;
use crate::error::PhotodexError;
use crate::planner::duplicates;
use crate::planner::folder_resolve::{self, FolderResolution};
use crate::planner::sidecars;
use crate::planner::target_path::{bucket_target_folder, date_target_folder, subfolder_target_folder};

fn parent_of(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(pos) => Some(&path[..pos]),
        None => Some(""),
    }
}

fn compute_target_folder(
    resolution: &FolderResolution,
    parent: Option<&FolderPlanRow>,
    config: &PlannerConfig,
) -> String {
    let plan = &resolution.plan;
    if let Some(bucket) = &plan.bucket {
        return bucket_target_folder(bucket, &plan.source_folder_path);
    }
    if plan.is_subfolder {
        let p = parent.expect("is_subfolder implies a resolved parent");
        let parent_target = p.target_folder.as_deref().unwrap_or("");
        return subfolder_target_folder(parent_target, &p.source_folder_path, &plan.source_folder_path);
    }
    let resolved_date = plan.resolved_date.expect("non-bucket, non-subfolder plan has a resolved_date");
    date_target_folder(resolved_date, &resolution.annotation_seed, config.max_annotation_length)
}

/// Produce a complete `folder_plan`/`file_plan` set for one session (spec
/// §4.4). Folders are processed in ascending-depth order so parents are
/// always resolved before their children; the whole run is one enclosing
/// transaction (spec §5 Planner guarantee: either no plan rows, or a
/// complete set).
pub fn run(conn: &Connection, session_id: i64, config: &PlannerConfig) -> Result<PlanStats, PhotodexError> {
    let tx = conn.unchecked_transaction().map_err(PhotodexError::CatalogWrite)?;

    plan_repository::delete_plan_for_session(&tx, session_id).map_err(PhotodexError::CatalogWrite)?;
    let folders = file_repository::distinct_directory_paths(&tx, session_id).map_err(PhotodexError::CatalogWrite)?;

    let mut stats = PlanStats::default();
    let mut claimed_by_target: HashMap<String, HashSet<String>> = HashMap::new();

    for folder in &folders {
        let files = file_repository::files_in_folder(&tx, session_id, folder).map_err(PhotodexError::CatalogWrite)?;
        let parent = match parent_of(folder) {
            Some(p) => plan_repository::find_by_source_path(&tx, session_id, p).map_err(PhotodexError::CatalogWrite)?,
            None => None,
        };

        let mut resolution = folder_resolve::resolve(folder, &files, parent.as_ref(), config);
        let target_folder = compute_target_folder(&resolution, parent.as_ref(), config);
        resolution.plan.target_folder = Some(target_folder.clone());

        let folder_plan_id =
            plan_repository::insert_folder_plan(&tx, session_id, &resolution.plan).map_err(PhotodexError::CatalogWrite)?;
        stats.folders_planned += 1;
        *stats
            .folders_by_bucket
            .entry(resolution.plan.bucket.clone().unwrap_or_else(|| "none".to_string()))
            .or_insert(0) += 1;
        *stats
            .folders_by_source
            .entry(resolution.plan.resolved_date_source.clone().unwrap_or_else(|| "none".to_string()))
            .or_insert(0) += 1;

        let sidecar_ids = sidecars::detect(&files, config);
        let resolution_reason = resolution
            .plan
            .resolved_date_source
            .clone()
            .unwrap_or_else(|| format!("bucket:{}", resolution.plan.bucket.clone().unwrap_or_default()));
        let claimed = claimed_by_target.entry(target_folder.clone()).or_default();

        for file in &files {
            let (file_resolved_date, file_resolved_date_source) = resolution
                .file_dates
                .iter()
                .find(|(id, _)| *id == file.id)
                .and_then(|(_, d)| *d)
                .map(|(d, s)| (Some(d), Some(s.to_string())))
                .unwrap_or((None, None));

            let (target_filename, is_potential_duplicate, duplicate_source_hash) =
                duplicates::resolve_filename(claimed, &file.directory_path, &file.filename_full);
            let is_sidecar = sidecar_ids.contains(&file.id);
            if is_potential_duplicate {
                stats.potential_duplicates += 1;
            }
            if is_sidecar {
                stats.sidecars += 1;
            }

            let target_path = format!("{}/{}", target_folder, target_filename);
            plan_repository::insert_file_plan(
                &tx,
                &NewFilePlan {
                    file_id: file.id,
                    folder_plan_id,
                    file_resolved_date,
                    file_resolved_date_source,
                    target_path,
                    target_filename,
                    is_potential_duplicate,
                    duplicate_source_hash,
                    is_sidecar,
                    resolution_reason: resolution_reason.clone(),
                },
            )
            .map_err(PhotodexError::CatalogWrite)?;
            stats.files_planned += 1;
        }
    }

    tx.commit().map_err(PhotodexError::CatalogWrite)?;

    tracing::info!(
        "planner: {} folders, {} files, {} potential duplicates, {} sidecars",
        stats.folders_planned,
        stats.files_planned,
        stats.potential_duplicates,
        stats.sidecars
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::file_repository::insert_file;
    use crate::catalog::model::NewFile;
    use crate::catalog::session_repository::create_fresh;
    use crate::db::{migrations::run_migrations, open_in_memory};
    use std::path::PathBuf;

    fn file(source_path: &str, directory_path: &str, filename: &str) -> NewFile {
        NewFile {
            source_path: source_path.to_string(),
            directory_path: directory_path.to_string(),
            filename_full: filename.to_string(),
            filename_base: filename.trim_end_matches(".jpg").to_string(),
            extension: Some("jpg".to_string()),
            size: 20_000,
            mtime_epoch: Some(1_700_000_000.0),
            mtime_ymd: Some(20231115),
            ctime_epoch: None,
            ctime_ymd: None,
            birthtime_epoch: None,
            birthtime_ymd: None,
            atime_epoch: None,
            atime_ymd: None,
        }
    }

    #[test]
    fn test_single_folder_with_path_date_plans_into_dated_target() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        let file_id = insert_file(
            &conn,
            session_id,
            &file("2023_05_14_a7iv/IMG.jpg", "2023_05_14_a7iv", "IMG.jpg"),
            0.0,
            20240101,
        )
        .unwrap();
        conn.execute(
            "UPDATE files SET date_path_folder = 20230514, date_path_folder_source = '2023_05_14_a7iv' WHERE id = ?1",
            [file_id],
        )
        .unwrap();

        let stats = run(&conn, session_id, &PlannerConfig::default()).unwrap();
        assert_eq!(stats.folders_planned, 1);
        assert_eq!(stats.files_planned, 1);

        let target_path: String = conn
            .query_row("SELECT target_path FROM file_plan WHERE file_id = ?1", [file_id], |row| row.get(0))
            .unwrap();
        assert_eq!(target_path, "2023/2023_05/20230514-a7iv/IMG.jpg");
    }

    #[test]
    fn test_duplicate_filenames_in_same_target_are_renamed() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        let f1 = insert_file(&conn, session_id, &file("a/IMG.jpg", "a", "IMG.jpg"), 0.0, 20240101).unwrap();
        let f2 = insert_file(&conn, session_id, &file("b/IMG.jpg", "b", "IMG.jpg"), 0.0, 20240101).unwrap();
        for (id, dir) in [(f1, "a"), (f2, "b")] {
            conn.execute(
                "UPDATE files SET date_path_folder = 20230514, date_path_folder_source = ?2 WHERE id = ?1",
                rusqlite::params![id, dir],
            )
            .unwrap();
        }

        let stats = run(&conn, session_id, &PlannerConfig::default()).unwrap();
        assert_eq!(stats.potential_duplicates, 1);

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM file_plan WHERE is_potential_duplicate = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_planner_deletes_prior_plan_before_rebuilding() {
        let conn = open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let session_id = create_fresh(&conn, &PathBuf::from("/r"), "uuid", 0.0, 20240101).unwrap();
        insert_file(&conn, session_id, &file("a/IMG.jpg", "a", "IMG.jpg"), 0.0, 20240101).unwrap();

        run(&conn, session_id, &PlannerConfig::default()).unwrap();
        let stats_again = run(&conn, session_id, &PlannerConfig::default()).unwrap();
        assert_eq!(stats_again.files_planned, 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM file_plan", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
