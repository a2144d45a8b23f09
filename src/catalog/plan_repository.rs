use rusqlite::{params, Connection};

use super::model::{FolderPlanRow, NewFilePlan, NewFolderPlan};

fn row_to_folder_plan(row: &rusqlite::Row<'_>) -> rusqlite::Result<FolderPlanRow> {
    let is_subfolder: i64 = row.get("is_subfolder")?;
    Ok(FolderPlanRow {
        id: row.get("id")?,
        scan_session_id: row.get("scan_session_id")?,
        source_folder_path: row.get("source_folder_path")?,
        resolved_date: row.get("resolved_date")?,
        resolved_date_source: row.get("resolved_date_source")?,
        target_folder: row.get("target_folder")?,
        bucket: row.get("bucket")?,
        total_file_count: row.get("total_file_count")?,
        image_file_count: row.get("image_file_count")?,
        images_with_date_count: row.get("images_with_date_count")?,
        coverage_percent: row.get("coverage_percent")?,
        prevalent_date: row.get("prevalent_date")?,
        prevalent_count: row.get("prevalent_count")?,
        prevalent_percent: row.get("prevalent_percent")?,
        unique_date_count: row.get("unique_date_count")?,
        min_date: row.get("min_date")?,
        max_date: row.get("max_date")?,
        date_span_months: row.get("date_span_months")?,
        inherited_from_folder_id: row.get("inherited_from_folder_id")?,
        is_subfolder: is_subfolder != 0,
    })
}

/// Delete all prior plan rows for a session (folder_plan cascades to file_plan).
/// Called at the start of every Planner run (spec §4.4 contract).
pub fn delete_plan_for_session(conn: &Connection, session_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM folder_plan WHERE scan_session_id = ?1",
        params![session_id],
    )?;
    Ok(())
}

pub fn insert_folder_plan(
    conn: &Connection,
    session_id: i64,
    plan: &NewFolderPlan,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO folder_plan (
            scan_session_id, source_folder_path, resolved_date, resolved_date_source,
            target_folder, bucket, total_file_count, image_file_count, images_with_date_count,
            coverage_percent, prevalent_date, prevalent_count, prevalent_percent,
            unique_date_count, min_date, max_date, date_span_months,
            inherited_from_folder_id, is_subfolder,
            min_coverage_threshold, min_prevalence_threshold, max_span_threshold
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
        params![
            session_id,
            plan.source_folder_path,
            plan.resolved_date,
            plan.resolved_date_source,
            plan.target_folder,
            plan.bucket,
            plan.total_file_count,
            plan.image_file_count,
            plan.images_with_date_count,
            plan.coverage_percent,
            plan.prevalent_date,
            plan.prevalent_count,
            plan.prevalent_percent,
            plan.unique_date_count,
            plan.min_date,
            plan.max_date,
            plan.date_span_months,
            plan.inherited_from_folder_id,
            plan.is_subfolder as i64,
            plan.min_coverage_threshold,
            plan.min_prevalence_threshold,
            plan.max_span_threshold,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_file_plan(conn: &Connection, plan: &NewFilePlan) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO file_plan (
            file_id, folder_plan_id, file_resolved_date, file_resolved_date_source,
            target_path, target_filename, is_potential_duplicate, duplicate_source_hash,
            is_sidecar, resolution_reason
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
        params![
            plan.file_id,
            plan.folder_plan_id,
            plan.file_resolved_date,
            plan.file_resolved_date_source,
            plan.target_path,
            plan.target_filename,
            plan.is_potential_duplicate as i64,
            plan.duplicate_source_hash,
            plan.is_sidecar as i64,
            plan.resolution_reason,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a folder's plan by its source path, for parent-inheritance lookups
/// during ascending-depth Planner processing.
pub fn find_by_source_path(
    conn: &Connection,
    session_id: i64,
    source_folder_path: &str,
) -> rusqlite::Result<Option<FolderPlanRow>> {
    use rusqlite::OptionalExtension;
    conn.query_row(
        "SELECT * FROM folder_plan WHERE scan_session_id = ?1 AND source_folder_path = ?2",
        params![session_id, source_folder_path],
        row_to_folder_plan,
    )
    .optional()
}
