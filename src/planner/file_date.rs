use crate::catalog::model::PlanningFileRow;
use crate::dateutil::epoch_to_ymd;

/// Resolve one file's `file_resolved_date` by first-non-null priority
/// (spec §4.4): `date_path_folder`, `date_path_filename`,
/// `file_metadata.date_original`, then a calendar date from `fs_modified_at`.
/// `date_path_hierarchy` is deliberately excluded (Open Question 1).
pub fn resolve(row: &PlanningFileRow) -> Option<(i64, &'static str)> {
    if let Some(d) = row.date_path_folder {
        return Some((d, "path_folder"));
    }
    if let Some(d) = row.date_path_filename {
        return Some((d, "path_filename"));
    }
    if let Some(d) = row.metadata_date_original_ymd {
        return Some((d, "exif"));
    }
    if let Some(epoch) = row.mtime_epoch {
        if let Some(d) = epoch_to_ymd(epoch) {
            return Some((d, "fs_modified"));
        }
    }
    None
}
