use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanSessionStatus {
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl ScanSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSessionStatus::Running => "running",
            ScanSessionStatus::Completed => "completed",
            ScanSessionStatus::Failed => "failed",
            ScanSessionStatus::Interrupted => "interrupted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ScanSessionStatus::Running),
            "completed" => Some(ScanSessionStatus::Completed),
            "failed" => Some(ScanSessionStatus::Failed),
            "interrupted" => Some(ScanSessionStatus::Interrupted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: i64,
    pub source_root: PathBuf,
    pub source_drive_uuid: String,
    pub status: ScanSessionStatus,
    pub started_at_epoch: f64,
    pub started_at_ymd: i64,
    pub completed_at_epoch: Option<f64>,
    pub completed_at_ymd: Option<i64>,
    pub file_count: i64,
    pub directory_count: i64,
    pub total_bytes: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub source_path: String,
    pub directory_path: String,
    pub filename_full: String,
    pub filename_base: String,
    pub extension: Option<String>,
    pub size: i64,
    pub mtime_epoch: Option<f64>,
    pub mtime_ymd: Option<i64>,
    pub ctime_epoch: Option<f64>,
    pub ctime_ymd: Option<i64>,
    pub birthtime_epoch: Option<f64>,
    pub birthtime_ymd: Option<i64>,
    pub atime_epoch: Option<f64>,
    pub atime_ymd: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: i64,
    pub scan_session_id: i64,
    pub source_path: String,
    pub directory_path: String,
    pub filename_full: String,
    pub filename_base: String,
    pub extension: Option<String>,
    pub size: i64,
    pub mtime_epoch: Option<f64>,
    pub mtime_ymd: Option<i64>,
    pub date_path_hierarchy: Option<i64>,
    pub date_path_hierarchy_source: Option<String>,
    pub date_path_folder: Option<i64>,
    pub date_path_folder_source: Option<String>,
    pub date_path_filename: Option<i64>,
    pub date_path_filename_source: Option<String>,
}

/// A file plus the inputs the Planner needs to resolve its own date and
/// target path, joined across `files` and `file_metadata` in one query.
#[derive(Debug, Clone)]
pub struct PlanningFileRow {
    pub id: i64,
    pub source_path: String,
    pub directory_path: String,
    pub filename_full: String,
    pub extension: Option<String>,
    pub date_path_folder: Option<i64>,
    pub date_path_folder_source: Option<String>,
    pub date_path_filename: Option<i64>,
    pub metadata_date_original_ymd: Option<i64>,
    pub mtime_epoch: Option<f64>,
}

/// Three independent path-date signals for one file, as produced by
/// `pathdate::extractor`. Each pair is `None` when the corresponding
/// strategy found no valid candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathDateSignals {
    pub hierarchy: Option<(i64, String)>,
    pub folder: Option<(i64, String)>,
    pub filename: Option<(i64, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct FileMetadataOutcome {
    pub date_original: Option<(f64, i64)>,
    pub date_digitized: Option<(f64, i64)>,
    pub date_modify: Option<(f64, i64)>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens_model: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub orientation: Option<i64>,
    pub duration_seconds: Option<f64>,
    pub video_frame_rate: Option<f64>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub mime_type: Option<String>,
    pub metadata_families: Option<String>,
    pub metadata_json: Option<String>,
    pub extractor_version: String,
    pub extraction_error: Option<String>,
    pub skip_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FolderPlanRow {
    pub id: i64,
    pub scan_session_id: i64,
    pub source_folder_path: String,
    pub resolved_date: Option<i64>,
    pub resolved_date_source: Option<String>,
    pub target_folder: Option<String>,
    pub bucket: Option<String>,
    pub total_file_count: i64,
    pub image_file_count: i64,
    pub images_with_date_count: i64,
    pub coverage_percent: Option<f64>,
    pub prevalent_date: Option<i64>,
    pub prevalent_count: Option<i64>,
    pub prevalent_percent: Option<f64>,
    pub unique_date_count: Option<i64>,
    pub min_date: Option<i64>,
    pub max_date: Option<i64>,
    pub date_span_months: Option<i64>,
    pub inherited_from_folder_id: Option<i64>,
    pub is_subfolder: bool,
}

#[derive(Debug, Clone)]
pub struct NewFolderPlan {
    pub source_folder_path: String,
    pub resolved_date: Option<i64>,
    pub resolved_date_source: Option<String>,
    pub target_folder: Option<String>,
    pub bucket: Option<String>,
    pub total_file_count: i64,
    pub image_file_count: i64,
    pub images_with_date_count: i64,
    pub coverage_percent: Option<f64>,
    pub prevalent_date: Option<i64>,
    pub prevalent_count: Option<i64>,
    pub prevalent_percent: Option<f64>,
    pub unique_date_count: Option<i64>,
    pub min_date: Option<i64>,
    pub max_date: Option<i64>,
    pub date_span_months: Option<i64>,
    pub inherited_from_folder_id: Option<i64>,
    pub is_subfolder: bool,
    pub min_coverage_threshold: f64,
    pub min_prevalence_threshold: f64,
    pub max_span_threshold: i64,
}

#[derive(Debug, Clone)]
pub struct NewFilePlan {
    pub file_id: i64,
    pub folder_plan_id: i64,
    pub file_resolved_date: Option<i64>,
    pub file_resolved_date_source: Option<String>,
    pub target_path: String,
    pub target_filename: String,
    pub is_potential_duplicate: bool,
    pub duplicate_source_hash: Option<String>,
    pub is_sidecar: bool,
    pub resolution_reason: String,
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub directories_scanned: usize,
    pub total_bytes: i64,
    pub errors: usize,
    /// capped at 100 entries
    pub error_log: Vec<String>,
    pub interrupted: bool,
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct PathDateStats {
    pub files_processed: usize,
    pub hierarchy_matches: usize,
    pub folder_matches: usize,
    pub filename_matches: usize,
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetadataStats {
    pub extracted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// capped at 100 entries
    pub error_log: Vec<String>,
}

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct PlanStats {
    pub folders_planned: usize,
    pub files_planned: usize,
    pub potential_duplicates: usize,
    pub sidecars: usize,
    /// folder count keyed by bucket name ("mixed_dates", "non_media")
    pub folders_by_bucket: std::collections::BTreeMap<String, usize>,
    /// folder count keyed by resolution source tag
    pub folders_by_source: std::collections::BTreeMap<String, usize>,
}

fn push_capped(log: &mut Vec<String>, msg: String) {
    if log.len() < 100 {
        log.push(msg);
    }
}

impl ScanStats {
    pub fn log_error(&mut self, msg: impl Into<String>) {
        self.errors += 1;
        push_capped(&mut self.error_log, msg.into());
    }
}

impl MetadataStats {
    pub fn log_error(&mut self, msg: impl Into<String>) {
        push_capped(&mut self.error_log, msg.into());
    }
}
