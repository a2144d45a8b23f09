//! Immutable configuration structs passed down the pipeline. The library
//! never reads a config file itself; the CLI owns parsing/defaults and hands
//! these structs to the stage entry points.

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub progress_interval: usize,
    pub stats_update_interval: usize,
    pub retry_io_errors: u32,
    pub max_path_length: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            progress_interval: 1000,
            stats_update_interval: 1000,
            retry_io_errors: 1,
            max_path_length: 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataSelectionStrategy {
    Full,
    Selective,
}

#[derive(Debug, Clone)]
pub struct MetadataExtractorConfig {
    pub strategy: MetadataSelectionStrategy,
    pub batch_size: usize,
    pub limit: Option<usize>,
    pub min_file_size_bytes: u64,
    /// Per-batch deadline for the external tool (spec §5 Timeouts): on
    /// timeout the batch is retried once, then dropped to single-file
    /// fallback, each file call bounded by the same deadline.
    pub batch_timeout: std::time::Duration,
}

impl Default for MetadataExtractorConfig {
    fn default() -> Self {
        Self {
            strategy: MetadataSelectionStrategy::Full,
            batch_size: 100,
            limit: None,
            min_file_size_bytes: 10_240,
            batch_timeout: std::time::Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub min_coverage: f64,
    pub min_prevalence: f64,
    pub max_date_span_months: i64,
    pub max_annotation_length: usize,
    pub image_extensions: Vec<String>,
    pub sidecar_extensions: Vec<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_coverage: 0.30,
            min_prevalence: 0.80,
            max_date_span_months: 3,
            max_annotation_length: 10,
            image_extensions: [
                "arw", "jpg", "jpeg", "nef", "dng", "tif", "tiff", "heic", "cr2", "srw", "png",
                "psd", "bmp", "gif",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            sidecar_extensions: ["xmp", "json", "xml", "thm", "aae"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Extensions the external metadata tool is invoked for (spec §4.3), distinct
/// from the broader structural `PlannerConfig::image_extensions`.
pub const METADATA_IMAGE_EXTENSIONS: &[&str] = &[
    "arw", "jpg", "jpeg", "nef", "dng", "tif", "tiff", "heic", "cr2", "srw",
];
pub const METADATA_VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mkv", "avi"];
