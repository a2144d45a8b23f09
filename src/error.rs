use thiserror::Error;

/// Fatal errors: conditions that abort the current stage, mark the
/// scan session `failed`, and surface a non-zero process exit (spec §7).
/// Per-file and per-folder recoverable errors are never represented here —
/// they are logged and counted in each stage's `*Stats`, not propagated.
#[derive(Debug, Error)]
pub enum PhotodexError {
    #[error("drive UUID oracle returned no identifier for {mount_point}")]
    UuidOracleFailed { mount_point: String },

    #[error("external metadata tool not found or did not respond to -ver: {0}")]
    ToolNotFound(String),

    #[error("catalog write failed: {0}")]
    CatalogWrite(#[from] rusqlite::Error),

    #[error("catalog schema mismatch: expected version {expected}, found {found}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
