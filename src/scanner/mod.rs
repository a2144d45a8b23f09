pub mod pipeline;
pub mod uuid;
pub mod walker;

pub use pipeline::{run_scan, ScanOutcome};
pub use uuid::DriveUuidOracle;
