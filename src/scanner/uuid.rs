use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("no identifier available for mount point {0}")]
pub struct UuidError(pub String);

/// External collaborator: resolves a mount point to an opaque drive
/// identifier (spec §6 "Drive-UUID oracle"). The core calls this once per
/// scan start; a failure is fatal (spec §4.1 precondition).
pub trait DriveUuidOracle {
    fn uuid_for(&self, mount_point: &Path) -> Result<String, UuidError>;
}

/// Test double returning a fixed identifier, or failing for a configured path.
pub struct StaticUuidOracle {
    pub uuid: String,
}

impl StaticUuidOracle {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self { uuid: uuid.into() }
    }
}

impl DriveUuidOracle for StaticUuidOracle {
    fn uuid_for(&self, _mount_point: &Path) -> Result<String, UuidError> {
        Ok(self.uuid.clone())
    }
}
