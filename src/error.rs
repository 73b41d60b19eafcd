use std::fmt;

/// Why a scene document could not be imported.
#[derive(Debug)]
pub enum SnapshotError {
    Malformed(serde_json::Error),
    UnsupportedVersion { found: u32, supported: u32 },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::Malformed(e) => write!(f, "Malformed scene document: {e}"),
            SnapshotError::UnsupportedVersion { found, supported } => {
                write!(f, "Unsupported scene format version {found} (supported: {supported})")
            }
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Malformed(e) => Some(e),
            SnapshotError::UnsupportedVersion { .. } => None,
        }
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(e: serde_json::Error) -> Self {
        SnapshotError::Malformed(e)
    }
}
