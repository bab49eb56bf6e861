//! Device error types

use std::path::PathBuf;

use contracts::HubError;
use thiserror::Error;

/// Bring-up failure
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No IIO device carries the requested name
    #[error("no IIO device named '{name}' under {dir}")]
    NotFound { name: String, dir: PathBuf },

    /// IIO bus directory could not be scanned
    #[error("failed to scan {dir}: {source}")]
    Discovery {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Character device could not be opened
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Hub-side setup write failed
    #[error("hub setup failed: {0}")]
    Hub(#[from] HubError),
}

impl DeviceError {
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

impl From<DeviceError> for HubError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Hub(inner) => inner,
            DeviceError::Open { source, .. } | DeviceError::Discovery { source, .. } => {
                HubError::transport_io("open", source)
            }
            other @ DeviceError::NotFound { .. } => HubError::transport("open", other.to_string()),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, DeviceError>;
