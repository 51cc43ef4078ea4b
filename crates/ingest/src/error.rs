use std::path::PathBuf;

use thiserror::Error;

/// Failure of a point source mid-run. Terminates the run; nothing is retried.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("point source failed: {message}")]
    Source { message: String },

    #[error("failed to read point file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse point records: {0}")]
    Parse(#[from] serde_json::Error),
}

impl IngestionError {
    pub fn failed(message: impl Into<String>) -> Self {
        IngestionError::Source {
            message: message.into(),
        }
    }
}

/// A record that cannot become a [`crate::Point`]. Skipped and logged, never fatal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPoint {
    #[error("record has no id")]
    MissingId,

    #[error("point {id} has no coordinates")]
    MissingCoordinates { id: String },

    #[error("point {id} has out-of-range coordinates (lat {lat}, lng {lng})")]
    OutOfRange { id: String, lat: f64, lng: f64 },

    #[error("point {id} has unknown kind {kind:?}")]
    UnknownKind { id: String, kind: String },
}
