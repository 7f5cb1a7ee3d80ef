use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading the exported record.
///
/// All of these are surfaced before any browser work starts; the caller
/// aborts the run without side effects.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("record file unreadable: {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record is not valid JSON: {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
