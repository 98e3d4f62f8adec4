//! Hard failures. Everything that concerns a single file is a `ScanWarning` instead.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("project root does not exist or is not a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise project model: {0}")]
    Json(#[from] serde_json::Error),
}
