use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the export engine.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Rejected configuration; nothing was allocated or written.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Output directory or artifact write failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding failure.
    #[error("failed to encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// `step()` was called on a run that already reached a terminal state.
    #[error("export run is not active")]
    NotRunning,
}

pub type Result<T> = std::result::Result<T, ExportError>;
