//! Upload failure taxonomy.
//!
//! Every failed upload is sorted into exactly one [`FailureKind`]. Only
//! [`FailureKind::Systemic`] has an effect beyond the task that hit it.

use std::path::PathBuf;

/// How the orchestrator reacts to a failed upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Local file unreadable or media type rejected. Skip with a warning.
    Unsupported,
    /// Remote side is failing broadly. Stop dispatching new work.
    Systemic,
    /// Anything else. Log and carry on.
    Other,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("can't read {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported media type {mime} for {path}")]
    UnsupportedMedia { path: PathBuf, mime: String },
    #[error("server returned {errors} internal errors in a row")]
    SystemicOverload { errors: u32 },
    #[error("server rejected upload ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl UploadError {
    pub fn kind(&self) -> FailureKind {
        match self {
            UploadError::LocalRead { .. } | UploadError::UnsupportedMedia { .. } => {
                FailureKind::Unsupported
            }
            UploadError::SystemicOverload { .. } => FailureKind::Systemic,
            UploadError::Server { .. } | UploadError::Transport(_) => FailureKind::Other,
        }
    }
}
