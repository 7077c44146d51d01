use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the output sink the coordinator dispatches to.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The presentation target was never drawn or has already been torn down.
    #[error("output target is no longer attached")]
    Detached,

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize output object: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to decode protected secret: {0}")]
    SecretDecode(String),

    #[error("cannot open archive '{}': {reason}", path.display())]
    Access { path: PathBuf, reason: String },

    #[error("extraction failed{}: {reason}", entry.as_deref().map(|e| format!(" at '{e}'")).unwrap_or_default())]
    Extraction { entry: Option<String>, reason: String },

    #[error("integrity check failed for '{entry}': {reason}")]
    Integrity { entry: String, reason: String },

    #[error("invalid parameters: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("archive worker panicked: {0}")]
    WorkerPanicked(String),

    /// Control-flow marker for cooperative cancellation; never reported as an error record.
    #[error("operation cancelled")]
    Cancelled,
}

/// Fieldless discriminant of [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SecretDecode,
    Access,
    Extraction,
    Integrity,
    Configuration,
    Io,
    Sink,
    WorkerPanicked,
    Cancelled,
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::SecretDecode(_) => ErrorKind::SecretDecode,
            ArchiveError::Access { .. } => ErrorKind::Access,
            ArchiveError::Extraction { .. } => ErrorKind::Extraction,
            ArchiveError::Integrity { .. } => ErrorKind::Integrity,
            ArchiveError::Configuration(_) => ErrorKind::Configuration,
            ArchiveError::Io(_) => ErrorKind::Io,
            ArchiveError::Sink(_) => ErrorKind::Sink,
            ArchiveError::WorkerPanicked(_) => ErrorKind::WorkerPanicked,
            ArchiveError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub(crate) fn access(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ArchiveError::Access {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn extraction(entry: Option<&str>, reason: impl ToString) -> Self {
        ArchiveError::Extraction {
            entry: entry.map(str::to_owned),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn integrity(entry: impl Into<String>, reason: impl ToString) -> Self {
        ArchiveError::Integrity {
            entry: entry.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
