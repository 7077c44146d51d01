use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::{ArchiveError, ErrorKind};
use crate::models::{ArchiveEntry, ArchiveInformation};
use crate::progress::ProgressState;

pub const WORKER_ERROR_ID: &str = "ArchiveWorkerFailure";

/// Everything a worker can hand back to the invoking thread.
#[derive(Debug)]
pub enum Message {
    Log(String),
    Progress(ProgressState),
    Error(ErrorRecord),
    Object(OutputObject),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    NotSpecified,
    OpenError,
    WriteError,
    InvalidData,
    SecurityError,
    InvalidArgument,
}

impl From<ErrorKind> for ErrorCategory {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Access => ErrorCategory::OpenError,
            ErrorKind::Extraction | ErrorKind::Io => ErrorCategory::WriteError,
            ErrorKind::Integrity => ErrorCategory::InvalidData,
            ErrorKind::SecretDecode => ErrorCategory::SecurityError,
            ErrorKind::Configuration => ErrorCategory::InvalidArgument,
            ErrorKind::Sink | ErrorKind::WorkerPanicked | ErrorKind::Cancelled => {
                ErrorCategory::NotSpecified
            }
        }
    }
}

/// A non-fatal failure reported through the output channel.
#[derive(Debug)]
pub struct ErrorRecord {
    pub cause: ArchiveError,
    pub error_id: &'static str,
    pub category: ErrorCategory,
    pub target: Option<PathBuf>,
}

impl ErrorRecord {
    pub fn new(cause: ArchiveError, target: Option<PathBuf>) -> Self {
        Self {
            category: cause.kind().into(),
            error_id: WORKER_ERROR_ID,
            cause,
            target,
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {})", self.cause, self.category, self.error_id)
    }
}

/// Result objects written to the caller's object stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutputObject {
    Entry(ArchiveEntry),
    Information(ArchiveInformation),
}
