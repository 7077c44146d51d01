//! Contract between workers and the archive format engine.

use std::path::Path;

use crate::error::Result;
use crate::models::{ArchiveEntry, ArchiveInformation};

pub type ProgressCallback = Box<dyn FnMut(u8) + Send>;
pub type FileStartedCallback = Box<dyn FnMut(&str) + Send>;

/// Callbacks an engine session invokes synchronously while it works.
#[derive(Default)]
pub struct EngineEvents {
    pub on_progress: Option<ProgressCallback>,
    pub on_file_started: Option<FileStartedCallback>,
}

impl EngineEvents {
    pub fn progress(&mut self, percent: u8) {
        if let Some(callback) = self.on_progress.as_mut() {
            callback(percent);
        }
    }

    pub fn file_started(&mut self, name: &str) {
        if let Some(callback) = self.on_file_started.as_mut() {
            callback(name);
        }
    }
}

pub trait ArchiveEngine: Send + Sync {
    /// Opens an archive session. Any failure here is an access error.
    fn open(&self, path: &Path, password: Option<&str>) -> Result<Box<dyn ArchiveSession>>;
}

/// One opened archive. Native resources are released by [`close`](ArchiveSession::close)
/// or, on early exits, when the session is dropped.
pub trait ArchiveSession: Send {
    fn subscribe(&mut self, events: EngineEvents);

    fn extract(&mut self, target: &Path) -> Result<()>;

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>>;

    fn check(&mut self) -> Result<()>;

    fn information(&mut self) -> Result<ArchiveInformation>;

    fn close(self: Box<Self>);
}
