use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{ArchiveSession, EngineEvents};
use crate::error::Result;
use crate::message::OutputObject;
use crate::models::ArchiveIdentity;
use crate::utils::resolve_path;
use crate::worker::{ArchiveOperation, WorkerOutput};

/// Expands one archive into a target directory.
pub struct ExtractOperation {
    target: PathBuf,
}

impl ExtractOperation {
    pub fn new(base_dir: &Path, target: impl AsRef<Path>) -> Self {
        Self {
            target: resolve_path(base_dir, target.as_ref()),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl ArchiveOperation for ExtractOperation {
    fn prepare(&mut self, archive: &ArchiveIdentity, output: &WorkerOutput) {
        output.write(format!("Extracting archive \"{}\"", archive.path().display()));
        output.begin(
            format!(
                "Extracting \"{}\" to \"{}\"",
                archive.file_name(),
                self.target.display()
            ),
            "Extracting",
        );
    }

    fn run(
        &mut self,
        session: &mut dyn ArchiveSession,
        archive: &ArchiveIdentity,
        output: &WorkerOutput,
    ) -> Result<()> {
        let on_progress = output.clone();
        let on_file = output.clone();
        session.subscribe(EngineEvents {
            on_progress: Some(Box::new(move |percent| on_progress.advance(percent))),
            on_file_started: Some(Box::new(move |name| {
                let line = format!("Extracting file \"{name}\"");
                on_file.write(line.as_str());
                on_file.set_status(line);
            })),
        });

        session.extract(&self.target)?;

        debug!("Extraction of {:?} complete", archive.path());
        output.write("Extraction finished");
        Ok(())
    }
}

/// Writes one result object per archive entry.
#[derive(Debug, Default)]
pub struct ListOperation;

impl ArchiveOperation for ListOperation {
    fn prepare(&mut self, archive: &ArchiveIdentity, output: &WorkerOutput) {
        output.write(format!("Getting archive data {}", archive.path().display()));
        output.begin("Listing archive entries", archive.file_name());
    }

    fn run(
        &mut self,
        session: &mut dyn ArchiveSession,
        _archive: &ArchiveIdentity,
        output: &WorkerOutput,
    ) -> Result<()> {
        for entry in session.entries()? {
            output.write_object(OutputObject::Entry(entry));
        }
        Ok(())
    }
}

/// Verifies an archive and writes its aggregate information.
#[derive(Debug, Default)]
pub struct InspectOperation;

impl ArchiveOperation for InspectOperation {
    fn prepare(&mut self, archive: &ArchiveIdentity, output: &WorkerOutput) {
        output.write(format!("Getting archive data {}", archive.path().display()));
        output.begin("Inspecting archive", archive.file_name());
    }

    fn run(
        &mut self,
        session: &mut dyn ArchiveSession,
        _archive: &ArchiveIdentity,
        output: &WorkerOutput,
    ) -> Result<()> {
        session.check()?;
        let information = session.information()?;
        output.write_object(OutputObject::Information(information));
        Ok(())
    }
}
