#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::FileOptions;
use zip::{AesMode, CompressionMethod, ZipWriter};

use zip_runner::{ErrorKind, ErrorRecord, OutputObject, OutputSink, ProgressState, SinkError};

/// Writes the two-file sample archive: a.txt (10 bytes) and b/c.txt (20 bytes).
pub fn sample_zip(path: &Path, password: Option<&str>) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for (name, data) in [("a.txt", &[b'a'; 10][..]), ("b/c.txt", &[b'c'; 20][..])] {
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);
        let options = match password {
            Some(pw) => options.with_aes_encryption(AesMode::Aes256, pw),
            None => options,
        };
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[derive(Debug)]
pub enum Recorded {
    Progress(ProgressState),
    Verbose(String),
    Error(ErrorKind),
    Object(OutputObject),
}

/// Records everything dispatched to it, in order.
#[derive(Default)]
pub struct RecordingSink {
    pub seen: Vec<Recorded>,
}

impl RecordingSink {
    pub fn verbose(&self) -> Vec<&str> {
        self.seen
            .iter()
            .filter_map(|r| match r {
                Recorded::Verbose(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.seen
            .iter()
            .filter_map(|r| match r {
                Recorded::Progress(p) => Some(p.percent()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorKind> {
        self.seen
            .iter()
            .filter_map(|r| match r {
                Recorded::Error(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn objects(&self) -> Vec<&OutputObject> {
        self.seen
            .iter()
            .filter_map(|r| match r {
                Recorded::Object(object) => Some(object),
                _ => None,
            })
            .collect()
    }

    pub fn terminal(&self) -> Option<&ProgressState> {
        match self.seen.last() {
            Some(Recorded::Progress(p)) if p.is_completed() => Some(p),
            _ => None,
        }
    }
}

impl OutputSink for RecordingSink {
    fn write_progress(&mut self, progress: &ProgressState) -> Result<(), SinkError> {
        self.seen.push(Recorded::Progress(progress.clone()));
        Ok(())
    }

    fn write_verbose(&mut self, line: &str) -> Result<(), SinkError> {
        self.seen.push(Recorded::Verbose(line.to_string()));
        Ok(())
    }

    fn write_error(&mut self, record: &ErrorRecord) -> Result<(), SinkError> {
        self.seen.push(Recorded::Error(record.cause.kind()));
        Ok(())
    }

    fn write_object(&mut self, object: &OutputObject) -> Result<(), SinkError> {
        self.seen.push(Recorded::Object(object.clone()));
        Ok(())
    }
}
