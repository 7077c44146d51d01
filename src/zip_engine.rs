use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zeroize::Zeroizing;
use zip::result::ZipResult;
use zip::ZipArchive;

use crate::config::EngineConfig;
use crate::engine::{ArchiveEngine, ArchiveSession, EngineEvents};
use crate::error::{ArchiveError, Result};
use crate::models::{ArchiveEntry, ArchiveFormat, ArchiveInformation};
use crate::parallel::verify_entries_parallel;
use crate::progress::percent_of;

pub(crate) type ZipReader = ZipArchive<BufReader<File>>;

/// Archive engine backed by the `zip` crate.
#[derive(Debug, Clone, Default)]
pub struct ZipEngine {
    config: EngineConfig,
}

impl ZipEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl ArchiveEngine for ZipEngine {
    fn open(&self, path: &Path, password: Option<&str>) -> Result<Box<dyn ArchiveSession>> {
        let file = File::open(path).map_err(|e| ArchiveError::access(path, e))?;
        let mut archive = ZipArchive::new(BufReader::with_capacity(self.config.buffer_size, file))
            .map_err(|e| ArchiveError::access(path, e))?;
        let (entries, enclosed) =
            read_entries(&mut archive).map_err(|e| ArchiveError::access(path, e))?;

        let password = password.filter(|p| !p.is_empty());
        if let Some(password) = password {
            // Verifying against the first encrypted entry rejects a wrong password up front.
            if let Some(first) = entries.iter().find(|e| e.encrypted) {
                archive
                    .by_index_decrypt(first.index, password.as_bytes())
                    .map(|_| ())
                    .map_err(|e| ArchiveError::access(path, format!("wrong password ({e})")))?;
            }
        }

        debug!("Opened {:?} with {} entries", path, entries.len());

        Ok(Box::new(ZipSession {
            path: path.to_path_buf(),
            password: password.map(|p| Zeroizing::new(p.to_string())),
            archive: Some(archive),
            entries,
            enclosed,
            events: EngineEvents::default(),
            config: self.config.clone(),
        }))
    }
}

pub struct ZipSession {
    path: PathBuf,
    password: Option<Zeroizing<String>>,
    archive: Option<ZipReader>,
    entries: Vec<ArchiveEntry>,
    /// Sanitised relative output path per entry, `None` when the name escapes.
    enclosed: Vec<Option<PathBuf>>,
    events: EngineEvents,
    config: EngineConfig,
}

impl ZipSession {
    fn password(&self) -> Option<&str> {
        self.password.as_deref().map(String::as_str)
    }
}

impl ArchiveSession for ZipSession {
    fn subscribe(&mut self, events: EngineEvents) {
        self.events = events;
    }

    fn extract(&mut self, target: &Path) -> Result<()> {
        let password = self.password.clone();
        let source = self.path.clone();
        let Self {
            archive,
            entries,
            enclosed,
            events,
            config,
            ..
        } = self;
        let archive = archive
            .as_mut()
            .ok_or_else(|| ArchiveError::extraction(None, "archive session is closed"))?;

        fs::create_dir_all(target).map_err(|e| ArchiveError::extraction(None, e))?;

        let total: u64 = entries.iter().filter(|e| !e.is_directory).map(|e| e.size).sum();
        let mut written = 0u64;
        let mut reported = 0u8;
        let mut buffer = vec![0u8; config.buffer_size];

        for (entry, enclosed) in entries.iter().zip(enclosed.iter()) {
            let out_path = enclosed_path(target, entry, enclosed.as_deref())?;

            if entry.is_directory {
                fs::create_dir_all(&out_path)
                    .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;
                continue;
            }

            if entry.encrypted && password.is_none() {
                return Err(ArchiveError::extraction(
                    Some(&entry.file_name),
                    "entry is encrypted and no password was supplied",
                ));
            }

            events.file_started(&entry.file_name);

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;
            }

            let mut reader = open_entry(archive, entry, password.as_deref().map(String::as_str))
                .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;
            let mut out = File::create(&out_path)
                .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;

            loop {
                let n = reader
                    .read(&mut buffer)
                    .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;
                if n == 0 {
                    break;
                }
                out.write_all(&buffer[..n])
                    .map_err(|e| ArchiveError::extraction(Some(&entry.file_name), e))?;

                written += n as u64;
                let percent = percent_of(written, total).min(99);
                if percent > reported {
                    reported = percent;
                    events.progress(percent);
                }
            }

            apply_permissions(&out_path, entry);
        }

        events.progress(100);
        info!("Extracted {} entries from {:?} to {:?}", entries.len(), source, target);
        Ok(())
    }

    fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        Ok(self.entries.clone())
    }

    fn check(&mut self) -> Result<()> {
        verify_entries_parallel(
            &self.path,
            self.password(),
            &self.entries,
            self.config.verify_threads,
            self.config.buffer_size,
        )
    }

    fn information(&mut self) -> Result<ArchiveInformation> {
        let packed_size = fs::metadata(&self.path)?.len();
        let files: Vec<&ArchiveEntry> = self.entries.iter().filter(|e| !e.is_directory).collect();

        Ok(ArchiveInformation {
            file_name: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            full_path: self.path.clone(),
            packed_size,
            unpacked_size: files.iter().map(|e| e.size).sum(),
            files_count: files.len(),
            files: self.entries.iter().map(|e| e.file_name.clone()).collect(),
            file_data: self.entries.clone(),
            format: ArchiveFormat::Zip,
            method: dominant_method(&files),
        })
    }

    fn close(mut self: Box<Self>) {
        if self.archive.take().is_some() {
            debug!("Closed {:?}", self.path);
        }
    }
}

impl Drop for ZipSession {
    fn drop(&mut self) {
        if self.archive.take().is_some() {
            debug!("Released {:?} without an explicit close", self.path);
        }
    }
}

fn read_entries(archive: &mut ZipReader) -> ZipResult<(Vec<ArchiveEntry>, Vec<Option<PathBuf>>)> {
    let mut entries = Vec::with_capacity(archive.len());
    let mut enclosed = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let file = archive.by_index_raw(index)?;
        enclosed.push(file.enclosed_name());
        entries.push(ArchiveEntry {
            index,
            file_name: file.name().to_string(),
            is_directory: file.is_dir(),
            size: file.size(),
            packed_size: file.compressed_size(),
            crc32: file.crc32(),
            method: format!("{:?}", file.compression()),
            encrypted: file.encrypted(),
            unix_mode: file.unix_mode(),
        });
    }
    Ok((entries, enclosed))
}

/// Opens one entry for decompressed reading, decrypting it when needed.
pub(crate) fn open_entry<'a>(
    archive: &'a mut ZipReader,
    entry: &ArchiveEntry,
    password: Option<&str>,
) -> ZipResult<impl Read + 'a> {
    match password {
        Some(password) if entry.encrypted => archive.by_index_decrypt(entry.index, password.as_bytes()),
        _ => archive.by_index(entry.index),
    }
}

fn enclosed_path(target: &Path, entry: &ArchiveEntry, enclosed: Option<&Path>) -> Result<PathBuf> {
    enclosed.map(|name| target.join(name)).ok_or_else(|| {
        ArchiveError::extraction(Some(&entry.file_name), "entry path escapes the target directory")
    })
}

#[cfg(unix)]
fn apply_permissions(path: &Path, entry: &ArchiveEntry) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = entry.unix_mode {
        if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)) {
            debug!("Could not apply mode {:o} to {:?}: {}", mode, path, e);
        }
    }
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _entry: &ArchiveEntry) {}

fn dominant_method(files: &[&ArchiveEntry]) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for entry in files {
        match counts.iter_mut().find(|(method, _)| *method == entry.method) {
            Some((_, count)) => *count += 1,
            None => counts.push((&entry.method, 1)),
        }
    }
    // Ties keep the method seen first.
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(method, _)| method.to_string())
}
