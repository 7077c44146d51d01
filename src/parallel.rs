use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;
use zip::ZipArchive;

use crate::error::{ArchiveError, Result};
use crate::models::ArchiveEntry;
use crate::zip_engine::open_entry;

/// Decompresses every file entry to validate its checksum, spreading the entries
/// over `threads` workers. Each chunk opens its own reader so no archive handle
/// is shared between threads.
pub fn verify_entries_parallel(
    archive_path: &Path,
    password: Option<&str>,
    entries: &[ArchiveEntry],
    threads: usize,
    buffer_size: usize,
) -> Result<()> {
    let files: Vec<&ArchiveEntry> = entries.iter().filter(|e| !e.is_directory).collect();
    if files.is_empty() {
        return Ok(());
    }

    let threads = threads.clamp(1, files.len());
    let chunk_size = files.len().div_ceil(threads);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("zip-verify-{i}"))
        .build()
        .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?;

    debug!(
        "Verifying {} entries of {:?} on {} threads",
        files.len(),
        archive_path,
        threads
    );

    pool.install(|| {
        files
            .par_chunks(chunk_size)
            .try_for_each(|chunk| verify_chunk(archive_path, password, chunk, buffer_size))
    })
}

fn verify_chunk(
    archive_path: &Path,
    password: Option<&str>,
    chunk: &[&ArchiveEntry],
    buffer_size: usize,
) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::access(archive_path, e))?;
    let mut archive = ZipArchive::new(BufReader::with_capacity(buffer_size, file))
        .map_err(|e| ArchiveError::access(archive_path, e))?;
    let mut buffer = vec![0u8; buffer_size];

    for entry in chunk {
        if entry.encrypted && password.is_none() {
            return Err(ArchiveError::integrity(
                &entry.file_name,
                "entry is encrypted and no password was supplied",
            ));
        }

        let mut reader = open_entry(&mut archive, entry, password)
            .map_err(|e| ArchiveError::integrity(&entry.file_name, e))?;
        // The zip reader validates the CRC once the entry is read to the end.
        loop {
            let n = reader
                .read(&mut buffer)
                .map_err(|e| ArchiveError::integrity(&entry.file_name, e))?;
            if n == 0 {
                break;
            }
        }
    }
    Ok(())
}
