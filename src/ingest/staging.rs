//! Materializing index entries onto the staging filesystem.
//!
//! Entries are written to `<staging root>/<container parent path>/<name>`
//! so the external tool sees the same layout it would on the device.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::constants::DEFAULT_BUFFER_SIZE;
use crate::datasource::FileIndex;
use crate::errors::StagingError;
use crate::ingest::job::IngestJobContext;
use crate::models::VirtualFileEntry;
use crate::security::{is_unstageable_name, join_within, sanitize_entry_name, staging_relative_path};

/// Result of staging one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedEntry {
    File { path: PathBuf, bytes: u64 },
    Directory(PathBuf),
    /// Name collapses to `.`/`..`, names slack space, or is otherwise unwritable
    Skipped,
}

/// What an extraction loop left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingSummary {
    pub files: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub skipped: usize,
    pub cancelled: bool,
}

/// A real directory entries are copied into.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create the staging root (and parents) if it does not exist.
    pub fn create(root: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an entry's parent path maps to under the root.
    pub fn destination_dir(&self, entry: &VirtualFileEntry) -> Result<PathBuf, StagingError> {
        let unsafe_path = || StagingError::UnsafePath {
            id: entry.id,
            path: entry.parent_path.clone(),
        };

        let relative = staging_relative_path(&entry.parent_path).map_err(|_| unsafe_path())?;
        join_within(&self.root, &relative).map_err(|_| unsafe_path())
    }

    /// Stage one entry.
    ///
    /// Directories become (possibly empty) directories. Files are copied
    /// from the index with `:` in the name replaced by `-`; an existing file
    /// at the destination is overwritten, so staging the same entry twice
    /// leaves one identical copy.
    pub fn materialize(
        &self,
        index: &dyn FileIndex,
        entry: &VirtualFileEntry,
    ) -> Result<StagedEntry, StagingError> {
        let parent = self.destination_dir(entry)?;
        let name = sanitize_entry_name(&entry.name);

        if entry.is_dir {
            if matches!(name.as_str(), "" | "." | "..")
                || name.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
            {
                return Ok(StagedEntry::Skipped);
            }
            let dir = parent.join(&name);
            fs::create_dir_all(&dir).map_err(|source| StagingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            return Ok(StagedEntry::Directory(dir));
        }

        if is_unstageable_name(&name) {
            debug!("Not staging '{}' (id={})", entry.name, entry.id);
            return Ok(StagedEntry::Skipped);
        }

        fs::create_dir_all(&parent).map_err(|source| StagingError::CreateDir {
            path: parent.clone(),
            source,
        })?;

        let dest = parent.join(&name);
        let reader = index.open_content(entry).map_err(|source| StagingError::Open {
            id: entry.id,
            name: entry.name.clone(),
            source,
        })?;

        match copy_content(entry, reader, &dest) {
            Ok(bytes) => Ok(StagedEntry::File { path: dest, bytes }),
            Err(e) => {
                // Leave no truncated copy behind for the tool to parse
                let _ = fs::remove_file(&dest);
                Err(e)
            }
        }
    }

    /// Stage entries in order, polling for cancellation before each one.
    ///
    /// A failing entry is logged and skipped. Cancellation stops the loop
    /// without touching anything already staged.
    pub fn extract_all(
        &self,
        index: &dyn FileIndex,
        entries: &[VirtualFileEntry],
        job: &dyn IngestJobContext,
    ) -> StagingSummary {
        let mut summary = StagingSummary::default();

        for (position, entry) in entries.iter().enumerate() {
            if job.is_cancelled() {
                info!("Extraction cancelled after {} of {} entries", position, entries.len());
                summary.cancelled = true;
                break;
            }

            job.progress(&format!("Extracting {}", entry.unique_path()), Some(position));

            match self.materialize(index, entry) {
                Ok(StagedEntry::File { path, .. }) => summary.files.push(path),
                Ok(StagedEntry::Directory(path)) => summary.directories.push(path),
                Ok(StagedEntry::Skipped) => summary.skipped += 1,
                Err(e) => {
                    warn!(
                        "Failed to stage '{}' (id={}): {:#}",
                        entry.unique_path(),
                        entry.id,
                        anyhow::Error::new(e)
                    );
                }
            }
        }

        summary
    }
}

fn copy_content(
    entry: &VirtualFileEntry,
    mut reader: Box<dyn Read>,
    dest: &Path,
) -> Result<u64, StagingError> {
    let write_err = |source| StagingError::Write {
        id: entry.id,
        path: dest.to_path_buf(),
        source,
    };

    let file = File::create(dest).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let read = reader.read(&mut buffer).map_err(|source| StagingError::Read {
            id: entry.id,
            name: entry.name.clone(),
            source,
        })?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read]).map_err(write_err)?;
        total += read as u64;
    }

    writer.flush().map_err(write_err)?;
    Ok(total)
}
