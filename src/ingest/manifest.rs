//! The tool's self-reported path manifest.
//!
//! A discovery run (`-p`) prints one glob per line, preceded by a banner:
//!
//! ```text
//! iLEAPP: path list generation for iOS artifacts
//! */mobile/Library/SMS/sms.db*
//! **/Library/Preferences/com.apple.springboard.plist
//! ```
//!
//! [`load_manifest`] keeps the path lines verbatim (trimmed);
//! [`ManifestPattern::parse`] turns one line into an index query.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, warn};

use crate::constants::{INDEX_WILDCARD, MANIFEST_BANNER, MANIFEST_MIN_LINE_LEN, TOOL_WILDCARD};
use crate::errors::ManifestReadError;

/// Read a manifest file into its ordered path lines.
///
/// Blank lines, lines shorter than two characters and banner lines are
/// skipped. Duplicates are kept. A manifest that does not exist yields an
/// empty list. Lines that are not valid UTF-8 are decoded lossily.
///
/// # Errors
///
/// [`ManifestReadError`] when the file exists but cannot be opened or read.
pub fn load_manifest(path: &Path) -> Result<Vec<String>, ManifestReadError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Path manifest {} was not produced", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ManifestReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut paths = Vec::new();
    for (number, bytes) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = bytes.map_err(|source| ManifestReadError {
            path: path.to_path_buf(),
            source,
        })?;

        // The tool writes in the host code page, not always UTF-8
        let line = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = line {
            debug!(
                "Manifest line {} in {} is not valid UTF-8, decoded lossily",
                number + 1,
                path.display()
            );
        }

        if let Some(entry) = manifest_line(&line) {
            paths.push(entry.to_string());
        }
    }

    debug!("Loaded {} paths from {}", paths.len(), path.display());
    Ok(paths)
}

/// The path carried by one manifest line, if any.
pub fn manifest_line(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.chars().count() < MANIFEST_MIN_LINE_LEN || trimmed.contains(MANIFEST_BANNER) {
        return None;
    }
    Some(trimmed)
}

/// A manifest path split into an index query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPattern {
    /// Name pattern with index wildcards
    pub name: String,
    /// Parent directory fragment (`a/b/`), `None` for a bare name
    pub directory: Option<String>,
}

impl ManifestPattern {
    /// Normalize a manifest path and split it into directory and name.
    ///
    /// `*` becomes the index wildcard, `\` becomes `/`, `.` segments and
    /// repeated separators collapse and `..` folds into its parent. The
    /// directory part loses its root, so `/a/b.db` queries parent paths
    /// containing `a/`. Returns `None` for paths that climb above their root
    /// or name no file.
    pub fn parse(raw: &str) -> Option<Self> {
        let substituted = raw
            .replace(TOOL_WILDCARD, INDEX_WILDCARD)
            .replace('\\', "/");

        let mut segments: Vec<&str> = Vec::new();
        for segment in substituted.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                s => segments.push(s),
            }
        }

        // A trailing separator names a directory, not a file
        if substituted.ends_with('/') {
            return None;
        }

        let name = segments.pop()?.to_string();
        let directory = if segments.is_empty() {
            None
        } else {
            Some(format!("{}/", segments.join("/")))
        };

        Some(Self { name, directory })
    }
}
