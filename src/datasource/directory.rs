use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::datasource::{entry_matches, FileIndex, LikePattern};
use crate::errors::IndexError;
use crate::models::{DataSource, DataSourceKind, VirtualFileEntry};

/// A directory on local disk indexed as a data source.
///
/// For a [`DataSourceKind::DiskImage`] source (an image mounted or exported
/// to a directory) entries carry no local path and content is only served
/// through [`FileIndex::open_content`]. For a
/// [`DataSourceKind::LogicalFiles`] source every file carries its absolute
/// local path, as files added to a case as a logical collection do.
pub struct DirectoryIndex {
    source: DataSource,
    root: PathBuf,
    entries: Vec<VirtualFileEntry>,
    locations: HashMap<u64, PathBuf>,
}

impl DirectoryIndex {
    /// Walk `root` and index everything below it.
    pub fn open(root: &Path, source: DataSource) -> Result<Self> {
        let root = root
            .canonicalize()
            .context(format!("Failed to resolve data source root {}", root.display()))?;

        info!("Indexing data source {} at {}", source.name, root.display());

        let mut entries = Vec::new();
        let mut locations = HashMap::new();
        let mut next_id = 1u64;

        for item in WalkDir::new(&root).min_depth(1).follow_links(false) {
            let item = match item {
                Ok(item) => item,
                Err(e) => {
                    warn!("Skipping unreadable path under {}: {}", root.display(), e);
                    continue;
                }
            };

            let path = item.path();
            // Links may point outside the evidence tree
            if item.path_is_symlink() {
                debug!("Skipping symbolic link {}", path.display());
                continue;
            }

            let relative = match path.strip_prefix(&root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };

            let name = item.file_name().to_string_lossy().to_string();
            let parent_path = container_parent_path(relative);
            let id = next_id;
            next_id += 1;

            let mut entry = if item.file_type().is_dir() {
                VirtualFileEntry::directory(id, &parent_path, &name)
            } else {
                let size = item.metadata().map(|m| m.len()).unwrap_or(0);
                VirtualFileEntry::file(id, &parent_path, &name, size)
            };

            if source.kind == DataSourceKind::LogicalFiles && !entry.is_dir {
                entry.local_path = Some(path.to_path_buf());
            }

            locations.insert(id, path.to_path_buf());
            entries.push(entry);
        }

        debug!("Indexed {} entries from {}", entries.len(), root.display());

        Ok(Self {
            source,
            root,
            entries,
            locations,
        })
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `/a/b/` style parent path of a root-relative path.
fn container_parent_path(relative: &Path) -> String {
    let mut parent = String::from("/");
    if let Some(dir) = relative.parent() {
        for component in dir.components() {
            parent.push_str(&component.as_os_str().to_string_lossy());
            parent.push('/');
        }
    }
    parent
}

impl FileIndex for DirectoryIndex {
    fn find_files(
        &self,
        source: &DataSource,
        name: &str,
        parent_path: Option<&str>,
    ) -> Result<Vec<VirtualFileEntry>, IndexError> {
        if source.id != self.source.id {
            return Err(IndexError::Unavailable(format!(
                "data source {} is not indexed here",
                source.id
            )));
        }

        let name = LikePattern::new(name)?;
        let parent = parent_path.map(LikePattern::containing).transpose()?;

        Ok(self
            .entries
            .iter()
            .filter(|entry| entry_matches(entry, &name, parent.as_ref()))
            .cloned()
            .collect())
    }

    fn open_content(&self, entry: &VirtualFileEntry) -> Result<Box<dyn Read>, IndexError> {
        let path = self
            .locations
            .get(&entry.id)
            .ok_or(IndexError::NoContent { id: entry.id })?;

        let file = File::open(path).map_err(|source| IndexError::Read {
            id: entry.id,
            source,
        })?;
        Ok(Box::new(file))
    }
}
