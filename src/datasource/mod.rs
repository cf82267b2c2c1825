//! File index service consumed by the pipeline.
//!
//! The pipeline never walks a forensic container itself; it asks a
//! [`FileIndex`] for entries by name and parent path and for the byte
//! content of the entries it decides to stage.
//!
//! Two implementations ship with the crate:
//!
//! - [`DirectoryIndex`]: a directory tree on local disk presented as a
//!   data source (a mounted image or an exported logical collection)
//! - [`MemoryIndex`]: caller-supplied entries and contents

use std::io::Read;

use crate::constants::INDEX_WILDCARD;
use crate::errors::IndexError;
use crate::models::{DataSource, VirtualFileEntry};

/// Local directory tree presented as a data source
pub mod directory;

/// In-memory entries
pub mod memory;

/// SQL `LIKE` matching used by the index queries
pub mod pattern;

pub use directory::DirectoryIndex;
pub use memory::MemoryIndex;
pub use pattern::LikePattern;

/// Query and content access over the indexed entries of a data source.
pub trait FileIndex {
    /// Entries whose name matches `name` (`LIKE` semantics) and, when given,
    /// whose parent path contains `parent_path`.
    fn find_files(
        &self,
        source: &DataSource,
        name: &str,
        parent_path: Option<&str>,
    ) -> Result<Vec<VirtualFileEntry>, IndexError>;

    /// Open the byte content of a file entry.
    fn open_content(&self, entry: &VirtualFileEntry) -> Result<Box<dyn Read>, IndexError>;

    /// Every entry under the root of the data source.
    fn find_all(&self, source: &DataSource) -> Result<Vec<VirtualFileEntry>, IndexError> {
        self.find_files(source, INDEX_WILDCARD, Some("/"))
    }
}

/// Apply a name/parent query to one entry.
pub(crate) fn entry_matches(
    entry: &VirtualFileEntry,
    name: &LikePattern,
    parent: Option<&LikePattern>,
) -> bool {
    name.matches(&entry.name) && parent.map_or(true, |p| p.matches(&entry.parent_path))
}
