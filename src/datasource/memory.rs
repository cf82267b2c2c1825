use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::datasource::{entry_matches, FileIndex, LikePattern};
use crate::errors::IndexError;
use crate::models::{DataSource, VirtualFileEntry};

/// An index over entries the caller already holds.
///
/// Entries are returned in insertion order. An entry added without content
/// fails on [`FileIndex::open_content`], and [`MemoryIndex::set_unavailable`]
/// makes every query fail, which is how an unreachable case database looks
/// to the pipeline.
#[derive(Default)]
pub struct MemoryIndex {
    source_id: u64,
    entries: Vec<VirtualFileEntry>,
    contents: HashMap<u64, Vec<u8>>,
    unavailable: AtomicBool,
}

impl MemoryIndex {
    pub fn new(source: &DataSource) -> Self {
        Self {
            source_id: source.id,
            ..Self::default()
        }
    }

    /// Add a directory or an entry whose content cannot be read.
    pub fn add_entry(&mut self, entry: VirtualFileEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Add a file entry with its byte content.
    pub fn add_file(&mut self, entry: VirtualFileEntry, content: impl Into<Vec<u8>>) -> &mut Self {
        self.contents.insert(entry.id, content.into());
        self.entries.push(entry);
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn entries(&self) -> &[VirtualFileEntry] {
        &self.entries
    }
}

impl FileIndex for MemoryIndex {
    fn find_files(
        &self,
        source: &DataSource,
        name: &str,
        parent_path: Option<&str>,
    ) -> Result<Vec<VirtualFileEntry>, IndexError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IndexError::Unavailable("index offline".to_string()));
        }
        if source.id != self.source_id {
            return Ok(Vec::new());
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
        let content = self
            .contents
            .get(&entry.id)
            .ok_or(IndexError::NoContent { id: entry.id })?;
        Ok(Box::new(Cursor::new(content.clone())))
    }
}
