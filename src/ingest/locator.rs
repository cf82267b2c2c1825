//! Turning the manifest into index entries.

use log::{debug, info, warn};

use crate::datasource::FileIndex;
use crate::ingest::manifest::ManifestPattern;
use crate::models::{DataSource, VirtualFileEntry};

/// Query the index for every manifest path (image mode).
///
/// Matches are concatenated in manifest order; an entry matched by two
/// patterns appears twice. A failing query counts as zero matches.
pub fn locate_image_entries(
    index: &dyn FileIndex,
    source: &DataSource,
    manifest: &[String],
) -> Vec<VirtualFileEntry> {
    let mut located = Vec::new();

    for raw in manifest {
        let Some(pattern) = ManifestPattern::parse(raw) else {
            warn!("Ignoring manifest path '{}'", raw);
            continue;
        };

        match index.find_files(source, &pattern.name, pattern.directory.as_deref()) {
            Ok(entries) => {
                debug!("'{}' matched {} entries", raw, entries.len());
                located.extend(entries);
            }
            Err(e) => {
                warn!(
                    "Index query for '{}' failed in data source {}: {:#}",
                    raw,
                    source.id,
                    anyhow::Error::new(e)
                );
            }
        }
    }

    info!(
        "Located {} entries for {} manifest paths in '{}'",
        located.len(),
        manifest.len(),
        source.name
    );
    located
}

/// Archives of a logical collection that are handed to the tool one by one.
///
/// Keeps entries that live on local disk, have an extension, are not
/// virtual and whose name contains one of `archive_markers`
/// (case-insensitive). Index order is preserved.
pub fn logical_candidates(
    index: &dyn FileIndex,
    source: &DataSource,
    archive_markers: &[String],
) -> Vec<VirtualFileEntry> {
    let entries = match index.find_all(source) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "Listing data source {} failed: {:#}",
                source.id,
                anyhow::Error::new(e)
            );
            return Vec::new();
        }
    };

    let markers: Vec<String> = archive_markers.iter().map(|m| m.to_lowercase()).collect();
    let candidates: Vec<VirtualFileEntry> = entries
        .into_iter()
        .filter(|entry| is_candidate(entry, &markers))
        .collect();

    info!("Found {} archive candidates in '{}'", candidates.len(), source.name);
    candidates
}

fn is_candidate(entry: &VirtualFileEntry, markers: &[String]) -> bool {
    let on_disk = entry
        .local_path
        .as_ref()
        .map_or(false, |p| !p.as_os_str().is_empty());
    if !on_disk || entry.extension.is_empty() || entry.is_virtual {
        return false;
    }

    let name = entry.name.to_lowercase();
    markers.iter().any(|marker| name.contains(marker.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MemoryIndex;
    use crate::models::DataSourceKind;

    fn image() -> DataSource {
        DataSource::new(1, "iphone.img", DataSourceKind::DiskImage)
    }

    fn markers() -> Vec<String> {
        vec![".zip".to_string(), ".tar".to_string(), ".tgz".to_string()]
    }

    fn image_index(source: &DataSource) -> MemoryIndex {
        let mut index = MemoryIndex::new(source);
        index
            .add_file(VirtualFileEntry::file(1, "/a/", "x.plist", 1), "1")
            .add_file(VirtualFileEntry::file(2, "/a/", "y.plist", 1), "2")
            .add_file(VirtualFileEntry::file(3, "/b/", "name.db", 1), "3")
            .add_file(VirtualFileEntry::file(4, "/c/", "other.db", 1), "4");
        index
    }

    #[test]
    fn test_locate_aggregates_in_manifest_order() {
        let source = image();
        let index = image_index(&source);
        let manifest = vec!["/b/name.db".to_string(), "/a/*.plist".to_string()];

        let ids: Vec<u64> = locate_image_entries(&index, &source, &manifest)
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_locate_keeps_duplicates() {
        let source = image();
        let index = image_index(&source);
        let manifest = vec!["*/name.db".to_string(), "name.db".to_string()];

        let located = locate_image_entries(&index, &source, &manifest);
        assert_eq!(located.len(), 2);
        assert!(located.iter().all(|e| e.id == 3));
    }

    #[test]
    fn test_locate_skips_unparseable_paths() {
        let source = image();
        let index = image_index(&source);
        let manifest = vec!["/../../etc/passwd".to_string(), "/c/other.db".to_string()];

        let located = locate_image_entries(&index, &source, &manifest);
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].id, 4);
    }

    #[test]
    fn test_unavailable_index_yields_nothing() {
        let source = image();
        let index = image_index(&source);
        index.set_unavailable(true);

        let manifest = vec!["/a/*.plist".to_string()];
        assert!(locate_image_entries(&index, &source, &manifest).is_empty());
        assert!(logical_candidates(&index, &source, &markers()).is_empty());
    }

    #[test]
    fn test_logical_candidates_filter() {
        let source = DataSource::new(2, "export", DataSourceKind::LogicalFiles);
        let mut index = MemoryIndex::new(&source);
        index
            .add_entry(VirtualFileEntry::file(1, "/", "backup.ZIP", 10).with_local_path("/ev/backup.ZIP"))
            .add_entry(VirtualFileEntry::file(2, "/", "logs.tar.gz", 10).with_local_path("/ev/logs.tar.gz"))
            .add_entry(VirtualFileEntry::file(3, "/", "notes.txt", 10).with_local_path("/ev/notes.txt"))
            // Not on local disk
            .add_entry(VirtualFileEntry::file(4, "/", "remote.zip", 10))
            .add_entry(
                VirtualFileEntry::file(5, "/", "ghost.zip", 0)
                    .with_local_path("/ev/ghost.zip")
                    .into_virtual(),
            )
            // Marker present but no extension
            .add_entry(VirtualFileEntry::file(6, "/", "archive.zip.", 10).with_local_path("/ev/archive.zip."))
            .add_entry(VirtualFileEntry::file(7, "/", "empty.tgz", 10).with_local_path(""));

        let ids: Vec<u64> = logical_candidates(&index, &source, &markers())
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
