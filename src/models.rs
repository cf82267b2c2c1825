use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of forensic container behind a data source.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    /// A disk image whose files are only reachable through the index
    DiskImage,
    /// A logical collection of files that already live on local disk
    LogicalFiles,
}

/// Read-only handle to the container being analyzed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub id: u64,
    pub name: String,
    pub kind: DataSourceKind,
}

impl DataSource {
    pub fn new(id: u64, name: impl Into<String>, kind: DataSourceKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    pub fn is_logical(&self) -> bool {
        self.kind == DataSourceKind::LogicalFiles
    }
}

/// One indexed file or directory inside a data source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VirtualFileEntry {
    pub id: u64,
    pub name: String,
    /// Lowercase extension without the dot, empty when there is none
    pub extension: String,
    /// Container-relative parent path, `/`-separated with a trailing slash
    pub parent_path: String,
    pub size: u64,
    /// No extractable content (synthesized placeholder)
    pub is_virtual: bool,
    /// Set only when the entry is itself a file on local disk
    pub local_path: Option<PathBuf>,
    pub is_dir: bool,
}

impl VirtualFileEntry {
    /// Build a regular file entry, deriving the extension from the name.
    pub fn file(id: u64, parent_path: &str, name: &str, size: u64) -> Self {
        Self {
            id,
            name: name.to_string(),
            extension: extension_of(name),
            parent_path: parent_path.to_string(),
            size,
            is_virtual: false,
            local_path: None,
            is_dir: false,
        }
    }

    /// Build a directory entry.
    pub fn directory(id: u64, parent_path: &str, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            extension: String::new(),
            parent_path: parent_path.to_string(),
            size: 0,
            is_virtual: false,
            local_path: None,
            is_dir: true,
        }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn into_virtual(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Container-relative path of the entry itself.
    pub fn unique_path(&self) -> String {
        format!("{}{}", self.parent_path, self.name)
    }
}

/// Lowercase extension of a file name, empty for dot-files and names without one.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => name[idx + 1..].to_lowercase(),
        _ => String::new(),
    }
}

/// A report entry point registered with the case.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub path: PathBuf,
    pub module_name: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("evidence.ZIP"), "zip");
        assert_eq!(extension_of("backup.tar.gz"), "gz");
        assert_eq!(extension_of("Manifest"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of("trailing."), "");
    }

    #[test]
    fn test_entry_builders() {
        let file = VirtualFileEntry::file(7, "/private/var/", "sms.db", 4096);
        assert_eq!(file.extension, "db");
        assert!(!file.is_dir);
        assert_eq!(file.unique_path(), "/private/var/sms.db");

        let dir = VirtualFileEntry::directory(8, "/private/", "var");
        assert!(dir.is_dir);
        assert!(dir.extension.is_empty());

        let logical = VirtualFileEntry::file(9, "/", "evidence.zip", 1)
            .with_local_path("/cases/evidence.zip");
        assert_eq!(logical.local_path, Some(PathBuf::from("/cases/evidence.zip")));
    }

    #[test]
    fn test_data_source_kind() {
        let image = DataSource::new(1, "phone.E01", DataSourceKind::DiskImage);
        let logical = DataSource::new(2, "export", DataSourceKind::LogicalFiles);
        assert!(!image.is_logical());
        assert!(logical.is_logical());
    }
}
