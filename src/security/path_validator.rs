//! Path validation for writing container entries under a staging root.
//!
//! Container paths come from the file index and are attacker-influenced:
//! a crafted image can name a directory `..`. Everything written to staging
//! goes through these helpers so it stays under the staging root.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};

use crate::constants::SLACK_SUFFIX;

/// Convert a container path into a path relative to the staging root.
///
/// Both `/` and `\` separate components. Root and drive prefixes are
/// dropped and `.` components ignored.
///
/// # Errors
///
/// Fails on `..` components and on embedded NUL bytes.
pub fn staging_relative_path(container_path: &str) -> Result<PathBuf> {
    if container_path.contains('\0') {
        bail!("Path contains null bytes");
    }

    let normalized = container_path.replace('\\', "/");
    let mut relative = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(name) => {
                // A Windows drive letter that survived on a unix host
                let text = name.to_string_lossy();
                if relative.as_os_str().is_empty() && is_drive_prefix(&text) {
                    continue;
                }
                relative.push(name);
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                bail!("Path traversal attempt detected: path contains '..'");
            }
        }
    }

    Ok(relative)
}

fn is_drive_prefix(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Local file name for a container entry: colons become hyphens.
pub fn sanitize_entry_name(name: &str) -> String {
    name.replace(':', "-")
}

/// Whether a sanitized name must never be written to staging.
pub fn is_unstageable_name(sanitized: &str) -> bool {
    sanitized.is_empty()
        || sanitized == "."
        || sanitized == ".."
        || sanitized.contains('/')
        || sanitized.contains('\\')
        || sanitized.contains('\0')
        || sanitized.to_lowercase().ends_with(SLACK_SUFFIX)
}

/// Join a validated relative path onto `base`, refusing anything that escapes.
pub fn join_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    for component in relative.components() {
        if !matches!(component, Component::Normal(_)) {
            bail!("Invalid path component: {:?}", component);
        }
    }
    Ok(base.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_relative_path() {
        assert_eq!(
            staging_relative_path("/private/var/mobile/").unwrap(),
            PathBuf::from("private/var/mobile")
        );
        assert_eq!(staging_relative_path("/").unwrap(), PathBuf::new());
        assert_eq!(
            staging_relative_path("./a//b/./c/").unwrap(),
            PathBuf::from("a/b/c")
        );
        assert_eq!(
            staging_relative_path("\\Users\\test\\").unwrap(),
            PathBuf::from("Users/test")
        );
        assert_eq!(
            staging_relative_path("C:/Users/test/").unwrap(),
            PathBuf::from("Users/test")
        );
    }

    #[test]
    fn test_staging_relative_path_traversal() {
        let escape_attempts = vec![
            "/../etc/",
            "../../../etc/passwd",
            "/a/b/../../../",
            "\\a\\..\\..\\",
        ];

        for attempt in escape_attempts {
            assert!(
                staging_relative_path(attempt).is_err(),
                "Failed to catch escape attempt: {}",
                attempt
            );
        }
    }

    #[test]
    fn test_staging_relative_path_null_bytes() {
        assert!(staging_relative_path("/a\0b/").is_err());
    }

    #[test]
    fn test_sanitize_entry_name() {
        assert_eq!(sanitize_entry_name("normal.db"), "normal.db");
        assert_eq!(sanitize_entry_name("file:stream:$DATA"), "file-stream-$DATA");
    }

    #[test]
    fn test_is_unstageable_name() {
        assert!(is_unstageable_name("."));
        assert!(is_unstageable_name(".."));
        assert!(is_unstageable_name(""));
        assert!(is_unstageable_name("sms.db-slack"));
        assert!(is_unstageable_name("SMS.DB-SLACK"));
        assert!(is_unstageable_name("a/b"));
        assert!(!is_unstageable_name("sms.db"));
        assert!(!is_unstageable_name(".hidden"));
        assert!(!is_unstageable_name("slack.txt"));
    }

    #[test]
    fn test_join_within() {
        let base = Path::new("/tmp/staging");
        assert_eq!(
            join_within(base, Path::new("a/b")).unwrap(),
            PathBuf::from("/tmp/staging/a/b")
        );
        assert!(join_within(base, Path::new("../x")).is_err());
        assert!(join_within(base, Path::new("/etc")).is_err());
    }
}
