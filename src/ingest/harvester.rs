//! Finding and registering the report an invocation produced.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::case::CaseContext;
use crate::config::ToolSettings;
use crate::models::ReportArtifact;

/// First file under `output_dir` whose lowercase name ends with `entry_point`.
///
/// The walk is depth-first in directory order. Entries that cannot be read
/// are logged and skipped.
pub fn find_report_entry_point(output_dir: &Path, entry_point: &str) -> Option<PathBuf> {
    let wanted = entry_point.to_lowercase();

    for entry in WalkDir::new(output_dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking report directory {}: {}", output_dir.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(&wanted) {
            return Some(entry.into_path());
        }
    }

    None
}

/// Register the report found in `output_dir`, if there is one.
///
/// A missing report is not an error. A case that refuses the registration
/// is logged and the artifact is still returned.
pub fn harvest_report(
    output_dir: &Path,
    tool: &ToolSettings,
    case: &dyn CaseContext,
) -> Option<ReportArtifact> {
    let Some(path) = find_report_entry_point(output_dir, tool.report_entry_point()) else {
        debug!("No report in {}", output_dir.display());
        return None;
    };

    let artifact = ReportArtifact {
        path,
        module_name: tool.module_name(),
        display_name: tool.report_display_name(),
    };

    match case.add_report(&artifact) {
        Ok(()) => info!("Added report {}", artifact.path.display()),
        Err(e) => warn!(
            "Failed to add report {}: {:#}",
            artifact.path.display(),
            anyhow::Error::new(e)
        ),
    }

    Some(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::MockCaseContext;
    use crate::errors::CaseError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_nested_report_case_insensitively() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("iLEAPP_Reports_2024").join("_HTML");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("iLeapp_out.txt"), "log").unwrap();
        fs::write(nested.join("Index.HTML"), "<html/>").unwrap();

        let found = find_report_entry_point(temp_dir.path(), "index.html").unwrap();
        assert_eq!(found, nested.join("Index.HTML"));
    }

    #[test]
    fn test_suffix_match_and_directories_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("index.html")).unwrap();
        assert!(find_report_entry_point(temp_dir.path(), "index.html").is_none());

        fs::write(temp_dir.path().join("_index.html"), "").unwrap();
        assert!(find_report_entry_point(temp_dir.path(), "index.html").is_some());
    }

    #[test]
    fn test_missing_output_dir_has_no_report() {
        let temp_dir = TempDir::new().unwrap();
        assert!(find_report_entry_point(&temp_dir.path().join("gone"), "index.html").is_none());
    }

    #[test]
    fn test_harvest_registers_report() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "").unwrap();

        let mut case = MockCaseContext::new();
        case.expect_add_report()
            .withf(|r| r.display_name == "iLeapp Html Report" && r.module_name == "iLeapp Analyzer")
            .times(1)
            .returning(|_| Ok(()));

        let artifact = harvest_report(temp_dir.path(), &ToolSettings::default(), &case).unwrap();
        assert_eq!(artifact.path, temp_dir.path().join("index.html"));
    }

    #[test]
    fn test_harvest_without_report_does_not_register() {
        let temp_dir = TempDir::new().unwrap();
        let mut case = MockCaseContext::new();
        case.expect_add_report().never();

        assert!(harvest_report(temp_dir.path(), &ToolSettings::default(), &case).is_none());
    }

    #[test]
    fn test_case_failure_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("index.html"), "").unwrap();

        let mut case = MockCaseContext::new();
        case.expect_add_report()
            .times(1)
            .returning(|_| Err(CaseError::new("case closed")));

        assert!(harvest_report(temp_dir.path(), &ToolSettings::default(), &case).is_some());
    }
}
