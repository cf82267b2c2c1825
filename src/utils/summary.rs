use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::config::ToolSettings;
use crate::ingest::{ExitState, PassReport, PassStatus};
use crate::models::DataSource;

/// Create a JSON summary of an analysis pass.
///
/// The summary is written next to the tool output so an examiner can see
/// what was staged (with hashes), which invocations ran and how they ended,
/// and which reports were registered.
///
/// # Example Output
///
/// ```json
/// {
///   "pass_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "examiner-01",
///   "tool": "iLeapp",
///   "data_source": { "id": 1, "name": "iphone.img", "kind": "DiskImage" },
///   "status": "completed",
///   "staged_files": [...],
///   "invocations": [...],
///   "reports": [...]
/// }
/// ```
pub fn create_pass_summary(
    hostname: &str,
    timestamp: &str,
    source: &DataSource,
    tool: &ToolSettings,
    report: &PassReport,
) -> Result<String> {
    let staged_files: Vec<_> = report
        .staged_files
        .iter()
        .map(|file| {
            json!({
                "path": file.path,
                "sha256": file.sha256,
            })
        })
        .collect();

    let invocations: Vec<_> = report
        .invocations
        .iter()
        .map(|invocation| {
            let (launched, terminated, exit_code) = match invocation.state {
                None => (false, false, None),
                Some(ExitState::Terminated) => (true, true, None),
                Some(ExitState::Completed { exit_code }) => (true, false, exit_code),
            };
            json!({
                "mode": invocation.mode.to_string(),
                "output_dir": invocation.output_dir,
                "launched": launched,
                "terminated": terminated,
                "exit_code": exit_code,
            })
        })
        .collect();

    let reports: Vec<_> = report
        .reports
        .iter()
        .map(|artifact| {
            json!({
                "path": artifact.path,
                "module_name": artifact.module_name,
                "display_name": artifact.display_name,
            })
        })
        .collect();

    let status = match report.status {
        PassStatus::Completed => "completed",
        PassStatus::Cancelled => "cancelled",
    };

    let summary = json!({
        "pass_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "pass_time": timestamp,
        "os_version": std::env::consts::OS,
        "ingest_version": env!("CARGO_PKG_VERSION"),
        "tool": tool.name,
        "executable": tool.executable,
        "data_source": source,
        "status": status,
        "staging_root": report.staging_root,
        "staged_files": staged_files,
        "invocations": invocations,
        "reports": reports,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize pass summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{ExecutionMode, InvocationRecord, StagedFile};
    use crate::models::{DataSourceKind, ReportArtifact};
    use serde_json::Value;
    use std::path::PathBuf;

    fn test_report() -> PassReport {
        PassReport {
            status: PassStatus::Completed,
            staging_root: PathBuf::from("/case/ModuleOutput/iLeapp/fs_1"),
            staged_files: vec![StagedFile {
                path: PathBuf::from("/case/ModuleOutput/iLeapp/fs_1/b/name.db"),
                sha256: Some("ab12".to_string()),
            }],
            invocations: vec![
                InvocationRecord {
                    mode: ExecutionMode::AnalyzeFile {
                        type_tag: "zip".to_string(),
                    },
                    output_dir: PathBuf::from("/out/1"),
                    state: None,
                },
                InvocationRecord {
                    mode: ExecutionMode::AnalyzeFilesystem,
                    output_dir: PathBuf::from("/out/2"),
                    state: Some(ExitState::Completed { exit_code: Some(1) }),
                },
            ],
            reports: vec![ReportArtifact {
                path: PathBuf::from("/out/2/index.html"),
                module_name: "iLeapp Analyzer".to_string(),
                display_name: "iLeapp Html Report".to_string(),
            }],
        }
    }

    #[test]
    fn test_pass_summary_fields() {
        let source = DataSource::new(1, "iphone.img", DataSourceKind::DiskImage);
        let json_str = create_pass_summary(
            "test-host",
            "2024-01-01T00:00:00Z",
            &source,
            &ToolSettings::default(),
            &test_report(),
        )
        .unwrap();
        let json: Value = serde_json::from_str(&json_str).unwrap();

        assert_eq!(json["hostname"], "test-host");
        assert_eq!(json["tool"], "iLeapp");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["data_source"]["id"], 1);
        assert_eq!(json["data_source"]["kind"], "DiskImage");
        assert!(json["pass_id"].is_string());

        assert_eq!(json["staged_files"][0]["sha256"], "ab12");
        assert_eq!(json["invocations"][0]["mode"], "analyze-file");
        assert_eq!(json["invocations"][0]["launched"], false);
        assert_eq!(json["invocations"][1]["exit_code"], 1);
        assert_eq!(json["reports"][0]["display_name"], "iLeapp Html Report");
    }

    #[test]
    fn test_unique_pass_ids() {
        let source = DataSource::new(1, "iphone.img", DataSourceKind::DiskImage);
        let tool = ToolSettings::default();
        let report = test_report();

        let first: Value =
            serde_json::from_str(&create_pass_summary("h", "t", &source, &tool, &report).unwrap()).unwrap();
        let second: Value =
            serde_json::from_str(&create_pass_summary("h", "t", &source, &tool, &report).unwrap()).unwrap();

        assert_ne!(first["pass_id"], second["pass_id"]);
    }
}
