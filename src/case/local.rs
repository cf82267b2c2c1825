use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::case::CaseContext;
use crate::constants::{CASE_MODULE_DIR, CASE_REPORTS_FILE};
use crate::errors::CaseError;
use crate::models::ReportArtifact;

/// One line of the case report registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegisteredReport {
    pub path: PathBuf,
    pub module_name: String,
    pub display_name: String,
    pub added_time: String,
}

/// A case kept in a plain directory.
///
/// ```text
/// <case_dir>/
/// ├── ModuleOutput/     module working directories
/// └── reports.json      registered reports
/// ```
#[derive(Debug, Clone)]
pub struct LocalCase {
    case_dir: PathBuf,
}

impl LocalCase {
    /// Open a case directory, creating its layout if needed.
    pub fn open(case_dir: &Path) -> Result<Self> {
        fs::create_dir_all(case_dir.join(CASE_MODULE_DIR)).context(format!(
            "Failed to create case directory {}",
            case_dir.display()
        ))?;

        info!("Opened case at {}", case_dir.display());
        Ok(Self {
            case_dir: case_dir.to_path_buf(),
        })
    }

    pub fn case_dir(&self) -> &Path {
        &self.case_dir
    }

    fn registry_path(&self) -> PathBuf {
        self.case_dir.join(CASE_REPORTS_FILE)
    }

    /// Reports registered so far; an absent registry is empty.
    pub fn reports(&self) -> Result<Vec<RegisteredReport>, CaseError> {
        let path = self.registry_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| CaseError::with_source("failed to read report registry", e))?;
        serde_json::from_str(&content)
            .map_err(|e| CaseError::with_source("report registry is corrupt", e))
    }
}

impl CaseContext for LocalCase {
    fn module_directory(&self) -> PathBuf {
        self.case_dir.join(CASE_MODULE_DIR)
    }

    fn add_report(&self, report: &ReportArtifact) -> Result<(), CaseError> {
        let mut reports = self.reports()?;
        reports.push(RegisteredReport {
            path: report.path.clone(),
            module_name: report.module_name.clone(),
            display_name: report.display_name.clone(),
            added_time: chrono::Utc::now().to_rfc3339(),
        });

        let json = serde_json::to_string_pretty(&reports)
            .map_err(|e| CaseError::with_source("failed to serialize report registry", e))?;
        fs::write(self.registry_path(), json)
            .map_err(|e| CaseError::with_source("failed to write report registry", e))?;

        debug!("Registered report {}", report.path.display());
        Ok(())
    }
}
