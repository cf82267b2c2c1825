//! One analysis pass over one data source.
//!
//! ```text
//! staging root ── discover-paths ── load manifest
//!                                       │
//!         image ────────────────────────┼──────────────── logical
//!   locate → extract_all                │       for each archive:
//!   analyze-filesystem(staging)         │         analyze-file → harvest
//!   harvest                             │       analyze-filesystem(staging)
//!                                       │       harvest
//!                              completion message
//! ```
//!
//! Cancellation is polled before discovery, before every entry or archive
//! and before the filesystem analysis. A cancelled pass is not an error.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::case::CaseContext;
use crate::config::{IngestConfig, PassSettings, ToolSettings};
use crate::constants::{OUTPUT_DIR_TIME_FORMAT, STAGING_DIR_PREFIX};
use crate::datasource::FileIndex;
use crate::errors::PassError;
use crate::ingest::harvester::harvest_report;
use crate::ingest::invoker::{ExecutionMode, ExecutionSpec, ExitState, ToolRunner};
use crate::ingest::job::IngestJobContext;
use crate::ingest::locator::{locate_image_entries, logical_candidates};
use crate::ingest::manifest::load_manifest;
use crate::ingest::staging::StagingArea;
use crate::models::{DataSource, ReportArtifact};
use crate::utils::hash::calculate_sha256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassStatus {
    Completed,
    Cancelled,
}

/// A file written to the staging root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub path: PathBuf,
    pub sha256: Option<String>,
}

/// One analysis invocation the pass attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    pub mode: ExecutionMode,
    pub output_dir: PathBuf,
    /// `None` when the tool could not be launched
    pub state: Option<ExitState>,
}

/// What a non-fatal pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub status: PassStatus,
    pub staging_root: PathBuf,
    pub staged_files: Vec<StagedFile>,
    pub invocations: Vec<InvocationRecord>,
    pub reports: Vec<ReportArtifact>,
}

impl PassReport {
    fn new(staging_root: PathBuf) -> Self {
        Self {
            status: PassStatus::Completed,
            staging_root,
            staged_files: Vec::new(),
            invocations: Vec::new(),
            reports: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PassStatus::Cancelled
    }
}

/// Fail when the tool is packaged for another host OS.
pub fn check_host_platform(tool: &ToolSettings) -> Result<(), PassError> {
    match &tool.required_os {
        Some(required) if !required.eq_ignore_ascii_case(std::env::consts::OS) => {
            Err(PassError::UnsupportedPlatform {
                tool: tool.name.clone(),
                required: required.clone(),
                actual: std::env::consts::OS.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Create a fresh timestamped directory under `base`.
///
/// A name that is already taken gets a `_1`, `_2`, ... suffix.
pub fn create_output_dir(base: &Path, now: DateTime<Utc>) -> io::Result<PathBuf> {
    fs::create_dir_all(base)?;

    let stamp = now.format(OUTPUT_DIR_TIME_FORMAT).to_string();
    let mut candidate = base.join(&stamp);
    let mut counter = 1;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                candidate = base.join(format!("{}_{}", stamp, counter));
                counter += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Everything a pass needs, passed in explicitly.
pub struct AnalysisPass<'a> {
    tool: &'a ToolSettings,
    settings: &'a PassSettings,
    case: &'a dyn CaseContext,
    index: &'a dyn FileIndex,
    runner: &'a dyn ToolRunner,
    job: &'a dyn IngestJobContext,
}

impl<'a> AnalysisPass<'a> {
    pub fn new(
        config: &'a IngestConfig,
        case: &'a dyn CaseContext,
        index: &'a dyn FileIndex,
        runner: &'a dyn ToolRunner,
        job: &'a dyn IngestJobContext,
    ) -> Self {
        Self {
            tool: &config.tool,
            settings: &config.pass,
            case,
            index,
            runner,
            job,
        }
    }

    /// `<module dir>/<tool>/`, parent of every directory a pass creates.
    pub fn tool_directory(&self) -> PathBuf {
        self.case.module_directory().join(&self.tool.name)
    }

    /// `<module dir>/<tool>/fs_<id>`
    pub fn staging_root(&self, source: &DataSource) -> PathBuf {
        self.tool_directory()
            .join(format!("{}{}", STAGING_DIR_PREFIX, source.id))
    }

    /// Run the pass.
    ///
    /// # Errors
    ///
    /// Only pass-fatal conditions: wrong host platform, an uncreatable
    /// staging root, a discovery run that cannot be launched and a manifest
    /// that cannot be read. Per-entry and per-invocation failures are logged
    /// and the pass goes on.
    pub fn run(&self, source: &DataSource) -> Result<PassReport, PassError> {
        check_host_platform(self.tool)?;

        let staging_root = self.staging_root(source);
        let staging = StagingArea::create(&staging_root).map_err(|e| PassError::StagingRoot {
            path: staging_root.clone(),
            source: e,
        })?;
        let mut report = PassReport::new(staging_root);

        info!(
            "Starting {} pass over '{}' (id={})",
            self.tool.name, source.name, source.id
        );

        if self.job.is_cancelled() {
            return Ok(self.finish(report, PassStatus::Cancelled));
        }

        let manifest = self.discover_paths(staging.root())?;
        self.job
            .progress(&format!("Starting {}", self.tool.name), Some(0));

        let status = if source.is_logical() {
            self.analyze_logical(source, staging.root(), &mut report)
        } else {
            self.analyze_image(source, &staging, &manifest, &mut report)
        };

        Ok(self.finish(report, status))
    }

    fn discover_paths(&self, staging_root: &Path) -> Result<Vec<String>, PassError> {
        let spec = ExecutionSpec::discover_paths(self.tool, staging_root);
        let outcome = self.runner.run(&spec).map_err(PassError::DiscoveryLaunch)?;

        match outcome.state {
            ExitState::Completed { exit_code: Some(0) } => {}
            state => warn!(
                "{} path discovery ended with {:?}, continuing with whatever it wrote",
                self.tool.name, state
            ),
        }

        Ok(load_manifest(&outcome.stdout_path)?)
    }

    fn analyze_image(
        &self,
        source: &DataSource,
        staging: &StagingArea,
        manifest: &[String],
        report: &mut PassReport,
    ) -> PassStatus {
        let located = locate_image_entries(self.index, source, manifest);
        self.job.switch_to_determinate(located.len());

        let summary = staging.extract_all(self.index, &located, self.job);
        info!(
            "Staged {} files and {} directories ({} skipped)",
            summary.files.len(),
            summary.directories.len(),
            summary.skipped
        );
        // An entry matched by several manifest lines is written more than once
        let mut seen = HashSet::new();
        report.staged_files = summary
            .files
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .map(|path| self.staged_file(path))
            .collect();

        if summary.cancelled || self.job.is_cancelled() {
            return PassStatus::Cancelled;
        }

        self.analyze_filesystem(staging.root(), report);
        PassStatus::Completed
    }

    fn analyze_logical(
        &self,
        source: &DataSource,
        staging_root: &Path,
        report: &mut PassReport,
    ) -> PassStatus {
        let candidates = logical_candidates(self.index, source, &self.settings.archive_markers);
        self.job.switch_to_determinate(candidates.len());

        for (processed, candidate) in candidates.iter().enumerate() {
            if self.job.is_cancelled() {
                info!(
                    "Cancelled after {} of {} archives",
                    processed,
                    candidates.len()
                );
                return PassStatus::Cancelled;
            }

            // Filtered to entries with a local path
            let Some(local_path) = candidate.local_path.as_deref() else {
                continue;
            };

            self.job
                .progress(&format!("Processing {}", candidate.name), Some(processed));

            let Some(output_dir) = self.new_output_dir() else {
                continue;
            };
            let spec = ExecutionSpec::analyze_file(self.tool, local_path, &candidate.extension, &output_dir);
            self.invoke_and_harvest(spec, report);
        }

        if self.job.is_cancelled() {
            return PassStatus::Cancelled;
        }

        // The collection may itself be an exported filesystem
        self.analyze_filesystem(staging_root, report);
        PassStatus::Completed
    }

    fn analyze_filesystem(&self, staging_root: &Path, report: &mut PassReport) {
        self.job
            .progress(&format!("Running {} over extracted files", self.tool.name), None);

        if let Some(output_dir) = self.new_output_dir() {
            let spec = ExecutionSpec::analyze_filesystem(self.tool, staging_root, &output_dir);
            self.invoke_and_harvest(spec, report);
        }
    }

    fn new_output_dir(&self) -> Option<PathBuf> {
        let base = self.tool_directory();
        match create_output_dir(&base, Utc::now()) {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(
                    "Error creating {} output directory under {}: {}",
                    self.tool.name,
                    base.display(),
                    e
                );
                None
            }
        }
    }

    fn invoke_and_harvest(&self, spec: ExecutionSpec, report: &mut PassReport) {
        let state = match self.runner.run(&spec) {
            Ok(outcome) => Some(outcome.state),
            Err(e) => {
                warn!(
                    "Error running {} ({}) on {}: {:#}",
                    self.tool.name,
                    spec.mode,
                    spec.input
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    anyhow::Error::new(e)
                );
                None
            }
        };

        if state.is_some() {
            if let Some(artifact) = harvest_report(&spec.output_dir, self.tool, self.case) {
                report.reports.push(artifact);
            }
        }

        report.invocations.push(InvocationRecord {
            mode: spec.mode,
            output_dir: spec.output_dir,
            state,
        });
    }

    fn staged_file(&self, path: PathBuf) -> StagedFile {
        if !self.settings.hash_staged_files {
            return StagedFile { path, sha256: None };
        }

        let sha256 = match calculate_sha256(&path, self.settings.max_hash_size_mb) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Failed to hash {}: {}", path.display(), e);
                None
            }
        };
        StagedFile { path, sha256 }
    }

    fn finish(&self, mut report: PassReport, status: PassStatus) -> PassReport {
        report.status = status;

        let details = match status {
            PassStatus::Completed => format!("{} Processing Completed", self.tool.name),
            PassStatus::Cancelled => format!("{} Processing Cancelled", self.tool.name),
        };
        self.job.post_message(&self.tool.name, &details);

        debug!(
            "{} pass finished: {} staged files, {} invocations, {} reports",
            self.tool.name,
            report.staged_files.len(),
            report.invocations.len(),
            report.reports.len()
        );
        report
    }
}
