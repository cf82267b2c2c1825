//! The analysis pipeline.
//!
//! A pass over one data source runs these stages in order:
//!
//! - [`invoker`]: runs the external tool, first to discover the paths it
//!   understands and later to analyze files
//! - [`manifest`]: loads the discovered path list
//! - [`locator`]: resolves manifest paths (image) or archive candidates
//!   (logical collection) against the file index
//! - [`staging`]: copies located entries into a real directory tree
//! - [`harvester`]: registers the report each analysis run produced
//! - [`controller`]: sequences the stages, polls for cancellation and
//!   reports progress through [`job`]
//!
//! ## Example
//!
//! ```no_run
//! use leapp_ingest::case::LocalCase;
//! use leapp_ingest::config::IngestConfig;
//! use leapp_ingest::datasource::DirectoryIndex;
//! use leapp_ingest::ingest::{AnalysisPass, CancellationFlag, JobTerminator, LoggingJob, ProcessToolRunner};
//! use leapp_ingest::models::{DataSource, DataSourceKind};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = IngestConfig::default();
//! let case = LocalCase::open(Path::new("/cases/case1"))?;
//! let source = DataSource::new(1, "iphone", DataSourceKind::DiskImage);
//! let index = DirectoryIndex::open(Path::new("/mnt/iphone"), source.clone())?;
//!
//! let cancel = CancellationFlag::new();
//! let runner = ProcessToolRunner::new(&config.tool, JobTerminator::new(cancel.clone(), None))?;
//! let job = LoggingJob::new(cancel);
//!
//! let report = AnalysisPass::new(&config, &case, &index, &runner, &job).run(&source)?;
//! println!("{} reports", report.reports.len());
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod harvester;
pub mod invoker;
pub mod job;
pub mod locator;
pub mod manifest;
pub mod staging;

pub use controller::{
    check_host_platform, create_output_dir, AnalysisPass, InvocationRecord, PassReport,
    PassStatus, StagedFile,
};
pub use harvester::{find_report_entry_point, harvest_report};
pub use invoker::{
    locate_executable, ExecutionMode, ExecutionOutcome, ExecutionSpec, ExitState, JobTerminator,
    ProcessTerminator, ProcessToolRunner, ToolRunner,
};
pub use job::{CancellationFlag, IngestJobContext, LoggingJob};
pub use locator::{locate_image_entries, logical_candidates};
pub use manifest::{load_manifest, ManifestPattern};
pub use staging::{StagedEntry, StagingArea, StagingSummary};
