//! # leapp-ingest
//!
//! Drives the *LEAPP family of mobile forensic parsers (iLEAPP, ALEAPP)
//! against forensic data sources and collects the reports they produce.
//!
//! ## Overview
//!
//! The external tool only understands real directories and files, while a
//! data source is reachable only through a file index. A pass bridges the
//! two: it asks the tool which paths it can parse, copies the matching
//! entries out of the data source into a staging tree, runs the tool over
//! that tree (and over individual archives of a logical collection) and
//! registers every HTML report with the case.
//!
//! ## Features
//!
//! - **Manifest-driven extraction**: only the paths the tool asks for are staged
//! - **Logical collections**: archives are analyzed one by one, then the
//!   whole collection as a filesystem
//! - **Cooperative cancellation**: polled between units of work; a running
//!   tool is killed by the process terminator
//! - **Failure tolerance**: a failing entry or invocation is logged and skipped
//! - **Chain of custody**: SHA-256 of staged files and a JSON pass summary
//!
//! ## Usage
//!
//! ```no_run
//! use leapp_ingest::case::LocalCase;
//! use leapp_ingest::config::load_or_create_config;
//! use leapp_ingest::datasource::DirectoryIndex;
//! use leapp_ingest::ingest::{AnalysisPass, CancellationFlag, JobTerminator, LoggingJob, ProcessToolRunner};
//! use leapp_ingest::models::{DataSource, DataSourceKind};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = load_or_create_config(None)?;
//! let case = LocalCase::open(Path::new("/cases/case1"))?;
//! let source = DataSource::new(1, "export", DataSourceKind::LogicalFiles);
//! let index = DirectoryIndex::open(Path::new("/evidence/export"), source.clone())?;
//!
//! let cancel = CancellationFlag::new();
//! let runner = ProcessToolRunner::new(&config.tool, JobTerminator::new(cancel.clone(), None))?;
//! let job = LoggingJob::new(cancel);
//!
//! let report = AnalysisPass::new(&config, &case, &index, &runner, &job).run(&source)?;
//! println!("Registered {} reports", report.reports.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Data sources, index entries and report artifacts
//! - [`datasource`]: The file index consumed by the pipeline
//! - [`case`]: The case layer reports are registered with
//! - [`ingest`]: The pipeline stages and the pass controller
//! - [`config`]: YAML configuration
//! - [`errors`]: Typed pipeline errors
//! - [`security`]: Path validation for staging
//! - [`utils`]: Hashing and pass summaries
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models shared by the pipeline stages
pub mod models;

/// File index service and its implementations
pub mod datasource;

/// Case layer: module directory and report registry
pub mod case;

/// Analysis pipeline
pub mod ingest;

/// Configuration management
pub mod config;

/// Error types of the pipeline
pub mod errors;

/// Security utilities for path validation
pub mod security;

/// Hashing and summary utilities
pub mod utils;

/// Application constants and configuration values
pub mod constants;

/// Test fixtures
pub mod test_utils;
