//! Case layer consumed by the pipeline.
//!
//! A pass needs two things from the open case: the directory modules write
//! their output under, and a registry to add generated reports to.

use std::path::PathBuf;

use crate::errors::CaseError;
use crate::models::ReportArtifact;

/// Case directory on local disk with a JSON report registry
pub mod local;

pub use local::LocalCase;

/// Handle to the case a pass runs in.
#[cfg_attr(test, mockall::automock)]
pub trait CaseContext {
    /// Root directory for module output.
    fn module_directory(&self) -> PathBuf;

    /// Register a generated report with the case.
    fn add_report(&self, report: &ReportArtifact) -> Result<(), CaseError>;
}
