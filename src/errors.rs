//! Error types of the ingest pipeline.
//!
//! Errors are split by how far they are allowed to travel: [`PassError`]
//! ends a pass, everything else is handled inside the unit of work that
//! produced it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Conditions that abort a whole analysis pass.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("{tool} requires host OS '{required}', running on '{actual}'")]
    UnsupportedPlatform {
        tool: String,
        required: String,
        actual: String,
    },

    #[error("{} executable not found", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("failed to create staging directory {}", path.display())]
    StagingRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run path discovery")]
    DiscoveryLaunch(#[source] InvokeError),

    #[error(transparent)]
    ManifestRead(#[from] ManifestReadError),
}

/// The manifest exists but could not be read.
#[derive(Debug, Error)]
#[error("failed to read path manifest {}", path.display())]
pub struct ManifestReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Failures of the file index service.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("file index unavailable: {0}")]
    Unavailable(String),

    #[error("invalid index query '{pattern}'")]
    InvalidQuery {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("no content for entry {id}")]
    NoContent { id: u64 },

    #[error("failed to open content of entry {id}")]
    Read {
        id: u64,
        #[source]
        source: io::Error,
    },
}

/// Failures launching or supervising the external tool.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("failed to open redirect target {}", path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch {}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for {}", program.display())]
    Wait {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures staging a single entry.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("unsafe container path '{path}' for entry {id}")]
    UnsafePath { id: u64, path: String },

    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading file '{name}' (id={id})")]
    Read {
        id: u64,
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("error opening file '{name}' (id={id})")]
    Open {
        id: u64,
        name: String,
        #[source]
        source: IndexError,
    },

    #[error("error writing local file '{}' (id={id})", path.display())]
    Write {
        id: u64,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The case layer refused an operation.
#[derive(Debug, Error)]
#[error("case error: {message}")]
pub struct CaseError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CaseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
