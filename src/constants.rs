//! Global constants for the leapp-ingest pipeline.
//!
//! This module centralizes the fixed names and markers shared by the
//! external tool contract and the pipeline stages.

// Buffer sizes
/// Default buffer size for staging copies (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Interval at which a running tool process is polled for exit or termination
pub const PROCESS_POLL_INTERVAL_MS: u64 = 100;

// External tool contract
/// Default tool name; also the module output sub-directory
pub const DEFAULT_TOOL_NAME: &str = "iLeapp";

/// Default executable name for the packaged tool
pub const DEFAULT_EXECUTABLE_NAME: &str = "ileapp.exe";

/// Flag asking the tool to print its path manifest
pub const DISCOVER_PATHS_FLAG: &str = "-p";

/// Flag carrying the input type tag (`fs` or an extension)
pub const TYPE_FLAG: &str = "-t";

/// Flag carrying the input path
pub const INPUT_FLAG: &str = "-i";

/// Flag carrying the output directory
pub const OUTPUT_FLAG: &str = "-o";

/// Type tag used when the input is an extracted filesystem tree
pub const FILESYSTEM_TYPE_TAG: &str = "fs";

/// Environment override that lets the tool run with the invoker's privileges
pub const COMPAT_LAYER_VAR: &str = "__COMPAT_LAYER";
pub const COMPAT_LAYER_VALUE: &str = "RunAsInvoker";

// Manifest format
/// Banner substring printed by the tool ahead of its path list
pub const MANIFEST_BANNER: &str = "path list generation";

/// Lines shorter than this are never paths
pub const MANIFEST_MIN_LINE_LEN: usize = 2;

/// Wildcard used by the tool's manifest globs
pub const TOOL_WILDCARD: char = '*';

/// Wildcard understood by the file index (SQL LIKE)
pub const INDEX_WILDCARD: &str = "%";

// Staging
/// Prefix of the per-data-source staging directory
pub const STAGING_DIR_PREFIX: &str = "fs_";

/// Suffix of slack-space pseudo files that are never staged
pub const SLACK_SUFFIX: &str = "-slack";

/// Timestamp format for per-invocation output directories
pub const OUTPUT_DIR_TIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S UTC";

// Logical collections
/// Name markers of archives handed to the tool file by file
pub const DEFAULT_ARCHIVE_MARKERS: &[&str] = &[".zip", ".tar", ".tgz"];

// Reports
/// Entry point of the tool's HTML report
pub const REPORT_ENTRY_POINT: &str = "index.html";

// Case layout
/// Module output directory inside a local case
pub const CASE_MODULE_DIR: &str = "ModuleOutput";

/// Report registry file inside a local case
pub const CASE_REPORTS_FILE: &str = "reports.json";

// Default file names
pub const DEFAULT_CONFIG_NAME: &str = "leapp_ingest.yaml";
