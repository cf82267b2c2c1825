use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the leapp-ingest tool.
///
/// Global options control logging and configuration; the subcommand picks
/// between running an analysis pass and writing a default configuration.
#[derive(Parser, Debug)]
#[clap(
    name = "leapp-ingest",
    version,
    about = "Stage forensic data sources for *LEAPP analyzers and collect their reports"
)]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Also write the log to this file
    #[clap(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one analysis pass over a data source
    Run(RunOpts),

    /// Create a default configuration file
    InitConfig {
        /// Path to write the configuration file
        #[clap(default_value = "leapp_ingest.yaml")]
        path: PathBuf,
    },
}

/// Options for an analysis pass.
#[derive(ClapArgs, Debug)]
pub struct RunOpts {
    /// Directory holding the data source (mounted image or exported files)
    #[clap(short, long)]
    pub source: PathBuf,

    /// Treat the source as a logical file collection instead of an image
    #[clap(long)]
    pub logical: bool,

    /// Case directory reports and module output are written to
    #[clap(long)]
    pub case_dir: PathBuf,

    /// Identifier of the data source within the case
    #[clap(long, default_value = "1")]
    pub source_id: u64,

    /// Display name of the data source (default: the source directory name)
    #[clap(long)]
    pub source_name: Option<String>,

    /// Override the tool executable from the configuration
    #[clap(short, long)]
    pub executable: Option<PathBuf>,

    /// Run the executable through this interpreter (e.g. python3)
    #[clap(long)]
    pub interpreter: Option<PathBuf>,

    /// Kill a tool invocation after this many seconds
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Do not write the pass summary JSON
    #[clap(long)]
    pub no_summary: bool,
}
