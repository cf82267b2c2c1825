use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use leapp_ingest::case::{CaseContext, LocalCase};
use leapp_ingest::cli::{Args, Commands, RunOpts};
use leapp_ingest::config::{load_or_create_config, IngestConfig};
use leapp_ingest::datasource::DirectoryIndex;
use leapp_ingest::ingest::{
    AnalysisPass, CancellationFlag, JobTerminator, LoggingJob, PassReport, ProcessToolRunner,
};
use leapp_ingest::models::{DataSource, DataSourceKind};
use leapp_ingest::utils::summary::create_pass_summary;

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose, args.log_file.as_deref())?;

    match &args.command {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            IngestConfig::create_default_config_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
        Commands::Run(opts) => run_pass(&args, opts),
    }
}

/// Initialize terminal logging, plus a log file when requested
fn initialize_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file {
        let file = File::create(path)
            .context(format!("Failed to create log file {}", path.display()))?;
        loggers.push(WriteLogger::new(log_level, Config::default(), file));
    }

    CombinedLogger::init(loggers).context("Failed to initialize logger")?;
    Ok(())
}

/// Load configuration and apply command-line overrides
fn load_and_process_config(args: &Args, opts: &RunOpts) -> Result<IngestConfig> {
    let mut config = load_or_create_config(args.config.as_deref())?;

    if let Some(executable) = &opts.executable {
        config.tool.executable = executable.clone();
    }
    if let Some(interpreter) = &opts.interpreter {
        config.tool.interpreter = Some(interpreter.clone());
    }
    if let Some(timeout) = opts.timeout {
        config.tool.timeout_secs = Some(timeout);
    }
    if opts.no_summary {
        config.pass.write_summary = false;
    }

    config.process_environment_variables();
    Ok(config)
}

/// Cancel the pass on Ctrl+C
fn install_interrupt_handler(cancel: &CancellationFlag) -> Result<()> {
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling after the current unit of work");
        flag.cancel();
    })
    .context("Failed to set Ctrl+C handler")
}

fn run_pass(args: &Args, opts: &RunOpts) -> Result<()> {
    let config = load_and_process_config(args, opts)?;

    let kind = if opts.logical {
        DataSourceKind::LogicalFiles
    } else {
        DataSourceKind::DiskImage
    };
    let name = opts.source_name.clone().unwrap_or_else(|| {
        opts.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| opts.source.display().to_string())
    });
    let source = DataSource::new(opts.source_id, name, kind);

    let case = LocalCase::open(&opts.case_dir)?;
    let index = DirectoryIndex::open(&opts.source, source.clone())?;
    info!("Indexed {} entries in {}", index.len(), opts.source.display());

    let cancel = CancellationFlag::new();
    install_interrupt_handler(&cancel)?;

    let timeout = config.tool.timeout_secs.map(Duration::from_secs);
    let runner = ProcessToolRunner::new(&config.tool, JobTerminator::new(cancel.clone(), timeout))?;
    let job = LoggingJob::new(cancel);

    let pass = AnalysisPass::new(&config, &case, &index, &runner, &job);
    let report = pass
        .run(&source)
        .context(format!("{} pass over '{}' failed", config.tool.name, source.name))?;

    if config.pass.write_summary {
        let summary_dir = pass.tool_directory();
        if let Err(e) = write_pass_summary(&summary_dir, &source, &config, &report) {
            warn!("Failed to write pass summary: {:#}", e);
        }
    }

    info!(
        "{} pass {}: {} staged files, {} invocations, {} reports registered in {}",
        config.tool.name,
        if report.is_cancelled() { "cancelled" } else { "completed" },
        report.staged_files.len(),
        report.invocations.len(),
        report.reports.len(),
        case.module_directory().display()
    );
    Ok(())
}

/// Write pass_summary_<id>.json into the tool's module directory
fn write_pass_summary(
    summary_dir: &Path,
    source: &DataSource,
    config: &IngestConfig,
    report: &PassReport,
) -> Result<()> {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let timestamp = chrono::Utc::now().to_rfc3339();

    let summary = create_pass_summary(&hostname, &timestamp, source, &config.tool, report)?;
    let path = summary_dir.join(format!("pass_summary_{}.json", source.id));
    fs::write(&path, summary).context(format!("Failed to write summary to {}", path.display()))?;

    info!("Wrote pass summary to {}", path.display());
    Ok(())
}
