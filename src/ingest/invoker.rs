//! Running the external *LEAPP tool.
//!
//! Every invocation is described by an [`ExecutionSpec`]; the pipeline hands
//! specs to a [`ToolRunner`] and never assembles argument lists itself.
//!
//! ```text
//! discover-paths      <tool> -p                         > <name>_paths.txt
//! analyze-file        <tool> -t <ext> -i <file> -o <dir> > <name>_out.txt
//! analyze-filesystem  <tool> -t fs -i <dir> -o <dir>     > <name>_out.txt
//! ```

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::ToolSettings;
use crate::constants::{
    DISCOVER_PATHS_FLAG, FILESYSTEM_TYPE_TAG, INPUT_FLAG, OUTPUT_FLAG, PROCESS_POLL_INTERVAL_MS,
    TYPE_FLAG,
};
use crate::errors::{InvokeError, PassError};
use crate::ingest::job::CancellationFlag;

/// What an invocation asks the tool to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Print the manifest of paths the tool can parse
    DiscoverPaths,
    /// Parse one file; the tag is the file's extension
    AnalyzeFile { type_tag: String },
    /// Parse an extracted filesystem tree
    AnalyzeFilesystem,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::DiscoverPaths => write!(f, "discover-paths"),
            ExecutionMode::AnalyzeFile { .. } => write!(f, "analyze-file"),
            ExecutionMode::AnalyzeFilesystem => write!(f, "analyze-filesystem"),
        }
    }
}

/// Parameters of one external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSpec {
    pub mode: ExecutionMode,
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

impl ExecutionSpec {
    /// Manifest discovery; stdout is the manifest itself.
    pub fn discover_paths(tool: &ToolSettings, output_dir: &Path) -> Self {
        Self {
            mode: ExecutionMode::DiscoverPaths,
            input: None,
            output_dir: output_dir.to_path_buf(),
            stdout_path: output_dir.join(tool.manifest_file_name()),
            stderr_path: output_dir.join(tool.manifest_error_file_name()),
        }
    }

    pub fn analyze_file(tool: &ToolSettings, input: &Path, extension: &str, output_dir: &Path) -> Self {
        Self {
            mode: ExecutionMode::AnalyzeFile {
                type_tag: extension.to_lowercase(),
            },
            input: Some(input.to_path_buf()),
            output_dir: output_dir.to_path_buf(),
            stdout_path: output_dir.join(tool.stdout_file_name()),
            stderr_path: output_dir.join(tool.stderr_file_name()),
        }
    }

    pub fn analyze_filesystem(tool: &ToolSettings, input: &Path, output_dir: &Path) -> Self {
        Self {
            mode: ExecutionMode::AnalyzeFilesystem,
            input: Some(input.to_path_buf()),
            output_dir: output_dir.to_path_buf(),
            stdout_path: output_dir.join(tool.stdout_file_name()),
            stderr_path: output_dir.join(tool.stderr_file_name()),
        }
    }

    /// Tool arguments, excluding the program itself.
    pub fn arguments(&self) -> Vec<OsString> {
        let type_tag = match &self.mode {
            ExecutionMode::DiscoverPaths => return vec![OsString::from(DISCOVER_PATHS_FLAG)],
            ExecutionMode::AnalyzeFile { type_tag } => type_tag.as_str(),
            ExecutionMode::AnalyzeFilesystem => FILESYSTEM_TYPE_TAG,
        };

        let mut args = vec![OsString::from(TYPE_FLAG), OsString::from(type_tag)];
        if let Some(input) = &self.input {
            args.push(OsString::from(INPUT_FLAG));
            args.push(input.as_os_str().to_os_string());
        }
        args.push(OsString::from(OUTPUT_FLAG));
        args.push(self.output_dir.as_os_str().to_os_string());
        args
    }
}

/// How an invocation that did launch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited on its own; `None` when killed by a signal we did not send
    Completed { exit_code: Option<i32> },
    /// Killed by the terminator
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub state: ExitState,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

impl ExecutionOutcome {
    pub fn completed(spec: &ExecutionSpec, exit_code: i32) -> Self {
        Self {
            state: ExitState::Completed {
                exit_code: Some(exit_code),
            },
            stdout_path: spec.stdout_path.clone(),
            stderr_path: spec.stderr_path.clone(),
        }
    }

    pub fn terminated(spec: &ExecutionSpec) -> Self {
        Self {
            state: ExitState::Terminated,
            stdout_path: spec.stdout_path.clone(),
            stderr_path: spec.stderr_path.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == ExitState::Completed { exit_code: Some(0) }
    }
}

/// Runs an [`ExecutionSpec`] to completion.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner {
    /// `Err` only when the process could not be started or supervised;
    /// a nonzero exit is a successful run with that exit code.
    fn run(&self, spec: &ExecutionSpec) -> Result<ExecutionOutcome, InvokeError>;
}

/// Decides when a running tool must be killed.
pub trait ProcessTerminator {
    fn should_terminate(&self, elapsed: Duration) -> bool;
}

/// Kills the tool when the job is cancelled or the timeout elapses.
#[derive(Debug, Clone)]
pub struct JobTerminator {
    cancel: CancellationFlag,
    timeout: Option<Duration>,
}

impl JobTerminator {
    pub fn new(cancel: CancellationFlag, timeout: Option<Duration>) -> Self {
        Self { cancel, timeout }
    }
}

impl ProcessTerminator for JobTerminator {
    fn should_terminate(&self, elapsed: Duration) -> bool {
        self.cancel.is_cancelled() || self.timeout.map_or(false, |limit| elapsed >= limit)
    }
}

/// Resolve the configured executable.
///
/// A bare name that does not exist relative to the working directory is
/// searched on `PATH`. Without an interpreter the file must be executable;
/// with one it only has to exist.
pub fn locate_executable(tool: &ToolSettings) -> Result<PathBuf, PassError> {
    let configured = &tool.executable;
    let candidate = if configured.components().count() == 1 && !configured.exists() {
        search_path(configured).unwrap_or_else(|| configured.clone())
    } else {
        configured.clone()
    };

    let usable = candidate.is_file() && (tool.interpreter.is_some() || is_executable(&candidate));
    if !usable {
        warn!("{} executable not found at {}", tool.name, candidate.display());
        return Err(PassError::ExecutableNotFound(candidate));
    }

    debug!("Using {} executable {}", tool.name, candidate.display());
    Ok(candidate)
}

fn search_path(name: &Path) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Runs the tool as a child process with redirected output.
pub struct ProcessToolRunner {
    program: PathBuf,
    interpreter: Option<PathBuf>,
    environment: HashMap<String, String>,
    terminator: Box<dyn ProcessTerminator>,
}

impl ProcessToolRunner {
    /// Build a runner for the configured tool.
    ///
    /// # Errors
    ///
    /// [`PassError::ExecutableNotFound`] when the executable cannot be located.
    pub fn new(tool: &ToolSettings, terminator: impl ProcessTerminator + 'static) -> Result<Self, PassError> {
        let program = locate_executable(tool)?;
        Ok(Self {
            program,
            interpreter: tool.interpreter.clone(),
            environment: tool.environment.clone(),
            terminator: Box::new(terminator),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The fully configured command for a spec.
    pub fn command(&self, spec: &ExecutionSpec) -> Result<Command, InvokeError> {
        let redirect = |path: &Path| {
            File::create(path).map_err(|source| InvokeError::Redirect {
                path: path.to_path_buf(),
                source,
            })
        };
        let stdout = redirect(&spec.stdout_path)?;
        let stderr = redirect(&spec.stderr_path)?;

        let mut command = match &self.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&self.program);
                command
            }
            None => Command::new(&self.program),
        };

        command
            .args(spec.arguments())
            .envs(&self.environment)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        Ok(command)
    }

    fn supervise(&self, child: &mut Child, spec: &ExecutionSpec) -> Result<ExecutionOutcome, InvokeError> {
        let started = Instant::now();
        let poll = Duration::from_millis(PROCESS_POLL_INTERVAL_MS);

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Ok(ExecutionOutcome {
                        state: ExitState::Completed {
                            exit_code: status.code(),
                        },
                        stdout_path: spec.stdout_path.clone(),
                        stderr_path: spec.stderr_path.clone(),
                    })
                }
                Ok(None) => {}
                Err(source) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(InvokeError::Wait {
                        program: self.program.clone(),
                        source,
                    });
                }
            }

            if self.terminator.should_terminate(started.elapsed()) {
                info!("Terminating {} ({}) after {:?}", self.program.display(), spec.mode, started.elapsed());
                if let Err(e) = child.kill() {
                    warn!("Failed to kill {}: {}", self.program.display(), e);
                }
                let _ = child.wait();
                return Ok(ExecutionOutcome::terminated(spec));
            }

            thread::sleep(poll);
        }
    }
}

impl ToolRunner for ProcessToolRunner {
    fn run(&self, spec: &ExecutionSpec) -> Result<ExecutionOutcome, InvokeError> {
        let mut command = self.command(spec)?;
        debug!("Running {:?}", command);

        let mut child = command.spawn().map_err(|source| InvokeError::Launch {
            program: self.program.clone(),
            source,
        })?;

        let outcome = self.supervise(&mut child, spec)?;
        match outcome.state {
            ExitState::Completed { exit_code: Some(0) } => {
                debug!("{} finished ({})", self.program.display(), spec.mode)
            }
            ExitState::Completed { exit_code } => warn!(
                "{} ({}) exited with {:?}, see {}",
                self.program.display(),
                spec.mode,
                exit_code,
                spec.stderr_path.display()
            ),
            ExitState::Terminated => {}
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tool() -> ToolSettings {
        ToolSettings::default()
    }

    #[test]
    fn test_discover_paths_spec() {
        let out = Path::new("/case/ModuleOutput/iLeapp/fs_7");
        let spec = ExecutionSpec::discover_paths(&tool(), out);

        assert_eq!(spec.mode.to_string(), "discover-paths");
        assert_eq!(spec.arguments(), vec![OsString::from("-p")]);
        assert_eq!(spec.stdout_path, out.join("iLeapp_paths.txt"));
        assert_eq!(spec.stderr_path, out.join("iLeapp_paths_error.txt"));
    }

    #[test]
    fn test_analyze_specs() {
        let out = Path::new("/out");
        let file = ExecutionSpec::analyze_file(&tool(), Path::new("/data/evidence.zip"), "ZIP", out);
        assert_eq!(
            file.arguments(),
            ["-t", "zip", "-i", "/data/evidence.zip", "-o", "/out"]
                .iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
        assert_eq!(file.stdout_path, out.join("iLeapp_out.txt"));
        assert_eq!(file.stderr_path, out.join("iLeapp_err.txt"));

        let fs_spec = ExecutionSpec::analyze_filesystem(&tool(), Path::new("/stage"), out);
        assert_eq!(fs_spec.mode.to_string(), "analyze-filesystem");
        assert_eq!(fs_spec.arguments()[1], OsString::from("fs"));
    }

    #[test]
    fn test_job_terminator() {
        let flag = CancellationFlag::new();
        let terminator = JobTerminator::new(flag.clone(), Some(Duration::from_secs(5)));
        assert!(!terminator.should_terminate(Duration::from_secs(1)));
        assert!(terminator.should_terminate(Duration::from_secs(5)));

        flag.cancel();
        assert!(terminator.should_terminate(Duration::ZERO));
    }

    #[test]
    fn test_locate_missing_executable() {
        let settings = ToolSettings {
            executable: PathBuf::from("/nonexistent/dir/ileapp.exe"),
            ..tool()
        };
        assert!(matches!(
            locate_executable(&settings),
            Err(PassError::ExecutableNotFound(_))
        ));
    }

    #[test]
    fn test_locate_script_with_interpreter() {
        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("ileapp.py");
        fs::write(&script, "print('hi')").unwrap();

        let settings = ToolSettings {
            executable: script.clone(),
            interpreter: Some(PathBuf::from("python3")),
            ..tool()
        };
        assert_eq!(locate_executable(&settings).unwrap(), script);
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn sh_tool(dir: &Path, body: &str) -> ToolSettings {
            let script = dir.join("fake_leapp.sh");
            fs::write(&script, body).unwrap();
            ToolSettings {
                executable: script,
                interpreter: Some(PathBuf::from("/bin/sh")),
                ..ToolSettings::default()
            }
        }

        #[test]
        fn test_locate_non_executable_without_interpreter() {
            let temp_dir = TempDir::new().unwrap();
            let settings = ToolSettings {
                interpreter: None,
                ..sh_tool(temp_dir.path(), "exit 0\n")
            };
            assert!(matches!(
                locate_executable(&settings),
                Err(PassError::ExecutableNotFound(_))
            ));
        }

        #[test]
        fn test_run_redirects_output_and_environment() {
            let temp_dir = TempDir::new().unwrap();
            let settings = sh_tool(
                temp_dir.path(),
                "echo \"args: $*\"\necho \"compat: $__COMPAT_LAYER\"\necho oops >&2\nexit 0\n",
            );
            let out = temp_dir.path().join("out");
            fs::create_dir_all(&out).unwrap();

            let runner = ProcessToolRunner::new(&settings, JobTerminator::new(CancellationFlag::new(), None)).unwrap();
            let spec = ExecutionSpec::analyze_filesystem(&settings, Path::new("/stage"), &out);
            let outcome = runner.run(&spec).unwrap();

            assert!(outcome.is_success());
            let stdout = fs::read_to_string(&outcome.stdout_path).unwrap();
            assert!(stdout.contains("args: -t fs -i /stage -o"));
            assert!(stdout.contains("compat: RunAsInvoker"));
            assert_eq!(fs::read_to_string(&outcome.stderr_path).unwrap().trim(), "oops");
        }

        #[test]
        fn test_nonzero_exit_is_an_outcome() {
            let temp_dir = TempDir::new().unwrap();
            let settings = sh_tool(temp_dir.path(), "exit 3\n");
            let runner = ProcessToolRunner::new(&settings, JobTerminator::new(CancellationFlag::new(), None)).unwrap();

            let spec = ExecutionSpec::discover_paths(&settings, temp_dir.path());
            let outcome = runner.run(&spec).unwrap();

            assert_eq!(outcome.state, ExitState::Completed { exit_code: Some(3) });
            assert!(!outcome.is_success());
        }

        #[test]
        fn test_cancellation_terminates_process() {
            let temp_dir = TempDir::new().unwrap();
            let settings = sh_tool(temp_dir.path(), "sleep 30\n");
            let flag = CancellationFlag::new();
            let runner = ProcessToolRunner::new(&settings, JobTerminator::new(flag.clone(), None)).unwrap();

            let spec = ExecutionSpec::discover_paths(&settings, temp_dir.path());
            let canceller = {
                let flag = flag.clone();
                thread::spawn(move || {
                    thread::sleep(Duration::from_millis(300));
                    flag.cancel();
                })
            };

            let started = Instant::now();
            let outcome = runner.run(&spec).unwrap();
            canceller.join().unwrap();

            assert_eq!(outcome.state, ExitState::Terminated);
            assert!(started.elapsed() < Duration::from_secs(20));
        }

        #[test]
        fn test_timeout_terminates_process() {
            let temp_dir = TempDir::new().unwrap();
            let settings = sh_tool(temp_dir.path(), "sleep 30\n");
            let runner = ProcessToolRunner::new(
                &settings,
                JobTerminator::new(CancellationFlag::new(), Some(Duration::from_millis(200))),
            )
            .unwrap();

            let spec = ExecutionSpec::discover_paths(&settings, temp_dir.path());
            assert_eq!(runner.run(&spec).unwrap().state, ExitState::Terminated);
        }

        #[test]
        fn test_launch_failure() {
            let temp_dir = TempDir::new().unwrap();
            let mut settings = sh_tool(temp_dir.path(), "exit 0\n");
            let runner = ProcessToolRunner::new(&settings, JobTerminator::new(CancellationFlag::new(), None)).unwrap();
            settings.interpreter = None;

            // The interpreter disappears after the runner was built
            let broken = ProcessToolRunner {
                interpreter: Some(PathBuf::from("/nonexistent/interpreter")),
                ..runner
            };
            let spec = ExecutionSpec::discover_paths(&settings, temp_dir.path());
            assert!(matches!(broken.run(&spec), Err(InvokeError::Launch { .. })));
        }

        #[test]
        fn test_missing_output_dir_is_a_redirect_error() {
            let temp_dir = TempDir::new().unwrap();
            let settings = sh_tool(temp_dir.path(), "exit 0\n");
            let runner = ProcessToolRunner::new(&settings, JobTerminator::new(CancellationFlag::new(), None)).unwrap();

            let spec = ExecutionSpec::discover_paths(&settings, &temp_dir.path().join("missing"));
            assert!(matches!(runner.run(&spec), Err(InvokeError::Redirect { .. })));
        }
    }
}
