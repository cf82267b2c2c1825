use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::env_vars::expand_env_vars;
use crate::constants::{
    COMPAT_LAYER_VALUE, COMPAT_LAYER_VAR, DEFAULT_ARCHIVE_MARKERS, DEFAULT_EXECUTABLE_NAME,
    DEFAULT_TOOL_NAME, REPORT_ENTRY_POINT,
};

/// How to launch the external *LEAPP tool.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolSettings {
    /// Tool name; names the module sub-directory and the redirect files
    pub name: String,
    pub executable: PathBuf,
    /// Program used to run a script executable, e.g. `python3` for `ileapp.py`
    #[serde(default)]
    pub interpreter: Option<PathBuf>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Host OS the tool is packaged for (`std::env::consts::OS` value)
    #[serde(default)]
    pub required_os: Option<String>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        let mut environment = HashMap::new();
        environment.insert(COMPAT_LAYER_VAR.to_string(), COMPAT_LAYER_VALUE.to_string());

        Self {
            name: DEFAULT_TOOL_NAME.to_string(),
            executable: PathBuf::from(DEFAULT_EXECUTABLE_NAME),
            interpreter: None,
            environment,
            timeout_secs: None,
            required_os: None,
        }
    }
}

impl ToolSettings {
    /// File the discovery run's stdout (the manifest) is written to
    pub fn manifest_file_name(&self) -> String {
        format!("{}_paths.txt", self.name)
    }

    pub fn manifest_error_file_name(&self) -> String {
        format!("{}_paths_error.txt", self.name)
    }

    pub fn stdout_file_name(&self) -> String {
        format!("{}_out.txt", self.name)
    }

    pub fn stderr_file_name(&self) -> String {
        format!("{}_err.txt", self.name)
    }

    /// Module name reports are registered under
    pub fn module_name(&self) -> String {
        format!("{} Analyzer", self.name)
    }

    pub fn report_display_name(&self) -> String {
        format!("{} Html Report", self.name)
    }

    pub fn report_entry_point(&self) -> &'static str {
        REPORT_ENTRY_POINT
    }
}

/// Behaviour of the pass itself.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PassSettings {
    /// Name markers selecting archives in logical collections
    pub archive_markers: Vec<String>,
    pub hash_staged_files: bool,
    pub max_hash_size_mb: u64,
    pub write_summary: bool,
}

impl Default for PassSettings {
    fn default() -> Self {
        Self {
            archive_markers: DEFAULT_ARCHIVE_MARKERS.iter().map(|m| m.to_string()).collect(),
            hash_staged_files: true,
            max_hash_size_mb: 1024,
            write_summary: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngestConfig {
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub tool: ToolSettings,
    #[serde(default)]
    pub pass: PassSettings,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            description: "iLEAPP analysis of iOS data sources".to_string(),
            tool: ToolSettings::default(),
            pass: PassSettings::default(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: IngestConfig =
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_yaml_file(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml).context(format!("Failed to write config to {}", path.display()))?;

        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Expand environment references in the tool paths
    pub fn process_environment_variables(&mut self) {
        let executable = expand_env_vars(&self.tool.executable.to_string_lossy());
        self.tool.executable = PathBuf::from(executable);

        if let Some(interpreter) = &self.tool.interpreter {
            let expanded = expand_env_vars(&interpreter.to_string_lossy());
            self.tool.interpreter = Some(PathBuf::from(expanded));
        }
    }

    /// Create a default configuration YAML file
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        IngestConfig::default().save_to_yaml_file(path)
    }
}

/// Load a configuration file or create a default one.
///
/// * `Some(path)` that exists is loaded.
/// * `Some(path)` that does not exist gets the defaults written to it.
/// * `None` returns the defaults without touching the filesystem.
pub fn load_or_create_config(config_path: Option<&Path>) -> Result<IngestConfig> {
    match config_path {
        Some(path) if path.exists() => IngestConfig::from_yaml_file(path),
        Some(path) => {
            info!("Creating default config at {}", path.display());
            let config = IngestConfig::default();
            config.save_to_yaml_file(path)?;
            Ok(config)
        }
        None => {
            info!("No config path provided, using default configuration");
            Ok(IngestConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_tool_settings() {
        let tool = ToolSettings::default();
        assert_eq!(tool.name, "iLeapp");
        assert_eq!(
            tool.environment.get("__COMPAT_LAYER").map(String::as_str),
            Some("RunAsInvoker")
        );
        assert_eq!(tool.manifest_file_name(), "iLeapp_paths.txt");
        assert_eq!(tool.manifest_error_file_name(), "iLeapp_paths_error.txt");
        assert_eq!(tool.stdout_file_name(), "iLeapp_out.txt");
        assert_eq!(tool.stderr_file_name(), "iLeapp_err.txt");
        assert_eq!(tool.report_display_name(), "iLeapp Html Report");
    }

    #[test]
    fn test_tool_name_drives_file_names() {
        let tool = ToolSettings {
            name: "aLeapp".to_string(),
            ..ToolSettings::default()
        };
        assert_eq!(tool.manifest_file_name(), "aLeapp_paths.txt");
        assert_eq!(tool.module_name(), "aLeapp Analyzer");
    }

    #[test]
    fn test_save_and_load_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ingest.yaml");

        let mut config = IngestConfig::default();
        config.tool.timeout_secs = Some(600);
        config.tool.interpreter = Some(PathBuf::from("python3"));
        config.save_to_yaml_file(&path).unwrap();

        let loaded = IngestConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(
            temp_file.path(),
            "version: '1.0'\ndescription: minimal\n",
        )
        .unwrap();

        let loaded = IngestConfig::from_yaml_file(temp_file.path()).unwrap();
        assert_eq!(loaded.tool, ToolSettings::default());
        assert_eq!(loaded.pass.archive_markers, vec![".zip", ".tar", ".tgz"]);
    }

    #[test]
    fn test_load_or_create_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("new.yaml");

        let created = load_or_create_config(Some(&path)).unwrap();
        assert!(path.exists());
        let loaded = load_or_create_config(Some(&path)).unwrap();
        assert_eq!(created, loaded);

        let defaults = load_or_create_config(None).unwrap();
        assert_eq!(defaults.version, "1.0");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "invalid: yaml: content:").unwrap();

        let result = IngestConfig::from_yaml_file(temp_file.path());
        assert!(result.unwrap_err().to_string().contains("Failed to parse YAML"));
    }

    #[test]
    fn test_process_environment_variables() {
        std::env::set_var("LEAPP_CFG_TEST_DIR", "/opt/tools");
        let mut config = IngestConfig::default();
        config.tool.executable = PathBuf::from("$LEAPP_CFG_TEST_DIR/ileapp.py");
        config.tool.interpreter = Some(PathBuf::from("${LEAPP_CFG_TEST_DIR}/python3"));

        config.process_environment_variables();

        assert_eq!(config.tool.executable, PathBuf::from("/opt/tools/ileapp.py"));
        assert_eq!(config.tool.interpreter, Some(PathBuf::from("/opt/tools/python3")));
        std::env::remove_var("LEAPP_CFG_TEST_DIR");
    }
}
