use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::{BackupPolicy, DEFAULT_BACKUP_SUFFIX};
use crate::patch::DEFAULT_ANNOTATION_SECTION;
use crate::selection::SelectionPolicy;

/// Config file names probed in the build root, in priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &["constpatch.yaml", "constpatch.yml", "constpatch.json"];

pub const ENV_CC: &str = "CONSTPATCH_CC";
pub const ENV_READELF: &str = "CONSTPATCH_READELF";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse YAML config {}: {source}", path.display())]
    Yaml { path: PathBuf, source: serde_yaml::Error },
    #[error("Failed to parse JSON config {}: {source}", path.display())]
    Json { path: PathBuf, source: serde_json::Error },
    #[error("Invalid config {}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Tool names (or paths) for the target toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub cc: String,
    pub ar: String,
    pub make: String,
    pub readelf: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            cc: "arm-none-eabi-gcc".to_string(),
            ar: "arm-none-eabi-ar".to_string(),
            make: "make".to_string(),
            readelf: "arm-none-eabi-readelf".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub suffix: String,
    pub policy: BackupPolicy,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { suffix: DEFAULT_BACKUP_SUFFIX.to_string(), policy: BackupPolicy::default() }
    }
}

/// Serializable pipeline configuration.
///
/// Lives (optionally) at `constpatch.yaml` in the build root; every field has
/// a default matching the Intel decimal floating-point library layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Versioned upstream source directory, relative to the build root.
    pub upstream_dir: String,
    /// Directory holding the library Makefile and `src/`, relative to `upstream_dir`.
    pub library_dir: String,
    /// Files known to hold large tables, relative to `library_dir`.
    pub allow_list: Vec<String>,
    /// Files the fallback scan must not touch, relative to `library_dir`.
    pub deny_list: Vec<String>,
    pub scan_extensions: Vec<String>,
    pub backup: BackupConfig,
    pub annotation_section: String,
    pub toolchain: ToolchainConfig,
    /// Compiler flags for the target (ISA, float ABI, section splitting).
    pub target_flags: Vec<String>,
    /// Makefile variables selecting calling convention and threading mode.
    pub build_vars: BTreeMap<String, String>,
    pub archive_name: String,
    /// Where the finished archive is copied, relative to the build root.
    pub output_dir: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let build_vars = [
            ("CALL_BY_REF", "0"),
            ("GLOBAL_RND", "0"),
            ("GLOBAL_FLAGS", "0"),
            ("UNCHANGED_BINARY_FLAGS", "0"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            upstream_dir: "IntelRDFPMathLib20U2".to_string(),
            library_dir: "LIBRARY".to_string(),
            allow_list: [
                "src/bid_decimal_data.c",
                "src/bid_binarydecimal.c",
                "src/bid_convert_data.c",
                "src/bid128_2_str_tables.c",
                "src/bid_dpd.c",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            deny_list: Vec::new(),
            scan_extensions: vec!["c".to_string()],
            backup: BackupConfig::default(),
            annotation_section: DEFAULT_ANNOTATION_SECTION.to_string(),
            toolchain: ToolchainConfig::default(),
            target_flags: [
                "-mcpu=cortex-m33",
                "-mthumb",
                "-mfloat-abi=hard",
                "-mfpu=fpv5-sp-d16",
                "-ffunction-sections",
                "-fdata-sections",
                "-Os",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            build_vars,
            archive_name: "libbid.a".to_string(),
            output_dir: "build".to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn selection_policy(&self) -> SelectionPolicy {
        SelectionPolicy {
            allow_list: self.allow_list.iter().map(PathBuf::from).collect(),
            deny_list: self.deny_list.iter().map(PathBuf::from).collect(),
            extensions: self.scan_extensions.clone(),
        }
    }

    /// Override tool paths, typically from `CONSTPATCH_CC` / `CONSTPATCH_READELF`.
    pub fn with_tool_overrides(mut self, cc: Option<String>, readelf: Option<String>) -> Self {
        if let Some(cc) = cc.filter(|s| !s.is_empty()) {
            self.toolchain.cc = cc;
        }
        if let Some(readelf) = readelf.filter(|s| !s.is_empty()) {
            self.toolchain.readelf = readelf;
        }
        self
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_tool_overrides(std::env::var(ENV_CC).ok(), std::env::var(ENV_READELF).ok())
    }

    /// Reject values that would make the pipeline destroy its own inputs.
    pub fn validate(&self) -> Result<(), String> {
        if self.backup.suffix.is_empty() {
            return Err("backup.suffix must not be empty".to_string());
        }
        if self.annotation_section.is_empty() {
            return Err("annotation_section must not be empty".to_string());
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// First existing config file under `root`, if any.
pub fn find_config_file(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES.iter().map(|name| root.join(name)).find(|p| p.is_file())
}

/// Parse a config file, choosing JSON or YAML by extension.
pub fn load_config_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let config: PipelineConfig = if is_json {
        serde_json::from_str(&body)
            .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })?
    } else {
        serde_yaml::from_str(&body)
            .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })?
    };
    config
        .validate()
        .map_err(|message| ConfigError::Invalid { path: path.to_path_buf(), message })?;
    Ok(config)
}

/// Load the config for `root`, falling back to defaults when no file exists.
pub fn load_config(root: &Path) -> Result<(PipelineConfig, Option<PathBuf>), ConfigError> {
    match find_config_file(root) {
        Some(path) => Ok((load_config_file(&path)?, Some(path))),
        None => Ok((PipelineConfig::default(), None)),
    }
}
