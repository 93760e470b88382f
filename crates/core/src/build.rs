//! Build invocation: the upstream library's own Makefile, driven as a black box.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::layout::PipelineLayout;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to spawn {tool}: {source}")]
    Spawn { tool: String, source: std::io::Error },
    #[error("Build command {tool} exited with {status}")]
    Failed { tool: String, status: String },
    #[error("Build did not produce expected archive {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("Failed to copy archive to {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
}

/// Everything the build collaborator receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Directory the Makefile lives in; the archive is expected here too.
    pub library_dir: PathBuf,
    pub make: String,
    pub cc: String,
    pub ar: String,
    pub target_flags: Vec<String>,
    pub build_vars: BTreeMap<String, String>,
    pub archive_name: String,
    pub output_dir: PathBuf,
}

impl BuildRequest {
    pub fn from_config(config: &PipelineConfig, layout: &PipelineLayout) -> Self {
        Self {
            library_dir: layout.library_dir.clone(),
            make: config.toolchain.make.clone(),
            cc: config.toolchain.cc.clone(),
            ar: config.toolchain.ar.clone(),
            target_flags: config.target_flags.clone(),
            build_vars: config.build_vars.clone(),
            archive_name: config.archive_name.clone(),
            output_dir: layout.output_dir.clone(),
        }
    }

    pub fn built_archive_path(&self) -> PathBuf {
        self.library_dir.join(&self.archive_name)
    }

    pub fn output_archive_path(&self) -> PathBuf {
        self.output_dir.join(&self.archive_name)
    }
}

/// The produced static archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Trait implemented by build collaborators.
pub trait BuildBackend {
    fn build(&self, request: &BuildRequest) -> Result<BuildArtifact, BuildError>;
    fn name(&self) -> &'static str;
}

/// Runs `make` in the library directory with target flags and build variables.
pub struct MakeBuild;

impl MakeBuild {
    /// Arguments passed to `make`, in a stable order.
    pub fn make_args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            format!("CC={}", request.cc),
            format!("AR={}", request.ar),
            format!("CFLAGS_OPT={}", request.target_flags.join(" ")),
        ];
        args.extend(request.build_vars.iter().map(|(k, v)| format!("{k}={v}")));
        args
    }
}

impl BuildBackend for MakeBuild {
    fn build(&self, request: &BuildRequest) -> Result<BuildArtifact, BuildError> {
        let status = Command::new(&request.make)
            .args(Self::make_args(request))
            .current_dir(&request.library_dir)
            .status()
            .map_err(|source| BuildError::Spawn { tool: request.make.clone(), source })?;
        if !status.success() {
            return Err(BuildError::Failed {
                tool: request.make.clone(),
                status: status.to_string(),
            });
        }
        collect_artifact(request)
    }

    fn name(&self) -> &'static str {
        "make"
    }
}

/// Uses whatever archive a previous build left in the library directory.
pub struct PrebuiltArchive;

impl BuildBackend for PrebuiltArchive {
    fn build(&self, request: &BuildRequest) -> Result<BuildArtifact, BuildError> {
        collect_artifact(request)
    }

    fn name(&self) -> &'static str {
        "prebuilt"
    }
}

/// Copy the built archive into the output directory and describe it.
pub fn collect_artifact(request: &BuildRequest) -> Result<BuildArtifact, BuildError> {
    let built = request.built_archive_path();
    if !built.is_file() {
        return Err(BuildError::MissingArtifact(built));
    }
    let target = request.output_archive_path();
    if target == built {
        return existing_artifact(&built);
    }
    fs::create_dir_all(&request.output_dir)
        .map_err(|source| BuildError::Io { path: request.output_dir.clone(), source })?;
    let size = fs::copy(&built, &target)
        .map_err(|source| BuildError::Io { path: target.clone(), source })?;
    Ok(BuildArtifact { path: target, size })
}

/// Describe an archive that already exists on disk.
pub fn existing_artifact(path: &Path) -> Result<BuildArtifact, BuildError> {
    let meta = fs::metadata(path).map_err(|_| BuildError::MissingArtifact(path.to_path_buf()))?;
    if !meta.is_file() {
        return Err(BuildError::MissingArtifact(path.to_path_buf()));
    }
    Ok(BuildArtifact { path: path.to_path_buf(), size: meta.len() })
}
