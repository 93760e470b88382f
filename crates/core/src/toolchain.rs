//! Toolchain discovery for the external build and inspection steps.

use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Required {role} '{name}' not found (install it or adjust the toolchain config)")]
    Missing { role: String, name: String },
}

/// A tool the pipeline needs, by role (e.g. "compiler") and configured name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    pub role: String,
    pub name: String,
}

impl ToolRequirement {
    pub fn new(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self { role: role.into(), name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTool {
    pub role: String,
    pub path: PathBuf,
}

pub fn find_in_path(executable: &str) -> Option<PathBuf> {
    env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths).find_map(|p| {
            let candidate = p.join(executable);
            if candidate.is_file() {
                Some(candidate)
            } else {
                None
            }
        })
    })
}

/// Resolve a configured tool: explicit paths are checked directly, bare names via `PATH`.
pub fn resolve_tool(name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    let path = Path::new(name);
    if path.components().count() > 1 || path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    find_in_path(name)
}

/// Resolve every requirement, failing on the first missing tool.
pub fn check_toolchain(requirements: &[ToolRequirement]) -> Result<Vec<ResolvedTool>, ToolchainError> {
    requirements
        .iter()
        .map(|req| {
            resolve_tool(&req.name)
                .map(|path| ResolvedTool { role: req.role.clone(), path })
                .ok_or_else(|| ToolchainError::Missing {
                    role: req.role.clone(),
                    name: req.name.clone(),
                })
        })
        .collect()
}
