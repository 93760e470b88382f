use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;

/// Logical layout of a build root on disk.
///
/// This is derived from a chosen root path and config. It does *not* perform
/// any IO itself.
#[derive(Debug, Clone)]
pub struct PipelineLayout {
    /// Build root the pipeline runs in.
    pub root: PathBuf,
    /// Versioned upstream source tree (e.g. `IntelRDFPMathLib20U2`).
    pub upstream_dir: PathBuf,
    /// Library directory holding the Makefile; allow-list paths are relative to it.
    pub library_dir: PathBuf,
    /// Archive as produced by the upstream build.
    pub built_archive_path: PathBuf,
    /// Directory the finished archive is copied into.
    pub output_dir: PathBuf,
    /// Final archive location.
    pub archive_path: PathBuf,
}

impl PipelineLayout {
    pub fn new(root: impl AsRef<Path>, config: &PipelineConfig) -> Self {
        let root = root.as_ref().to_path_buf();
        let upstream_dir = root.join(&config.upstream_dir);
        let library_dir = upstream_dir.join(&config.library_dir);
        let built_archive_path = library_dir.join(&config.archive_name);
        let output_dir = root.join(&config.output_dir);
        let archive_path = output_dir.join(&config.archive_name);

        Self { root, upstream_dir, library_dir, built_archive_path, output_dir, archive_path }
    }
}
