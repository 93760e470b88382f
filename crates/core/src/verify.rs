//! Archive section verifier.
//!
//! Members are extracted into a throwaway directory (one numbered
//! subdirectory per member, so duplicate member names cannot collide) and
//! handed to a `SectionInspector`. The archive itself is only read.

use std::fs;
use std::path::{Path, PathBuf};

use object::read::archive::ArchiveFile;
use tempfile::TempDir;
use thiserror::Error;

use crate::inspect::{InspectError, SectionInspector, SectionRecord};
use crate::report::{summarize, VerificationResult};

const SCRATCH_PREFIX: &str = "constcheck-";

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Failed to read archive {}: {source}", path.display())]
    ReadArchive { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse archive {}: {message}", path.display())]
    ParseArchive { path: PathBuf, message: String },
    #[error("Failed to prepare scratch area: {0}")]
    Scratch(std::io::Error),
    #[error(transparent)]
    Inspect(#[from] InspectError),
}

pub struct ArchiveVerifier<'a> {
    inspector: &'a dyn SectionInspector,
    section: String,
    scratch_root: Option<PathBuf>,
}

impl<'a> ArchiveVerifier<'a> {
    pub fn new(inspector: &'a dyn SectionInspector, section: impl Into<String>) -> Self {
        Self { inspector, section: section.into(), scratch_root: None }
    }

    /// Create scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn verify(&self, archive: &Path) -> Result<VerificationResult, VerifyError> {
        let records = self.collect_records(archive)?;
        Ok(summarize(&records))
    }

    /// Annotated-section records of every member, in archive order.
    pub fn collect_records(&self, archive: &Path) -> Result<Vec<SectionRecord>, VerifyError> {
        let data = fs::read(archive)
            .map_err(|source| VerifyError::ReadArchive { path: archive.to_path_buf(), source })?;
        let parse_err = |e: object::read::Error| VerifyError::ParseArchive {
            path: archive.to_path_buf(),
            message: e.to_string(),
        };
        let parsed = ArchiveFile::parse(data.as_slice()).map_err(parse_err)?;

        // Dropping the TempDir removes it, including on every `?` below.
        let scratch = self.scratch_dir()?;
        let mut records = Vec::new();

        for (index, member) in parsed.members().enumerate() {
            let member = member.map_err(parse_err)?;
            let raw_name = String::from_utf8_lossy(member.name()).to_string();
            let Some(file_name) = Path::new(&raw_name).file_name().map(PathBuf::from) else {
                continue;
            };
            let bytes = member.data(data.as_slice()).map_err(parse_err)?;

            let member_dir = scratch.path().join(format!("{index:04}"));
            fs::create_dir(&member_dir).map_err(VerifyError::Scratch)?;
            let extracted = member_dir.join(file_name);
            fs::write(&extracted, bytes).map_err(VerifyError::Scratch)?;

            records.extend(
                self.inspector
                    .inspect(&extracted)?
                    .into_iter()
                    .filter(|record| record.name == self.section),
            );
        }

        scratch.close().map_err(VerifyError::Scratch)?;
        Ok(records)
    }

    fn scratch_dir(&self) -> Result<TempDir, VerifyError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.map_err(VerifyError::Scratch)
    }
}
