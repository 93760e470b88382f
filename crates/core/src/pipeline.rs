//! Patch -> build -> verify orchestration.
//!
//! Steps run strictly in order and fail fast. Nothing is rolled back on
//! failure: patched files and their backups stay on disk for the operator.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::BackupStore;
use crate::build::{BuildArtifact, BuildBackend, BuildError, BuildRequest};
use crate::config::PipelineConfig;
use crate::inspect::{InspectorKind, SectionInspector};
use crate::layout::PipelineLayout;
use crate::patch::{PatchError, PatchOptions, PatchReport, SourcePatcher};
use crate::report::{VerificationResult, Verdict};
use crate::selection::{select_candidates, Candidate, SelectionError};
use crate::toolchain::{check_toolchain, ResolvedTool, ToolRequirement, ToolchainError};
use crate::verify::{ArchiveVerifier, VerifyError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Environment(#[from] ToolchainError),
    #[error("Upstream source tree not found at {}", .0.display())]
    MissingSource(PathBuf),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error("{violations} annotated section(s) ended up writable:\n  {}", details.join("\n  "))]
    Violation { violations: usize, details: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "verdict")]
pub enum PipelineState {
    NotStarted,
    Patched,
    Built,
    Verified(Verdict),
}

impl PipelineState {
    /// With verification disabled `Built` is the final state.
    pub fn is_terminal(&self, verify_enabled: bool) -> bool {
        match self {
            PipelineState::Verified(_) => true,
            PipelineState::Built => !verify_enabled,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Annotate promoted declarations and verify their placement after the build.
    pub verify: bool,
    /// Report what would be patched without writing anything.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub generated_at: String,
    pub state: PipelineState,
    pub patch: PatchReport,
    pub artifact: Option<BuildArtifact>,
    pub verification: Option<VerificationResult>,
}

impl PipelineOutcome {
    /// Turn a failed verification into `PipelineError::Violation`.
    pub fn ensure_passed(&self) -> Result<(), PipelineError> {
        match &self.verification {
            Some(result) if result.violations > 0 => Err(PipelineError::Violation {
                violations: result.violations,
                details: result.summary_lines(),
            }),
            _ => Ok(()),
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    layout: PipelineLayout,
    options: PipelineOptions,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(root: impl AsRef<Path>, config: PipelineConfig, options: PipelineOptions) -> Self {
        let layout = PipelineLayout::new(root, &config);
        Self { config, layout, options, state: PipelineState::NotStarted }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &PipelineLayout {
        &self.layout
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Tools the configured run needs before it may start.
    pub fn requirements(&self, build: bool, inspector: InspectorKind) -> Vec<ToolRequirement> {
        let tc = &self.config.toolchain;
        let mut reqs = Vec::new();
        if build {
            reqs.push(ToolRequirement::new("compiler", &tc.cc));
            reqs.push(ToolRequirement::new("archiver", &tc.ar));
            reqs.push(ToolRequirement::new("build tool", &tc.make));
        }
        if self.options.verify && inspector == InspectorKind::Readelf {
            reqs.push(ToolRequirement::new("section inspection tool", &tc.readelf));
        }
        reqs
    }

    pub fn check_environment(
        &self,
        build: bool,
        inspector: InspectorKind,
    ) -> Result<Vec<ResolvedTool>, PipelineError> {
        Ok(check_toolchain(&self.requirements(build, inspector))?)
    }

    pub fn ensure_source_tree(&self) -> Result<(), PipelineError> {
        if !self.layout.library_dir.is_dir() {
            return Err(PipelineError::MissingSource(self.layout.library_dir.clone()));
        }
        Ok(())
    }

    pub fn candidates(&self) -> Result<Vec<Candidate>, PipelineError> {
        self.ensure_source_tree()?;
        Ok(select_candidates(&self.layout.library_dir, &self.config.selection_policy())?)
    }

    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions { annotate: self.options.verify, section: self.config.annotation_section.clone() }
    }

    pub fn patch(&mut self) -> Result<PatchReport, PipelineError> {
        let candidates = self.candidates()?;
        let backups = BackupStore::new(&self.config.backup.suffix, self.config.backup.policy);
        let mut patcher =
            SourcePatcher::new(self.patch_options(), backups).dry_run(self.options.dry_run);
        let report = patcher.patch_files(candidates.iter().map(|c| c.path.as_path()))?;
        self.state = PipelineState::Patched;
        Ok(report)
    }

    pub fn build(&mut self, backend: &dyn BuildBackend) -> Result<BuildArtifact, PipelineError> {
        let request = BuildRequest::from_config(&self.config, &self.layout);
        let artifact = backend.build(&request)?;
        self.state = PipelineState::Built;
        Ok(artifact)
    }

    pub fn verify(
        &mut self,
        artifact: &BuildArtifact,
        inspector: &dyn SectionInspector,
    ) -> Result<VerificationResult, PipelineError> {
        let verifier = ArchiveVerifier::new(inspector, &self.config.annotation_section);
        let result = verifier.verify(&artifact.path)?;
        self.state = PipelineState::Verified(result.verdict());
        Ok(result)
    }

    /// Patch, build, and (when enabled) verify.
    ///
    /// A verification failure is returned inside the outcome so the caller can
    /// report every violating object; use `PipelineOutcome::ensure_passed`.
    pub fn run(
        &mut self,
        backend: &dyn BuildBackend,
        inspector: &dyn SectionInspector,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.ensure_source_tree()?;
        let patch = self.patch()?;
        if self.options.dry_run {
            return Ok(self.outcome(patch, None, None));
        }

        let artifact = self.build(backend)?;
        let verification =
            if self.options.verify { Some(self.verify(&artifact, inspector)?) } else { None };

        Ok(self.outcome(patch, Some(artifact), verification))
    }

    fn outcome(
        &self,
        patch: PatchReport,
        artifact: Option<BuildArtifact>,
        verification: Option<VerificationResult>,
    ) -> PipelineOutcome {
        PipelineOutcome {
            generated_at: Utc::now().to_rfc3339(),
            state: self.state,
            patch,
            artifact,
            verification,
        }
    }
}
