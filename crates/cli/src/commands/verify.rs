use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use constpatch_core::build::existing_artifact;
use constpatch_core::layout::PipelineLayout;
use constpatch_core::pipeline::PipelineError;
use constpatch_core::report::VerificationResult;
use constpatch_core::verify::ArchiveVerifier;
use serde::Serialize;

use crate::canonicalize_or_current;
use crate::commands::{load_pipeline_config, make_inspector, parse_inspector, print_verification};

#[derive(Serialize)]
pub struct VerificationSnapshot {
    pub generated_at: String,
    pub archive: String,
    pub archive_size: u64,
    pub section: String,
    pub inspector: String,
    pub verdict: String,
    pub result: VerificationResult,
}

/// Check an already-built archive for writable annotated sections.
///
/// Defaults to the configured output archive when `archive` is omitted.
pub fn verify_command(
    root: &str,
    archive: Option<String>,
    inspector: &str,
    section: Option<String>,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, _) = load_pipeline_config(&root_path)?;
    let kind = parse_inspector(inspector)?;
    let inspector = make_inspector(kind, &config)?;

    let archive_path = match archive {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_absolute() {
                p
            } else {
                root_path.join(p)
            }
        }
        None => PipelineLayout::new(&root_path, &config).archive_path,
    };
    let artifact = existing_artifact(&archive_path)
        .with_context(|| format!("No archive to verify at {}", archive_path.display()))?;
    let section = section.unwrap_or_else(|| config.annotation_section.clone());

    let verifier = ArchiveVerifier::new(inspector.as_ref(), &section);
    let result = verifier.verify(&artifact.path)?;

    if json {
        let snapshot = VerificationSnapshot {
            generated_at: Utc::now().to_rfc3339(),
            archive: artifact.path.display().to_string(),
            archive_size: artifact.size,
            section: section.clone(),
            inspector: kind.as_str().to_string(),
            verdict: result.verdict().as_str().to_string(),
            result: result.clone(),
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_verification(&result, &section, &artifact.path);
    }

    if result.violations > 0 {
        return Err(PipelineError::Violation {
            violations: result.violations,
            details: result.summary_lines(),
        }
        .into());
    }
    Ok(())
}
