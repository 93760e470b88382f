use anyhow::Result;
use chrono::Utc;
use constpatch_core::pipeline::{Pipeline, PipelineOptions};
use constpatch_core::patch::PatchReport;
use serde::Serialize;

use crate::canonicalize_or_current;
use crate::commands::{load_pipeline_config, print_patch_report};

#[derive(Serialize)]
pub struct PatchSnapshot {
    pub generated_at: String,
    pub annotate: bool,
    pub dry_run: bool,
    pub section: String,
    pub report: PatchReport,
}

/// Const-promote static tables in the upstream tree (no build).
pub fn patch_command(root: &str, verify: bool, dry_run: bool, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, _config_path) = load_pipeline_config(&root_path)?;
    let section = config.annotation_section.clone();
    let mut pipeline = Pipeline::new(&root_path, config, PipelineOptions { verify, dry_run });

    let report = pipeline.patch()?;

    if json {
        let snapshot = PatchSnapshot {
            generated_at: Utc::now().to_rfc3339(),
            annotate: verify,
            dry_run,
            section,
            report,
        };
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    print_patch_report(&report, &pipeline.layout().library_dir);
    if dry_run {
        println!("(dry run: no files were written)");
    }
    Ok(())
}
