use anyhow::Result;
use constpatch_core::pipeline::{Pipeline, PipelineOptions};
use constpatch_core::selection::CandidateOrigin;

use crate::canonicalize_or_current;
use crate::commands::load_pipeline_config;

/// List candidate files: allow-list first, then fallback-scan hits.
pub fn select_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, _) = load_pipeline_config(&root_path)?;
    let pipeline = Pipeline::new(&root_path, config, PipelineOptions::default());
    let candidates = pipeline.candidates()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    println!("Candidates ({}):", candidates.len());
    if candidates.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for candidate in candidates {
        let origin = match candidate.origin {
            CandidateOrigin::AllowList => "allow-list",
            CandidateOrigin::Scan => "scan",
        };
        let missing = if candidate.path.is_file() { "" } else { " (missing)" };
        println!("  - {} [{}]{}", candidate.relative.display(), origin, missing);
    }
    Ok(())
}
