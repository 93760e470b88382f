use anyhow::Result;
use constpatch_core::backup::restore_tree;
use constpatch_core::pipeline::{Pipeline, PipelineOptions};

use crate::commands::load_pipeline_config;
use crate::{canonicalize_or_current, display_relative};

/// Copy every `<file><suffix>` backup in the library tree back over its source.
pub fn restore_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, _) = load_pipeline_config(&root_path)?;
    let suffix = config.backup.suffix.clone();
    let pipeline = Pipeline::new(&root_path, config, PipelineOptions::default());
    pipeline.ensure_source_tree()?;

    let library_dir = &pipeline.layout().library_dir;
    let restored = restore_tree(library_dir, &suffix)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&restored)?);
        return Ok(());
    }

    println!("Restored files ({}):", restored.len());
    if restored.is_empty() {
        println!("  (none)");
    }
    for path in restored {
        println!("  - {}", display_relative(&path, library_dir));
    }
    Ok(())
}
