use std::fs;

use anyhow::{anyhow, Context, Result};
use constpatch_core::config::{CONFIG_FILE_NAMES, PipelineConfig};
use constpatch_core::layout::PipelineLayout;

use crate::canonicalize_or_current;
use crate::commands::{load_pipeline_config, print_dir_status};

/// Write the default config as `constpatch.yaml` in the build root.
pub fn init_config_command(root: &str, force: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let path = root_path.join(CONFIG_FILE_NAMES[0]);
    if path.exists() && !force {
        return Err(anyhow!("Config already exists at {} (use --force to overwrite)", path.display()));
    }

    let yaml = PipelineConfig::default().to_yaml().context("Failed to serialize default config")?;
    fs::write(&path, yaml)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;

    println!("Wrote default config: {}", path.display());
    Ok(())
}

/// Show the effective config and key paths.
pub fn show_config_command(root: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, config_path) = load_pipeline_config(&root_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let layout = PipelineLayout::new(&root_path, &config);
    println!("constpatch Config");
    println!("=================");
    match &config_path {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Annotation section: {}", config.annotation_section);
    println!("Backup: suffix {} ({:?})", config.backup.suffix, config.backup.policy);
    println!("Compiler: {}", config.toolchain.cc);
    println!("Target flags: {}", config.target_flags.join(" "));
    println!("Allow-list ({}):", config.allow_list.len());
    for entry in &config.allow_list {
        println!("  - {}", entry);
    }
    if !config.deny_list.is_empty() {
        println!("Deny-list ({}):", config.deny_list.len());
        for entry in &config.deny_list {
            println!("  - {}", entry);
        }
    }
    println!();
    println!("Directories:");
    print_dir_status("Upstream tree", &layout.upstream_dir);
    print_dir_status("Library dir", &layout.library_dir);
    print_dir_status("Output dir", &layout.output_dir);
    println!("Archive: {}", layout.archive_path.display());
    Ok(())
}
