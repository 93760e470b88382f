use anyhow::Result;
use constpatch_core::build::{BuildBackend, MakeBuild, PrebuiltArchive};
use constpatch_core::pipeline::{Pipeline, PipelineOptions};

use crate::commands::{
    load_pipeline_config, make_inspector, parse_inspector, print_patch_report, print_verification,
};
use crate::{canonicalize_or_current, display_relative};

/// Full pipeline: check toolchain, patch, build, then verify when enabled.
pub fn run_command(
    root: &str,
    verify: bool,
    inspector: &str,
    no_build: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let (config, config_path) = load_pipeline_config(&root_path)?;
    let kind = parse_inspector(inspector)?;
    let mut pipeline = Pipeline::new(&root_path, config, PipelineOptions { verify, dry_run });

    let build_needed = !no_build && !dry_run;
    let tools = pipeline.check_environment(build_needed, kind)?;
    let section_inspector = make_inspector(kind, pipeline.config())?;
    let backend: Box<dyn BuildBackend> =
        if no_build { Box::new(PrebuiltArchive) } else { Box::new(MakeBuild) };

    if !json {
        println!("constpatch v{}", constpatch_core::version());
        match &config_path {
            Some(path) => println!("Config: {}", path.display()),
            None => println!("Config: (defaults)"),
        }
        for tool in &tools {
            println!("Using {}: {}", tool.role, tool.path.display());
        }
        println!("Build: {}", backend.name());
        if verify {
            println!("Verification: on (inspector {})", section_inspector.name());
        }
    }

    let outcome = pipeline.run(backend.as_ref(), section_inspector.as_ref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_patch_report(&outcome.patch, &pipeline.layout().library_dir);
        if let Some(artifact) = &outcome.artifact {
            println!(
                "Archive: {} ({} bytes)",
                display_relative(&artifact.path, &root_path),
                artifact.size
            );
        }
        if let (Some(result), Some(artifact)) = (&outcome.verification, &outcome.artifact) {
            print_verification(result, &pipeline.config().annotation_section, &artifact.path);
        }
    }

    outcome.ensure_passed()?;
    Ok(())
}
