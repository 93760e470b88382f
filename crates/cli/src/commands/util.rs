use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use constpatch_core::config::{load_config, PipelineConfig};
use constpatch_core::inspect::{ElfInspector, InspectorKind, ReadelfInspector, SectionInspector};
use constpatch_core::patch::{PatchReport, PatchStatus, SkipReason};
use constpatch_core::report::{VerificationResult, Verdict};
use constpatch_core::toolchain::resolve_tool;

use crate::display_relative;

/// Load the pipeline config for `root` (defaults when no file exists) and apply env overrides.
pub fn load_pipeline_config(root: &Path) -> Result<(PipelineConfig, Option<PathBuf>)> {
    let (config, path) = load_config(root).context("Failed to load pipeline config")?;
    Ok((config.with_env_overrides(), path))
}

pub fn parse_inspector(name: &str) -> Result<InspectorKind> {
    InspectorKind::parse(name)
        .ok_or_else(|| anyhow!("Invalid inspector '{}'. Allowed: builtin, readelf", name))
}

/// Build the requested section inspector, resolving `readelf` up front.
pub fn make_inspector(
    kind: InspectorKind,
    config: &PipelineConfig,
) -> Result<Box<dyn SectionInspector>> {
    match kind {
        InspectorKind::Builtin => Ok(Box::new(ElfInspector)),
        InspectorKind::Readelf => {
            let path = resolve_tool(&config.toolchain.readelf).ok_or_else(|| {
                anyhow!(
                    "Required section inspection tool '{}' not found (install it or set CONSTPATCH_READELF)",
                    config.toolchain.readelf
                )
            })?;
            Ok(Box::new(ReadelfInspector::new(path)))
        }
    }
}

pub fn print_patch_report(report: &PatchReport, base: &Path) {
    println!("Patched files ({}):", report.files.len());
    if report.files.is_empty() {
        println!("  (none)");
    }
    for file in &report.files {
        let shown = display_relative(&file.path, base);
        match &file.status {
            PatchStatus::Patched | PatchStatus::DryRun => {
                let label = if file.status == PatchStatus::DryRun { "would patch" } else { "patched" };
                println!("  - {} [{}, {} declaration(s)]", shown, label, file.declarations.len());
                for decl in &file.declarations {
                    let size = decl.declaration.size.as_deref().unwrap_or("");
                    println!(
                        "      line {}: {} {}[{}]{}",
                        decl.line,
                        decl.declaration.element_type,
                        decl.declaration.name,
                        size,
                        if decl.annotated { " (annotated)" } else { "" }
                    );
                }
                if let Some(backup) = file.backup.as_ref().filter(|b| !b.created) {
                    eprintln!(
                        "Warning: kept existing backup {} (it may predate the current rules)",
                        display_relative(&backup.path, base)
                    );
                }
            }
            PatchStatus::Unchanged => println!("  - {} [unchanged]", shown),
            PatchStatus::Skipped(reason) => {
                let why = match reason {
                    SkipReason::Missing => "missing",
                };
                eprintln!("Skipping {}: {}", shown, why);
            }
        }
    }
    println!(
        "Summary: {} file(s) patched, {} declaration(s), {} skipped",
        report.patched_files(),
        report.declarations(),
        report.skipped_files()
    );
}

pub fn print_verification(result: &VerificationResult, section: &str, archive: &Path) {
    println!("Verification of {} (section {}):", archive.display(), section);
    println!("  Annotated sections: {}", result.sections);
    println!("  Writable violations: {}", result.violations);
    match result.verdict() {
        Verdict::Pass => println!("  Verdict: PASS"),
        Verdict::SkippedWarning => {
            println!("  Verdict: SKIPPED");
            eprintln!(
                "Warning: no '{}' sections found in {}; nothing was verified",
                section,
                archive.display()
            );
        }
        Verdict::Fail => {
            println!("  Verdict: FAIL");
            for line in result.summary_lines() {
                eprintln!("Violation: {}", line);
            }
        }
    }
}

/// Helper to print whether a directory exists.
pub fn print_dir_status(label: &str, path: &Path) {
    let exists = path.is_dir();
    println!("- {label}: {} ({})", if exists { "OK" } else { "MISSING" }, path.display());
}
