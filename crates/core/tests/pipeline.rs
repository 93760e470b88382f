mod common;

use std::fs;

use common::{elf_object, upstream_tree, write_archive, SECTION};
use constpatch_core::build::{
    collect_artifact, BuildArtifact, BuildBackend, BuildError, BuildRequest, MakeBuild,
    PrebuiltArchive,
};
use constpatch_core::config::PipelineConfig;
use constpatch_core::inspect::{ElfInspector, InspectorKind};
use constpatch_core::pipeline::{Pipeline, PipelineError, PipelineOptions, PipelineState};
use constpatch_core::report::Verdict;
use object::SectionKind;
use tempfile::tempdir;

/// Stands in for `make`: drops a prepared archive where the Makefile would.
struct FakeBuild {
    section_kind: Option<SectionKind>,
}

impl BuildBackend for FakeBuild {
    fn build(&self, request: &BuildRequest) -> Result<BuildArtifact, BuildError> {
        let sections: Vec<(&str, SectionKind)> =
            self.section_kind.iter().map(|kind| (SECTION, *kind)).collect();
        write_archive(
            &request.built_archive_path(),
            &[("bid_dpd.o", elf_object(&sections)), ("bid_add.o", elf_object(&[]))],
        );
        collect_artifact(request)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

struct BrokenBuild;

impl BuildBackend for BrokenBuild {
    fn build(&self, _request: &BuildRequest) -> Result<BuildArtifact, BuildError> {
        Err(BuildError::Failed { tool: "make".into(), status: "exit status: 2".into() })
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

fn verify_options() -> PipelineOptions {
    PipelineOptions { verify: true, dry_run: false }
}

#[test]
fn full_run_patches_builds_and_verifies() {
    let temp = tempdir().unwrap();
    let lib = upstream_tree(temp.path());
    fs::write(lib.join("src/bid_dpd.c"), "static int dpd_table[1024];\n").unwrap();

    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    assert_eq!(pipeline.state(), PipelineState::NotStarted);

    let fake = FakeBuild { section_kind: Some(SectionKind::ReadOnlyData) };
    let outcome = pipeline.run(&fake, &ElfInspector).unwrap();

    assert_eq!(outcome.state, PipelineState::Verified(Verdict::Pass));
    assert_eq!(outcome.patch.patched_files(), 1);
    assert_eq!(outcome.patch.skipped_files(), 4, "other allow-listed files are absent");
    let artifact = outcome.artifact.as_ref().unwrap();
    assert_eq!(artifact.path, temp.path().join("build").join("libbid.a"));
    assert!(artifact.size > 0);
    assert!(outcome.ensure_passed().is_ok());

    let patched = fs::read_to_string(lib.join("src/bid_dpd.c")).unwrap();
    assert_eq!(
        patched,
        "static const int dpd_table[1024] __attribute__((section(\".rodata.constcheck\")));\n"
    );
    assert!(lib.join("src/bid_dpd.c.orig").is_file());
}

#[test]
fn writable_section_fails_after_full_scan() {
    let temp = tempdir().unwrap();
    let lib = upstream_tree(temp.path());
    fs::write(lib.join("src/bid_dpd.c"), "static int dpd_table[1024];\n").unwrap();

    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    let outcome =
        pipeline.run(&FakeBuild { section_kind: Some(SectionKind::Data) }, &ElfInspector).unwrap();
    assert_eq!(outcome.state, PipelineState::Verified(Verdict::Fail));

    match outcome.ensure_passed().unwrap_err() {
        PipelineError::Violation { violations, details } => {
            assert_eq!(violations, 1);
            assert!(details[0].starts_with("bid_dpd.o: flags="));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn no_annotated_sections_is_a_warning_not_failure() {
    let temp = tempdir().unwrap();
    upstream_tree(temp.path());

    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    let outcome = pipeline.run(&FakeBuild { section_kind: None }, &ElfInspector).unwrap();
    assert_eq!(outcome.state, PipelineState::Verified(Verdict::SkippedWarning));
    assert_eq!(outcome.verification.as_ref().unwrap().found, 0);
    assert!(outcome.ensure_passed().is_ok());
}

#[test]
fn verification_disabled_stops_at_built_without_tags() {
    let temp = tempdir().unwrap();
    let lib = upstream_tree(temp.path());
    fs::write(lib.join("src/extra_tables.c"), "static int freq_table[256];\n").unwrap();

    let mut pipeline =
        Pipeline::new(temp.path(), PipelineConfig::default(), PipelineOptions::default());
    let outcome = pipeline
        .run(&FakeBuild { section_kind: Some(SectionKind::Data) }, &ElfInspector)
        .unwrap();
    assert_eq!(outcome.state, PipelineState::Built);
    assert!(outcome.state.is_terminal(false));
    assert!(outcome.verification.is_none());
    assert_eq!(
        fs::read_to_string(lib.join("src/extra_tables.c")).unwrap(),
        "static const int freq_table[256];\n"
    );
}

#[test]
fn missing_source_tree_fails_before_patching() {
    let temp = tempdir().unwrap();
    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    let err = pipeline.run(&PrebuiltArchive, &ElfInspector).unwrap_err();
    assert!(matches!(err, PipelineError::MissingSource(_)));
    assert!(err.to_string().contains("IntelRDFPMathLib20U2"));
    assert_eq!(pipeline.state(), PipelineState::NotStarted);
}

#[test]
fn build_failure_aborts_before_verification_and_keeps_patches() {
    let temp = tempdir().unwrap();
    let lib = upstream_tree(temp.path());
    fs::write(lib.join("src/bid_dpd.c"), "static int dpd_table[1024];\n").unwrap();

    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    let err = pipeline.run(&BrokenBuild, &ElfInspector).unwrap_err();
    assert!(matches!(err, PipelineError::Build(_)));
    assert_eq!(pipeline.state(), PipelineState::Patched);
    assert!(fs::read_to_string(lib.join("src/bid_dpd.c")).unwrap().contains("static const int"));
    assert!(lib.join("src/bid_dpd.c.orig").is_file());
}

#[test]
fn prebuilt_backend_requires_archive() {
    let temp = tempdir().unwrap();
    upstream_tree(temp.path());
    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), verify_options());
    let err = pipeline.run(&PrebuiltArchive, &ElfInspector).unwrap_err();
    assert!(err.to_string().contains("did not produce expected archive"));
}

#[test]
fn dry_run_touches_nothing() {
    let temp = tempdir().unwrap();
    let lib = upstream_tree(temp.path());
    fs::write(lib.join("src/bid_dpd.c"), "static int dpd_table[1024];\n").unwrap();

    let options = PipelineOptions { verify: true, dry_run: true };
    let mut pipeline = Pipeline::new(temp.path(), PipelineConfig::default(), options);
    let outcome = pipeline.run(&BrokenBuild, &ElfInspector).unwrap();
    assert_eq!(outcome.state, PipelineState::Patched);
    assert!(outcome.artifact.is_none());
    assert_eq!(outcome.patch.declarations(), 1);
    assert_eq!(fs::read_to_string(lib.join("src/bid_dpd.c")).unwrap(), "static int dpd_table[1024];\n");
}

#[test]
fn environment_check_names_missing_tool() {
    let temp = tempdir().unwrap();
    let mut config = PipelineConfig::default();
    config.toolchain.cc = "constpatch-no-such-compiler".into();
    let pipeline = Pipeline::new(temp.path(), config, verify_options());

    let err = pipeline.check_environment(true, InspectorKind::Builtin).unwrap_err();
    assert!(matches!(err, PipelineError::Environment(_)));
    assert!(err.to_string().contains("constpatch-no-such-compiler"));

    // Patch-only runs need no toolchain at all.
    assert!(pipeline.check_environment(false, InspectorKind::Builtin).unwrap().is_empty());
}

#[test]
fn readelf_is_required_only_when_selected_and_verifying() {
    let temp = tempdir().unwrap();
    let mut config = PipelineConfig::default();
    config.toolchain.readelf = "constpatch-no-such-readelf".into();

    let verifying = Pipeline::new(temp.path(), config.clone(), verify_options());
    let err = verifying.check_environment(false, InspectorKind::Readelf).unwrap_err();
    assert!(err.to_string().contains("section inspection tool"));
    assert!(verifying.check_environment(false, InspectorKind::Builtin).is_ok());

    let plain = Pipeline::new(temp.path(), config, PipelineOptions::default());
    assert!(plain.check_environment(false, InspectorKind::Readelf).is_ok());
}

#[test]
fn make_args_carry_flags_and_build_vars() {
    let temp = tempdir().unwrap();
    let config = PipelineConfig::default();
    let pipeline = Pipeline::new(temp.path(), config.clone(), PipelineOptions::default());
    let request = BuildRequest::from_config(&config, pipeline.layout());
    let args = MakeBuild::make_args(&request);

    assert_eq!(args[0], "CC=arm-none-eabi-gcc");
    assert_eq!(args[1], "AR=arm-none-eabi-ar");
    assert!(args[2]
        .starts_with("CFLAGS_OPT=-mcpu=cortex-m33 -mthumb -mfloat-abi=hard -mfpu=fpv5-sp-d16"));
    assert!(args[2].contains("-ffunction-sections -fdata-sections"));
    assert!(args.contains(&"CALL_BY_REF=0".to_string()));
    assert!(args.contains(&"GLOBAL_RND=0".to_string()));
    assert_eq!(request.library_dir, temp.path().join("IntelRDFPMathLib20U2").join("LIBRARY"));
}
