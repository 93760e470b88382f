mod common;

use std::fs;

use constpatch::commands::{
    init_config_command, parse_inspector, patch_command, restore_command, run_command,
    select_command, show_config_command, verify_command,
};
use constpatch_core::inspect::InspectorKind;
use object::SectionKind;
use tempfile::tempdir;

use common::{elf_object, read, upstream_with_table, write_archive, SECTION};

#[test]
fn parse_inspector_accepts_known_names() {
    assert_eq!(parse_inspector("builtin").unwrap(), InspectorKind::Builtin);
    assert_eq!(parse_inspector("readelf").unwrap(), InspectorKind::Readelf);
    let err = parse_inspector("nm").unwrap_err();
    assert!(err.to_string().contains("Allowed: builtin, readelf"));
}

#[test]
fn select_errors_when_upstream_missing() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let err = select_command(&root, false).unwrap_err();
    assert!(err.to_string().contains("Upstream source tree not found"), "unexpected error: {err}");
}

#[test]
fn patch_then_restore_round_trip_through_commands() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let lib = upstream_with_table(temp.path());
    let source = lib.join("src").join("bid_dpd.c");
    let original = read(&source);

    patch_command(&root, true, false, true).unwrap();
    assert!(read(&source).contains(SECTION));

    restore_command(&root, false).unwrap();
    assert_eq!(read(&source), original);
}

#[test]
fn verify_errors_when_archive_missing() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let err = verify_command(&root, None, "builtin", None, false).unwrap_err();
    assert!(err.to_string().contains("No archive to verify"), "unexpected error: {err}");
}

#[test]
fn verify_error_names_every_violating_object() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let archive = temp.path().join("build").join("libbid.a");
    write_archive(
        &archive,
        &[
            ("a_tables.o", elf_object(&[(SECTION, SectionKind::Data)])),
            ("b_ok.o", elf_object(&[(SECTION, SectionKind::ReadOnlyData)])),
            ("c_tables.o", elf_object(&[(SECTION, SectionKind::Data)])),
        ],
    );

    let err = verify_command(&root, None, "builtin", None, true).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("2 annotated section(s) ended up writable"), "{message}");
    assert!(message.contains("a_tables.o: flags=WA"));
    assert!(message.contains("c_tables.o: flags=WA"));
    assert!(!message.contains("b_ok.o"));
}

#[test]
fn verify_honours_custom_section_name() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let archive = temp.path().join("libcustom.a");
    write_archive(&archive, &[("x.o", elf_object(&[(".rodata.mine", SectionKind::Data)]))]);

    let archive_arg = Some(archive.to_string_lossy().to_string());
    verify_command(&root, archive_arg.clone(), "builtin", None, false).unwrap();
    let err =
        verify_command(&root, archive_arg, "builtin", Some(".rodata.mine".into()), false)
            .unwrap_err();
    assert!(err.to_string().contains("x.o: flags=WA"));
}

#[test]
fn run_dry_run_stops_after_patch_report() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    let lib = upstream_with_table(temp.path());
    let source = lib.join("src").join("bid_dpd.c");
    let original = read(&source);

    // Dry runs need no toolchain and produce no archive.
    run_command(&root, false, "builtin", false, true, false).unwrap();
    assert_eq!(read(&source), original);
    assert!(!temp.path().join("build").exists());
}

#[test]
fn config_commands_use_file_in_root() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    init_config_command(&root, false).unwrap();

    let path = temp.path().join("constpatch.yaml");
    let edited = read(&path).replace("libbid.a", "libbid_m4.a");
    fs::write(&path, edited).unwrap();
    show_config_command(&root, true).unwrap();

    let err = init_config_command(&root, false).unwrap_err();
    assert!(err.to_string().contains("--force"));
}

#[test]
fn corrupt_config_is_reported() {
    let temp = tempdir().unwrap();
    let root = temp.path().to_string_lossy().to_string();
    fs::write(temp.path().join("constpatch.json"), "not-json").unwrap();
    let err = show_config_command(&root, false).unwrap_err();
    assert!(err.to_string().contains("Failed to load pipeline config"));
}
