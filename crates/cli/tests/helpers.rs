use std::fs;
use std::path::Path;

use constpatch::{canonicalize_or_current, display_relative};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_resolves_existing_relative_path() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_keeps_missing_absolute_path() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("not-created-yet");
    let result = canonicalize_or_current(&missing.to_string_lossy()).expect("path");
    assert_eq!(result, missing);
}

#[test]
fn display_relative_strips_base_when_nested() {
    let base = Path::new("/work/LIBRARY");
    assert_eq!(display_relative(Path::new("/work/LIBRARY/src/bid_dpd.c"), base), "src/bid_dpd.c");
    assert_eq!(display_relative(Path::new("/elsewhere/x.c"), base), "/elsewhere/x.c");
}
