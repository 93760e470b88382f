//! Candidate file selection: reviewed allow-list first, then a fallback scan.
//!
//! The scan picks up any source file containing at least one promotable
//! declaration, so tables added by upstream updates are not missed. It can
//! also pick up an array that upstream mutates on purpose; such files belong
//! in the deny list, which only filters the scan and never the allow-list.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::matcher::match_declaration_bytes;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Source root does not exist: {}", .0.display())]
    MissingRoot(PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPolicy {
    /// Paths relative to the scan root, in review order.
    pub allow_list: Vec<PathBuf>,
    /// Paths relative to the scan root that the fallback scan must not pick up.
    pub deny_list: Vec<PathBuf>,
    /// File extensions (without dot) eligible for the fallback scan.
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    AllowList,
    Scan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub path: PathBuf,
    pub relative: PathBuf,
    pub origin: CandidateOrigin,
}

/// Produce the ordered, duplicate-free candidate list under `root`.
///
/// Allow-listed entries are returned even when the file does not exist so the
/// patch step can report them as skipped.
pub fn select_candidates(
    root: &Path,
    policy: &SelectionPolicy,
) -> Result<Vec<Candidate>, SelectionError> {
    if !root.is_dir() {
        return Err(SelectionError::MissingRoot(root.to_path_buf()));
    }

    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut candidates = Vec::new();

    for entry in &policy.allow_list {
        let relative = normalize_relative(root, entry);
        if seen.insert(relative.clone()) {
            candidates.push(Candidate {
                path: root.join(&relative),
                relative,
                origin: CandidateOrigin::AllowList,
            });
        }
    }

    let denied: HashSet<PathBuf> = policy.deny_list.iter().map(|p| normalize_relative(root, p)).collect();

    for entry in WalkDir::new(root).sort_by_file_name().into_iter().flatten() {
        if !entry.file_type().is_file() || !has_extension(entry.path(), &policy.extensions) {
            continue;
        }
        let relative = normalize_relative(root, entry.path());
        if seen.contains(&relative) || denied.contains(&relative) {
            continue;
        }
        if !file_has_promotable_declaration(entry.path()) {
            continue;
        }
        seen.insert(relative.clone());
        candidates.push(Candidate {
            path: entry.path().to_path_buf(),
            relative,
            origin: CandidateOrigin::Scan,
        });
    }

    Ok(candidates)
}

/// Unreadable files are treated as having no declarations.
///
/// Lines are judged byte-wise, the same way the patcher rewrites them, so a
/// file is only selected when it will actually change.
pub fn file_has_promotable_declaration(path: &Path) -> bool {
    match fs::read(path) {
        Ok(bytes) => {
            bytes.split(|b| *b == b'\n').any(|line| match_declaration_bytes(line).is_some())
        }
        Err(_) => false,
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Key a path relative to `root`: `.` dropped, `..` resolved lexically, and
/// absolute paths under `root` stripped, so every spelling of one file compares equal.
fn normalize_relative(root: &Path, path: &Path) -> PathBuf {
    let cleaned = lexical_clean(path);
    match cleaned.strip_prefix(lexical_clean(root)) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => cleaned,
    }
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
