//! Backup bookkeeping for patched source files.
//!
//! Backups live next to the file they protect (`bid_dpd.c` -> `bid_dpd.c.orig`).
//! The store remembers which backup paths exist so every write is checked
//! against it first. With the default first-write-wins policy a backup taken
//! by an older rule version is kept as-is and may be stale; the versioned
//! policy keys each snapshot by a content hash instead.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

pub const DEFAULT_BACKUP_SUFFIX: &str = ".orig";

/// Number of hex digits of the content hash used in versioned backup names.
const VERSION_HASH_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupPolicy {
    /// A backup that already exists is never overwritten.
    #[default]
    FirstWriteWins,
    /// Each distinct pre-modification content gets its own backup file.
    Versioned,
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Failed to write backup {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error("Failed to restore {} from {}: {source}", target.display(), backup.display())]
    Restore { backup: PathBuf, target: PathBuf, source: std::io::Error },
    #[error("Backup suffix must not be empty")]
    EmptySuffix,
    #[error("Backup path {} is the file it should protect", .0.display())]
    SameAsSource(PathBuf),
}

/// What happened to the backup for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOutcome {
    pub path: PathBuf,
    /// False when an existing backup was left in place.
    pub created: bool,
}

/// `<file><suffix>` next to `source`.
pub fn backup_path_for(source: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = source.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    source.with_file_name(name)
}

/// `<file><suffix>.<hash8>` next to `source`, keyed by the content being preserved.
pub fn versioned_backup_path_for(source: &Path, suffix: &str, content: &[u8]) -> PathBuf {
    let digest = format!("{:x}", Sha256::digest(content));
    let versioned_suffix = format!("{suffix}.{}", &digest[..VERSION_HASH_LEN]);
    backup_path_for(source, &versioned_suffix)
}

/// Keyed store of backup paths (path -> exists) consulted before every write.
#[derive(Debug)]
pub struct BackupStore {
    suffix: String,
    policy: BackupPolicy,
    known: HashMap<PathBuf, bool>,
}

impl BackupStore {
    pub fn new(suffix: impl Into<String>, policy: BackupPolicy) -> Self {
        Self { suffix: suffix.into(), policy, known: HashMap::new() }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn policy(&self) -> BackupPolicy {
        self.policy
    }

    /// Backup path that would protect `source` holding `content`.
    pub fn backup_path(&self, source: &Path, content: &[u8]) -> PathBuf {
        match self.policy {
            BackupPolicy::FirstWriteWins => backup_path_for(source, &self.suffix),
            BackupPolicy::Versioned => versioned_backup_path_for(source, &self.suffix, content),
        }
    }

    /// Whether a backup exists at `backup`; the filesystem is only asked once per path.
    pub fn exists(&mut self, backup: &Path) -> bool {
        *self.known.entry(backup.to_path_buf()).or_insert_with(|| backup.exists())
    }

    /// Preserve `content` as the backup of `source` unless one is already there.
    pub fn ensure(&mut self, source: &Path, content: &[u8]) -> Result<BackupOutcome, BackupError> {
        let backup = self.backup_path(source, content);
        if backup == source {
            return Err(BackupError::SameAsSource(backup));
        }
        if self.exists(&backup) {
            return Ok(BackupOutcome { path: backup, created: false });
        }
        fs::write(&backup, content)
            .map_err(|source| BackupError::Write { path: backup.clone(), source })?;
        self.known.insert(backup.clone(), true);
        Ok(BackupOutcome { path: backup, created: true })
    }
}

/// Copy `<source><suffix>` back over `source`. Returns false when no backup exists.
pub fn restore_from_backup(source: &Path, suffix: &str) -> Result<bool, BackupError> {
    let backup = backup_path_for(source, suffix);
    if backup == source {
        return Err(BackupError::SameAsSource(backup));
    }
    if !backup.is_file() {
        return Ok(false);
    }
    fs::copy(&backup, source).map_err(|e| BackupError::Restore {
        backup: backup.clone(),
        target: source.to_path_buf(),
        source: e,
    })?;
    Ok(true)
}

/// Restore every source under `root` that has a first-write backup.
///
/// Returns the restored source paths in walk order. Versioned backups are
/// left for the operator to pick from.
pub fn restore_tree(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, BackupError> {
    if suffix.is_empty() {
        return Err(BackupError::EmptySuffix);
    }
    let mut restored = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name().into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else { continue };
        let Some(original) = name.strip_suffix(suffix).filter(|n| !n.is_empty()) else {
            continue;
        };
        let source = entry.path().with_file_name(original);
        if restore_from_backup(&source, suffix)? {
            restored.push(source);
        }
    }
    Ok(restored)
}
