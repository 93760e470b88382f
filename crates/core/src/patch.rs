//! Source patch engine: const-promotion plus optional section annotation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backup::{BackupError, BackupOutcome, BackupStore};
use crate::matcher::{match_declaration_bytes, ArrayDeclaration, CONST_KEYWORD};

/// Section that annotated declarations are steered into for later inspection.
pub const DEFAULT_ANNOTATION_SECTION: &str = ".rodata.constcheck";

/// GCC attribute placing a declaration into `section`.
pub fn annotation_tag(section: &str) -> String {
    format!("__attribute__((section(\"{section}\")))")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOptions {
    /// Append the section annotation to each promoted declaration.
    pub annotate: bool,
    pub section: String,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { annotate: false, section: DEFAULT_ANNOTATION_SECTION.to_string() }
    }
}

impl PatchOptions {
    pub fn annotated(section: impl Into<String>) -> Self {
        Self { annotate: true, section: section.into() }
    }
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Failed to write patched file {}: {source}", path.display())]
    Write { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Backup(#[from] BackupError),
}

/// One declaration rewritten in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchedDeclaration {
    /// 1-based line number.
    pub line: usize,
    pub declaration: ArrayDeclaration,
    pub annotated: bool,
}

/// Result of patching an in-memory source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePatch {
    pub content: String,
    pub declarations: Vec<PatchedDeclaration>,
}

impl SourcePatch {
    pub fn is_changed(&self) -> bool {
        !self.declarations.is_empty()
    }
}

/// Rewrite a single line, returning `None` when it is not promotable.
///
/// `static T name[N]` becomes `static const T name[N]`, keeping the original
/// spacing and bracket contents. With annotation enabled the tag is inserted
/// after the declarator unless the line already carries it.
pub fn patch_line(line: &str, options: &PatchOptions) -> Option<(String, PatchedDeclaration)> {
    let (bytes, declaration) = patch_line_bytes(line.as_bytes(), options)?;
    // Only ASCII is inserted, at ASCII offsets, so valid input stays valid.
    Some((String::from_utf8_lossy(&bytes).into_owned(), declaration))
}

/// `patch_line` over raw bytes; bytes outside the declarator are copied untouched.
pub fn patch_line_bytes(
    line: &[u8],
    options: &PatchOptions,
) -> Option<(Vec<u8>, PatchedDeclaration)> {
    let found = match_declaration_bytes(line)?;
    let tag = annotation_tag(&options.section);
    let annotate = options.annotate && !contains_bytes(line, tag.as_bytes());

    let mut out = Vec::with_capacity(line.len() + CONST_KEYWORD.len() + tag.len() + 2);
    out.extend_from_slice(&line[..found.type_start]);
    out.extend_from_slice(CONST_KEYWORD.as_bytes());
    out.push(b' ');
    out.extend_from_slice(&line[found.type_start..found.declarator_end]);
    if annotate {
        out.push(b' ');
        out.extend_from_slice(tag.as_bytes());
    }
    out.extend_from_slice(&line[found.declarator_end..]);

    Some((out, PatchedDeclaration { line: 0, declaration: found.declaration, annotated: annotate }))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Apply `patch_line` to every line of `content`, preserving line endings.
pub fn patch_source(content: &str, options: &PatchOptions) -> SourcePatch {
    let (bytes, declarations) = patch_bytes(content.as_bytes(), options);
    SourcePatch { content: String::from_utf8_lossy(&bytes).into_owned(), declarations }
}

/// Byte-level `patch_source`; the file patcher uses it so non-UTF-8 sources are handled too.
pub fn patch_bytes(content: &[u8], options: &PatchOptions) -> (Vec<u8>, Vec<PatchedDeclaration>) {
    let mut out = Vec::with_capacity(content.len());
    let mut declarations = Vec::new();

    for (idx, raw) in content.split_inclusive(|b| *b == b'\n').enumerate() {
        let (body, ending) = split_line_ending(raw);
        match patch_line_bytes(body, options) {
            Some((patched, mut decl)) => {
                decl.line = idx + 1;
                out.extend_from_slice(&patched);
                declarations.push(decl);
            }
            None => out.extend_from_slice(body),
        }
        out.extend_from_slice(ending);
    }

    (out, declarations)
}

fn split_line_ending(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_suffix(b"\r\n") {
        (body, &b"\r\n"[..])
    } else if let Some(body) = raw.strip_suffix(b"\n") {
        (body, &b"\n"[..])
    } else {
        (raw, &[][..])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchStatus {
    Patched,
    /// Would have been patched; nothing was written.
    DryRun,
    Unchanged,
    Skipped(SkipReason),
}

/// Per-file outcome of a patch pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatchOutcome {
    pub path: PathBuf,
    pub status: PatchStatus,
    pub declarations: Vec<PatchedDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    pub files: Vec<FilePatchOutcome>,
}

impl PatchReport {
    pub fn patched_files(&self) -> usize {
        self.count(|s| matches!(s, PatchStatus::Patched | PatchStatus::DryRun))
    }

    pub fn skipped_files(&self) -> usize {
        self.count(|s| matches!(s, PatchStatus::Skipped(_)))
    }

    pub fn declarations(&self) -> usize {
        self.files.iter().map(|f| f.declarations.len()).sum()
    }

    fn count(&self, pred: impl Fn(&PatchStatus) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.status)).count()
    }
}

/// Applies `PatchOptions` to files on disk, backing each one up before the first write.
pub struct SourcePatcher {
    options: PatchOptions,
    backups: BackupStore,
    dry_run: bool,
}

impl SourcePatcher {
    pub fn new(options: PatchOptions, backups: BackupStore) -> Self {
        Self { options, backups, dry_run: false }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    pub fn patch_file(&mut self, path: &Path) -> Result<FilePatchOutcome, PatchError> {
        let outcome = |status, declarations, backup| FilePatchOutcome {
            path: path.to_path_buf(),
            status,
            declarations,
            backup,
        };

        if !path.is_file() {
            return Ok(outcome(PatchStatus::Skipped(SkipReason::Missing), vec![], None));
        }

        let bytes =
            fs::read(path).map_err(|source| PatchError::Read { path: path.to_path_buf(), source })?;
        let (patched, declarations) = patch_bytes(&bytes, &self.options);
        if declarations.is_empty() {
            return Ok(outcome(PatchStatus::Unchanged, vec![], None));
        }
        if self.dry_run {
            return Ok(outcome(PatchStatus::DryRun, declarations, None));
        }

        let backup = self.backups.ensure(path, &bytes)?;
        fs::write(path, patched)
            .map_err(|source| PatchError::Write { path: path.to_path_buf(), source })?;

        Ok(outcome(PatchStatus::Patched, declarations, Some(backup)))
    }

    /// Patch files in order; skipped files are recorded, I/O failures abort.
    pub fn patch_files<'a, I>(&mut self, paths: I) -> Result<PatchReport, PatchError>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut report = PatchReport::default();
        for path in paths {
            report.files.push(self.patch_file(path)?);
        }
        Ok(report)
    }
}
