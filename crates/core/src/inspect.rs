//! Section inspection collaborators.
//!
//! Two inspectors are provided: an in-process ELF reader (default) and one
//! that shells out to `readelf -S -W` and parses its table. Both report flags
//! in readelf letter notation so the verifier does not care which ran.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use goblin::elf::section_header::{
    SHF_ALLOC, SHF_COMPRESSED, SHF_EXECINSTR, SHF_GROUP, SHF_INFO_LINK, SHF_LINK_ORDER,
    SHF_MERGE, SHF_OS_NONCONFORMING, SHF_STRINGS, SHF_TLS, SHF_WRITE,
};
use goblin::elf::Elf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SHF_EXCLUDE: u64 = 0x8000_0000;

/// Flag bits in the order readelf prints their letters.
const FLAG_LETTERS: &[(u64, char)] = &[
    (SHF_WRITE as u64, 'W'),
    (SHF_ALLOC as u64, 'A'),
    (SHF_EXECINSTR as u64, 'X'),
    (SHF_MERGE as u64, 'M'),
    (SHF_STRINGS as u64, 'S'),
    (SHF_INFO_LINK as u64, 'I'),
    (SHF_LINK_ORDER as u64, 'L'),
    (SHF_OS_NONCONFORMING as u64, 'O'),
    (SHF_GROUP as u64, 'G'),
    (SHF_TLS as u64, 'T'),
    (SHF_COMPRESSED as u64, 'C'),
    (SHF_EXCLUDE, 'E'),
];

/// One section header as seen in one object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    /// Object identifier (archive member name).
    pub object: String,
    pub name: String,
    /// readelf-style flag letters, e.g. `WA` or `A`.
    pub flags: String,
}

impl SectionRecord {
    pub fn is_writable(&self) -> bool {
        self.flags.contains('W')
    }
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Failed to read object {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse object {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Section inspection tool error: {0}")]
    Tool(String),
}

/// Trait implemented by section inspectors.
pub trait SectionInspector {
    fn inspect(&self, object: &Path) -> Result<Vec<SectionRecord>, InspectError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectorKind {
    Builtin,
    Readelf,
}

impl InspectorKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "builtin" => Some(Self::Builtin),
            "readelf" => Some(Self::Readelf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Readelf => "readelf",
        }
    }
}

fn object_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Render `sh_flags` as readelf letters.
pub fn flag_letters(sh_flags: u64) -> String {
    FLAG_LETTERS.iter().filter(|(bit, _)| sh_flags & bit != 0).map(|(_, c)| *c).collect()
}

/// Reads ELF section headers in-process.
pub struct ElfInspector;

impl SectionInspector for ElfInspector {
    fn inspect(&self, object: &Path) -> Result<Vec<SectionRecord>, InspectError> {
        let bytes = fs::read(object)
            .map_err(|source| InspectError::Io { path: object.to_path_buf(), source })?;
        let elf = Elf::parse(&bytes).map_err(|e| InspectError::Parse {
            path: object.to_path_buf(),
            message: e.to_string(),
        })?;
        let owner = object_name(object);
        Ok(elf
            .section_headers
            .iter()
            .filter_map(|sh| {
                let name = elf.shdr_strtab.get_at(sh.sh_name)?;
                if name.is_empty() {
                    return None;
                }
                Some(SectionRecord {
                    object: owner.clone(),
                    name: name.to_string(),
                    flags: flag_letters(sh.sh_flags),
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "builtin"
    }
}

/// Shells out to `readelf -S -W`.
pub struct ReadelfInspector {
    pub readelf: PathBuf,
}

impl ReadelfInspector {
    pub fn new(readelf: impl Into<PathBuf>) -> Self {
        Self { readelf: readelf.into() }
    }
}

impl SectionInspector for ReadelfInspector {
    fn inspect(&self, object: &Path) -> Result<Vec<SectionRecord>, InspectError> {
        let output = Command::new(&self.readelf)
            .args(["-S", "-W"])
            .arg(object)
            .output()
            .map_err(|e| {
                InspectError::Tool(format!("failed to spawn {}: {e}", self.readelf.display()))
            })?;
        if !output.status.success() {
            return Err(InspectError::Tool(format!(
                "{} exited with {} for {}",
                self.readelf.display(),
                output.status,
                object.display()
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let owner = object_name(object);
        Ok(parse_readelf_sections(&stdout)
            .into_iter()
            .map(|(name, flags)| SectionRecord { object: owner.clone(), name, flags })
            .collect())
    }

    fn name(&self) -> &'static str {
        "readelf"
    }
}

/// Extract `(name, flags)` pairs from `readelf -S -W` output.
///
/// Rows look like `[ 4] .rodata.x PROGBITS 00000000 000034 000400 00   A  0   0  4`;
/// the flags column is blank for sections without flags, which shifts the
/// token count by one. The unnamed null section and the header row are skipped.
pub fn parse_readelf_sections(body: &str) -> Vec<(String, String)> {
    body.lines()
        .filter_map(|line| {
            let row = line.trim_start().strip_prefix('[')?;
            let (index, rest) = row.split_once(']')?;
            if index.trim().parse::<u32>().is_err() {
                return None;
            }
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            match tokens.len() {
                10 => Some((tokens[0].to_string(), tokens[6].to_string())),
                9 => Some((tokens[0].to_string(), String::new())),
                _ => None,
            }
        })
        .collect()
}
