//! Declaration matcher for mutable static arrays.
//!
//! Recognizes exactly one declaration shape, anchored at column 0:
//!
//! ```text
//! static <Type> <Name>[<digits>?]
//! ```
//!
//! `Type` and `Name` must be single identifier tokens. Anything more elaborate
//! (qualified types, pointers, macro-sized arrays) is deliberately left alone.
//! A line mentioning the `const` keyword anywhere never matches, which is what
//! makes repeated patch passes idempotent.

use serde::{Deserialize, Serialize};

pub const STATIC_KEYWORD: &str = "static";
pub const CONST_KEYWORD: &str = "const";

/// A static array declaration captured from a single source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayDeclaration {
    /// Element type token (e.g. `int`, `BID_UINT64`).
    pub element_type: String,
    /// Array identifier.
    pub name: String,
    /// Literal size digits exactly as written; `None` for a flexible `name[]`.
    pub size: Option<String>,
}

impl ArrayDeclaration {
    /// Numeric value of the size literal, if present and representable.
    pub fn size_value(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Match result carrying the capture plus byte offsets into the original line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationMatch {
    pub declaration: ArrayDeclaration,
    /// Offset of the element type token; `const ` is inserted here.
    pub type_start: usize,
    /// Offset just past the declarator's bracket group(s); annotations go here.
    pub declarator_end: usize,
}

/// Try to match `line` as a promotable static array declaration.
pub fn match_declaration(line: &str) -> Option<DeclarationMatch> {
    if contains_const_keyword(line) {
        return None;
    }

    let rest = line.strip_prefix(STATIC_KEYWORD)?;
    let gap = blank_len(rest);
    if gap == 0 {
        return None;
    }

    let type_start = STATIC_KEYWORD.len() + gap;
    let type_len = identifier_len(&line[type_start..]);
    if type_len == 0 {
        return None;
    }
    let type_end = type_start + type_len;

    let gap = blank_len(&line[type_end..]);
    if gap == 0 {
        return None;
    }
    let name_start = type_end + gap;
    let name_len = identifier_len(&line[name_start..]);
    if name_len == 0 {
        return None;
    }
    let name_end = name_start + name_len;

    let inner = line[name_end..].strip_prefix('[')?;
    let close = inner.find(']')?;
    let size = &inner[..close];
    if !size.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let first_dim_end = name_end + 1 + close + 1;
    let declarator_end = first_dim_end + trailing_dimensions_len(&line[first_dim_end..]);

    Some(DeclarationMatch {
        declaration: ArrayDeclaration {
            element_type: line[type_start..type_end].to_string(),
            name: line[name_start..name_end].to_string(),
            size: if size.is_empty() { None } else { Some(size.to_string()) },
        },
        type_start,
        declarator_end,
    })
}

/// Match a raw source line that may not be valid UTF-8.
///
/// Everything up to `declarator_end` is ASCII in any match, so the offsets are
/// valid byte offsets into `line` even when invalid bytes follow (for example
/// a Latin-1 comment).
pub fn match_declaration_bytes(line: &[u8]) -> Option<DeclarationMatch> {
    match_declaration(&String::from_utf8_lossy(line))
}

/// True when `line` holds a declaration the patch engine would promote.
pub fn is_promotable(line: &str) -> bool {
    match_declaration(line).is_some()
}

/// True when the `const` keyword appears as a whole token anywhere in `line`.
pub fn contains_const_keyword(line: &str) -> bool {
    line.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).any(|tok| tok == CONST_KEYWORD)
}

/// Length of a leading C identifier, or 0 if `s` does not start with one.
fn identifier_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    bytes.iter().take_while(|b| b.is_ascii_alphanumeric() || **b == b'_').count()
}

fn blank_len(s: &str) -> usize {
    s.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

/// Extra `[..]` groups of a multi-dimensional array belong to the same declarator.
fn trailing_dimensions_len(s: &str) -> usize {
    let mut consumed = 0;
    while let Some(rest) = s[consumed..].strip_prefix('[') {
        match rest.find(']') {
            Some(close) if rest[..close].is_ascii() && !rest[..close].contains('[') => {
                consumed += close + 2
            }
            _ => break,
        }
    }
    consumed
}
