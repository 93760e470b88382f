//! Aggregation of annotated-section findings into a verdict.

use serde::{Deserialize, Serialize};

use crate::inspect::SectionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    /// No annotated section in any member; reported, not fatal.
    SkippedWarning,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Fail => "fail",
            Verdict::SkippedWarning => "skipped_warning",
        }
    }
}

/// An annotated section that ended up writable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub object: String,
    pub flags: String,
}

impl Violation {
    pub fn summary_line(&self) -> String {
        format!("{}: flags={}", self.object, self.flags)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// 1 if at least one annotated section exists across all members, else 0.
    pub found: u32,
    /// Number of annotated sections seen.
    pub sections: usize,
    pub violations: usize,
    pub violating: Vec<Violation>,
}

impl VerificationResult {
    pub fn verdict(&self) -> Verdict {
        if self.violations > 0 {
            Verdict::Fail
        } else if self.found == 0 {
            Verdict::SkippedWarning
        } else {
            Verdict::Pass
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        self.violating.iter().map(Violation::summary_line).collect()
    }
}

/// Aggregate annotated-section records, keeping their enumeration order.
pub fn summarize(records: &[SectionRecord]) -> VerificationResult {
    let violating: Vec<Violation> = records
        .iter()
        .filter(|r| r.is_writable())
        .map(|r| Violation { object: r.object.clone(), flags: r.flags.clone() })
        .collect();

    VerificationResult {
        found: u32::from(!records.is_empty()),
        sections: records.len(),
        violations: violating.len(),
        violating,
    }
}
