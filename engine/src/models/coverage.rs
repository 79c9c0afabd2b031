use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape of the test tree, without inspecting test content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCoverageReport {
    pub test_files: usize,
    pub test_functions: usize,
    /// Counts by immediate subdirectory under the test roots (`unit`,
    /// `integration`, `e2e`, ...); files directly under a root land in `root`.
    pub by_category: BTreeMap<String, usize>,
    /// `@pytest.fixture` names collected from conftest.py files.
    pub fixtures: Vec<String>,
    pub tested_dirs: Vec<String>,
    pub untested_dirs: Vec<String>,
}

/// Tech-debt marker kinds scanned from comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtMarkerKind {
    Todo,
    Fixme,
    Hack,
    Xxx,
    Bug,
    Optimize,
}

impl DebtMarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtMarkerKind::Todo => "TODO",
            DebtMarkerKind::Fixme => "FIXME",
            DebtMarkerKind::Hack => "HACK",
            DebtMarkerKind::Xxx => "XXX",
            DebtMarkerKind::Bug => "BUG",
            DebtMarkerKind::Optimize => "OPTIMIZE",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "TODO" => Some(DebtMarkerKind::Todo),
            "FIXME" => Some(DebtMarkerKind::Fixme),
            "HACK" => Some(DebtMarkerKind::Hack),
            "XXX" => Some(DebtMarkerKind::Xxx),
            "BUG" => Some(DebtMarkerKind::Bug),
            "OPTIMIZE" => Some(DebtMarkerKind::Optimize),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtMarker {
    pub marker: DebtMarkerKind,
    pub file: String,
    pub line: usize,
    /// Text after the marker keyword, trimmed.
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechDebtReport {
    pub markers: Vec<DebtMarker>,
    pub counts: BTreeMap<String, usize>,
}
