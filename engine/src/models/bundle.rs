use crate::models::analysis::FileAnalysis;
use crate::models::callgraph::CallGraphReport;
use crate::models::config::SectionMap;
use crate::models::coverage::{TechDebtReport, TestCoverageReport};
use crate::models::file::{FileRecord, ParseStatus};
use crate::models::gaps::GapReport;
use crate::models::git::GitReport;
use crate::models::graph::ImportGraphReport;
use crate::models::logic::{HotspotEntry, LogicMap, SideEffect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Run-level metadata carried at the head of the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub target: PathBuf,
    pub total_files: usize,
    pub total_lines: usize,
    pub total_token_estimate: usize,
    pub parse_failures: usize,
}

/// Complexity results: ranked hotspots plus logic maps for the top N.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub hotspots: Vec<HotspotEntry>,
    pub logic_maps: Vec<LogicMap>,
    /// Tree-wide type-annotation coverage in [0, 1].
    pub annotation_coverage: f64,
}

/// Side-effect results with per-category counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideEffectReport {
    pub effects: Vec<SideEffect>,
    pub by_category: BTreeMap<String, usize>,
}

/// The top-level immutable aggregate: one run, one bundle.
///
/// A run is a pure function of (target tree, current time, git state,
/// configuration); the bundle round-trips through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub metadata: BundleMetadata,
    pub sections: SectionMap,
    pub files: Vec<FileRecord>,
    pub modules: Vec<FileAnalysis>,
    pub import_graph: ImportGraphReport,
    pub call_graph: CallGraphReport,
    pub side_effects: SideEffectReport,
    pub complexity: ComplexityReport,
    pub git: GitReport,
    pub gaps: GapReport,
    pub test_coverage: TestCoverageReport,
    pub tech_debt: TechDebtReport,
    pub warnings: Vec<String>,
}

impl AnalysisBundle {
    pub fn parse_failures(files: &[FileRecord]) -> usize {
        files
            .iter()
            .filter(|f| f.parse_status != ParseStatus::Parsed)
            .count()
    }
}
