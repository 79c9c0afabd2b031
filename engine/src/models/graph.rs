use crate::models::file::ModulePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Classification of an import edge's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Internal,
    External,
    Stdlib,
}

/// One import statement, after relative-import resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub source: ModulePath,
    /// For internal edges this is a ModulePath string; for external/stdlib the
    /// dotted name as written.
    pub target: String,
    pub kind: ImportKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// False for internal edges matched only by a top-level directory name;
    /// such edges are excluded from cycle detection.
    pub resolved: bool,
}

/// Architectural layer of a module, from its in/out degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Foundation,
    Core,
    Orchestration,
    Leaf,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Foundation => "foundation",
            Layer::Core => "core",
            Layer::Orchestration => "orchestration",
            Layer::Leaf => "leaf",
        }
    }
}

/// A module ranked by combined degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubModule {
    pub module: ModulePath,
    pub fan_in: usize,
    pub fan_out: usize,
}

/// The import graph and everything derived from it.
///
/// Nodes are ModulePaths of parsed files; only resolved internal edges take
/// part in distance and cycle computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportGraphReport {
    pub nodes: Vec<ModulePath>,
    pub edges: Vec<ImportEdge>,
    /// Every node has exactly one layer.
    pub layers: BTreeMap<String, Layer>,
    pub hubs: Vec<HubModule>,
    /// Canonicalised (lexicographic) deduplicated mutually-reachable pairs.
    pub circular_pairs: Vec<(String, String)>,
    /// Strongly connected components of size >= 2.
    pub circular_groups: Vec<Vec<String>>,
    pub orphans: Vec<ModulePath>,
    /// Shortest directed path lengths; absent entries are unreachable.
    pub distances: BTreeMap<String, BTreeMap<String, u32>>,
    /// Per-module alias table: alias -> imported dotted target.
    pub aliases: BTreeMap<String, BTreeMap<String, String>>,
    /// Count of distinct external (non-stdlib) top-level imports.
    pub external_packages: BTreeMap<String, usize>,
}

impl ImportGraphReport {
    pub fn imported_by(&self, module: &str) -> Vec<&ImportEdge> {
        self.edges
            .iter()
            .filter(|e| e.kind == ImportKind::Internal && e.target == module)
            .collect()
    }

    pub fn imports(&self, module: &str) -> Vec<&ImportEdge> {
        self.edges
            .iter()
            .filter(|e| e.kind == ImportKind::Internal && e.source.as_str() == module)
            .collect()
    }

    /// Shortest directed distance in edges, or `None` when unreachable.
    pub fn distance(&self, from: &str, to: &str) -> Option<u32> {
        self.distances.get(from).and_then(|row| row.get(to)).copied()
    }
}
