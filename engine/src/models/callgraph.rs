use crate::models::file::ModulePath;
use serde::{Deserialize, Serialize};

/// Syntactic shape of a call target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Name,
    Attribute,
    Subscript,
}

/// One observed call. The target is the dotted name as written; ambiguous
/// names are never resolved to definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    pub module: ModulePath,
    /// Containing function, or `<module>` for top-level calls.
    pub caller: String,
    pub target: String,
    pub line: usize,
    pub kind: CallKind,
    pub cross_module: bool,
}

/// How widely a symbol is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
}

impl ImpactLevel {
    /// low < 5 call sites, medium 5-20, high > 20.
    pub fn from_count(count: usize) -> Self {
        if count > 20 {
            ImpactLevel::High
        } else if count >= 5 {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolUsage {
    pub symbol: String,
    pub count: usize,
    pub impact: ImpactLevel,
}

/// Aggregated call sites across the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphReport {
    pub sites: Vec<CallSite>,
    /// (symbol, count) sorted by count descending, then symbol ascending.
    pub most_called: Vec<SymbolUsage>,
}

impl CallGraphReport {
    /// Every call site whose textual target matches `symbol` exactly.
    pub fn callers_of(&self, symbol: &str) -> Vec<&CallSite> {
        self.sites.iter().filter(|s| s.target == symbol).collect()
    }
}
