use crate::models::file::ModulePath;
use serde::{Deserialize, Serialize};

/// The five side-effect categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectCategory {
    Db,
    Api,
    File,
    Env,
    Subprocess,
}

impl SideEffectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SideEffectCategory::Db => "DB",
            SideEffectCategory::Api => "API",
            SideEffectCategory::File => "File",
            SideEffectCategory::Env => "Env",
            SideEffectCategory::Subprocess => "Subprocess",
        }
    }
}

impl std::fmt::Display for SideEffectCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A call site categorised as a side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffect {
    pub category: SideEffectCategory,
    pub callee: String,
    pub file: String,
    pub line: usize,
}

/// Symbolic control-flow rendering of one high-complexity function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicMap {
    pub module: ModulePath,
    pub function: String,
    pub line: usize,
    pub signature: String,
    pub docstring: String,
    pub complexity: u32,
    /// Flow steps in the symbolic grammar, indentation already applied.
    pub flow: Vec<String>,
    pub side_effects: Vec<SideEffectCategory>,
    /// `self.*` targets assigned within the function.
    pub state_mutations: Vec<String>,
    pub external_inputs: Vec<String>,
    pub body_bytes: usize,
    pub map_bytes: usize,
}

impl LogicMap {
    /// Byte reduction of the map against the full body, in percent.
    pub fn reduction_pct(&self) -> f64 {
        if self.body_bytes == 0 {
            return 0.0;
        }
        100.0 * (1.0 - self.map_bytes as f64 / self.body_bytes as f64)
    }
}

/// A function ranked by cyclomatic complexity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotEntry {
    pub module: ModulePath,
    /// `Class.method` for methods, bare name for functions.
    pub function: String,
    pub line: usize,
    pub complexity: u32,
}
