use crate::models::file::ModulePath;
use serde::{Deserialize, Serialize};

/// Why a file would eat a disproportionate share of a context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardReason {
    Large,
    Generated,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hazard {
    pub relative_path: String,
    pub token_estimate: usize,
    pub reason: HazardReason,
    /// Glob an assistant should exclude: `<dir>/**` for hazard clusters,
    /// otherwise the specific path.
    pub suggested_glob: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    MainGuard,
    ScriptEntry,
    ConsoleEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CliFramework {
    Argparse,
    Click,
    Typer,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliArgument {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub relative_path: String,
    pub kind: EntryKind,
    pub framework: CliFramework,
    pub arguments: Vec<CliArgument>,
}

/// An environment variable read observed in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Required iff no default was supplied at any read site.
    pub required: bool,
    pub file: String,
    pub line: usize,
}

/// Lint configuration extracted from the project tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_length: Option<usize>,
    pub select: Vec<String>,
    pub ignore: Vec<String>,
    /// Which file the rules came from, when any were found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// The "rosetta stone": one small test file showing the house testing style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestExample {
    pub relative_path: String,
    pub lines: usize,
    pub patterns: Vec<String>,
    pub text: String,
}

/// Dominant-domain heuristic for the prose summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectDomain {
    AgentOriented,
    ApiOriented,
    DataProcessing,
    CliTool,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PillarModule {
    pub module: ModulePath,
    pub fan_in: usize,
}

/// A prompt-like string literal found in agent/prompt modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaEntry {
    pub relative_path: String,
    pub line: usize,
    pub excerpt: String,
}

/// Composite of the derived "gap" features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapReport {
    pub hazards: Vec<Hazard>,
    pub entry_points: Vec<EntryPoint>,
    pub env_vars: Vec<EnvVarRecord>,
    pub linter_rules: LinterRules,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_example: Option<TestExample>,
    pub pillars: Vec<PillarModule>,
    pub maintenance_hotspots: Vec<crate::models::git::RiskEntry>,
    pub prose: String,
    pub domain: Option<ProjectDomain>,
    pub personas: Vec<PersonaEntry>,
}
