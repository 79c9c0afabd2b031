use crate::models::callgraph::CallKind;
use crate::models::file::ModulePath;
use crate::models::logic::LogicMap;
use crate::models::skeleton::{ClassRecord, ConstantRecord, FunctionRecord, ValidatorRecord};
use serde::{Deserialize, Serialize};

/// One import statement after relative-import resolution, before target
/// classification (internal/external/stdlib happens in the import graph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImport {
    /// Dotted module part, absolute (`pkg.sub` for `from .sub import x` in `pkg`).
    pub module: String,
    /// Imported symbol for from-imports (`x` in `from a import x`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub line: usize,
}

impl RawImport {
    /// The full dotted path used for target resolution.
    pub fn dotted_target(&self) -> String {
        match &self.symbol {
            Some(sym) if self.module.is_empty() => sym.clone(),
            Some(sym) => format!("{}.{}", self.module, sym),
            None => self.module.clone(),
        }
    }
}

/// A call site before cross-module classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCallSite {
    /// Containing function, or `<module>`.
    pub caller: String,
    pub target: String,
    pub line: usize,
    pub kind: CallKind,
}

/// An environment-variable read site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvRead {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub line: usize,
}

/// A string literal long enough to be a prompt or template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongLiteral {
    pub line: usize,
    pub length: usize,
    pub excerpt: String,
}

/// Counters behind the type-annotation coverage ratio. `self` and `cls`
/// never count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTally {
    pub annotated_params: usize,
    pub total_params: usize,
    pub annotated_returns: usize,
    pub function_count: usize,
}

impl AnnotationTally {
    pub fn merge(&mut self, other: &AnnotationTally) {
        self.annotated_params += other.annotated_params;
        self.total_params += other.total_params;
        self.annotated_returns += other.annotated_returns;
        self.function_count += other.function_count;
    }

    /// (annotated params + annotated returns) / (total params + function count).
    pub fn coverage(&self) -> f64 {
        let denom = self.total_params + self.function_count;
        if denom == 0 {
            return 0.0;
        }
        (self.annotated_params + self.annotated_returns) as f64 / denom as f64
    }
}

/// Everything extracted from one file in a single AST traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub module: ModulePath,
    pub relative_path: String,
    /// First line of the module docstring, or empty.
    pub docstring: String,
    pub classes: Vec<ClassRecord>,
    pub functions: Vec<FunctionRecord>,
    pub constants: Vec<ConstantRecord>,
    pub imports: Vec<RawImport>,
    pub calls: Vec<RawCallSite>,
    pub annotations: AnnotationTally,
    pub has_main_guard: bool,
    pub env_reads: Vec<EnvRead>,
    pub long_literals: Vec<LongLiteral>,
    pub validators: Vec<ValidatorRecord>,
    /// Flow maps for every hotspot candidate in this file; the orchestrator
    /// keeps only the global top N.
    pub logic_candidates: Vec<LogicMap>,
}

impl FileAnalysis {
    /// Empty analysis for files that failed to read or parse.
    pub fn empty(module: ModulePath, relative_path: String) -> Self {
        Self {
            module,
            relative_path,
            docstring: String::new(),
            classes: Vec::new(),
            functions: Vec::new(),
            constants: Vec::new(),
            imports: Vec::new(),
            calls: Vec::new(),
            annotations: AnnotationTally::default(),
            has_main_guard: false,
            env_reads: Vec::new(),
            long_literals: Vec::new(),
            validators: Vec::new(),
            logic_candidates: Vec::new(),
        }
    }
}
