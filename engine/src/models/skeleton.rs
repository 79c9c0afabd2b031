use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One parameter of a function or method signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// A method of a class. Complexity starts at 1 and only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub name: String,
    pub line: usize,
    pub params: Vec<ParamRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    pub is_async: bool,
    pub decorators: Vec<String>,
    /// First line of the docstring, or empty.
    pub docstring: String,
    pub complexity: u32,
}

impl MethodRecord {
    /// Signature text as it appears in a skeleton: `def name(a, b: int) -> T`.
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| {
                let mut s = p.name.clone();
                if let Some(ann) = &p.annotation {
                    s.push_str(": ");
                    s.push_str(ann);
                }
                if let Some(def) = &p.default {
                    s.push_str(if p.annotation.is_some() { " = " } else { "=" });
                    s.push_str(def);
                }
                s
            })
            .collect::<Vec<_>>()
            .join(", ");
        let prefix = if self.is_async { "async def" } else { "def" };
        match &self.returns {
            Some(ret) => format!("{prefix} {}({params}) -> {ret}", self.name),
            None => format!("{prefix} {}({params})", self.name),
        }
    }
}

/// A module-level function; nested functions carry the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub line: usize,
    pub params: Vec<ParamRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub docstring: String,
    pub complexity: u32,
    pub is_nested: bool,
}

impl FunctionRecord {
    pub fn signature(&self) -> String {
        MethodRecord {
            name: self.name.clone(),
            line: self.line,
            params: self.params.clone(),
            returns: self.returns.clone(),
            is_async: self.is_async,
            decorators: self.decorators.clone(),
            docstring: self.docstring.clone(),
            complexity: self.complexity,
        }
        .signature()
    }
}

/// Where a field declaration was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    ClassBody,
    InitAssignment,
}

/// A class attribute: either a class-body annotated assignment or a
/// `self.x = ...` lifted from `__init__`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub source: FieldSource,
    /// Keyword constraints mined from `Field(...)` defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, String>,
}

/// Detected modelling framework for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Pydantic,
    Dataclass,
    TypedDict,
    NamedTuple,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub name: String,
    pub line: usize,
    /// Base classes as written in source.
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: String,
    pub methods: Vec<MethodRecord>,
    pub fields: Vec<FieldRecord>,
    pub model_kind: ModelKind,
}

/// Upper-case module-level assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantRecord {
    pub name: String,
    pub line: usize,
}

/// A Pydantic validator method, keyed by the decorator that marked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    pub class_name: String,
    pub method_name: String,
    /// One of `validator`, `field_validator`, `root_validator`, `model_validator`.
    pub decorator: String,
    pub line: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_renders_annotations_and_defaults() {
        let m = MethodRecord {
            name: "fetch".into(),
            line: 10,
            params: vec![
                ParamRecord {
                    name: "self".into(),
                    annotation: None,
                    default: None,
                },
                ParamRecord {
                    name: "url".into(),
                    annotation: Some("str".into()),
                    default: None,
                },
                ParamRecord {
                    name: "retries".into(),
                    annotation: Some("int".into()),
                    default: Some("3".into()),
                },
            ],
            returns: Some("Response".into()),
            is_async: true,
            decorators: vec![],
            docstring: String::new(),
            complexity: 1,
        };
        assert_eq!(
            m.signature(),
            "async def fetch(self, url: str, retries: int = 3) -> Response"
        );
    }

    #[test]
    fn bare_default_has_no_spaces() {
        let m = MethodRecord {
            name: "f".into(),
            line: 1,
            params: vec![ParamRecord {
                name: "x".into(),
                annotation: None,
                default: Some("None".into()),
            }],
            returns: None,
            is_async: false,
            decorators: vec![],
            docstring: String::new(),
            complexity: 1,
        };
        assert_eq!(m.signature(), "def f(x=None)");
    }
}
