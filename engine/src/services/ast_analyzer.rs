use crate::models::analysis::{
    AnnotationTally, EnvRead, FileAnalysis, LongLiteral, RawCallSite, RawImport,
};
use crate::models::callgraph::CallKind;
use crate::models::file::{FileRecord, ModulePath, ParseStatus};
use crate::models::logic::LogicMap;
use crate::models::skeleton::{
    ClassRecord, ConstantRecord, FieldRecord, FieldSource, FunctionRecord, MethodRecord,
    ModelKind, ParamRecord, ValidatorRecord,
};
use crate::services::logic_map::{self, LogicMapConfig};
use crate::utils::{collapse_ws, truncate_chars};
use line_numbers::LinePositions;
use rustpython_parser::ast::{self, Ranged};
use rustpython_parser::{parse, Mode};
use std::collections::BTreeMap;
use tracing::debug;

/// Decorators that mark Pydantic validator methods.
const VALIDATOR_DECORATORS: &[&str] = &[
    "validator",
    "field_validator",
    "root_validator",
    "model_validator",
];

#[derive(Debug, Clone)]
pub struct AstConfig {
    /// Truncation length for default-expression and annotation text.
    pub expr_truncate: usize,
    /// Minimum length for a string literal to be recorded as prompt-like.
    pub literal_min_len: usize,
    /// Flow-map rendering settings for hotspot candidates.
    pub logic: LogicMapConfig,
}

impl Default for AstConfig {
    fn default() -> Self {
        Self {
            expr_truncate: 60,
            literal_min_len: 200,
            logic: LogicMapConfig::default(),
        }
    }
}

/// Parse one file and run the single AST traversal over it.
///
/// Unreadable files pass through untouched; parse failures flip the record to
/// `SyntaxError` and yield an empty analysis so downstream consumers see the
/// module but no AST-derived data.
pub fn analyze_file(
    mut record: FileRecord,
    source: Option<&str>,
    config: &AstConfig,
) -> (FileRecord, FileAnalysis) {
    let module = record.module_path.clone();
    let relative = record.relative_path.clone();

    let source = match source {
        Some(s) => s,
        None => {
            record.parse_status = ParseStatus::Unreadable;
            return (record, FileAnalysis::empty(module, relative));
        }
    };

    let parsed = match parse(source, Mode::Module, &record.relative_path) {
        Ok(ast::Mod::Module(m)) => m,
        Ok(_) => {
            record.parse_status = ParseStatus::SyntaxError;
            return (record, FileAnalysis::empty(module, relative));
        }
        Err(e) => {
            debug!("syntax error in {}: {e}", record.relative_path);
            record.parse_status = ParseStatus::SyntaxError;
            return (record, FileAnalysis::empty(module, relative));
        }
    };

    record.parse_status = ParseStatus::Parsed;
    let is_package = record.relative_path.ends_with("__init__.py");
    let visitor = ModuleVisitor::new(source, module.clone(), is_package, config);
    let analysis = visitor.run(&parsed.body, relative);
    (record, analysis)
}

/// Single-pass AST visitor: every AST consumer reads from the traversal state
/// this builds, so each file is parsed exactly once.
struct ModuleVisitor<'a> {
    source: &'a str,
    lines: LinePositions,
    config: &'a AstConfig,
    module: ModulePath,
    is_package: bool,

    docstring: String,
    classes: Vec<ClassRecord>,
    functions: Vec<FunctionRecord>,
    constants: Vec<ConstantRecord>,
    imports: Vec<RawImport>,
    calls: Vec<RawCallSite>,
    annotations: AnnotationTally,
    has_main_guard: bool,
    env_reads: Vec<EnvRead>,
    long_literals: Vec<LongLiteral>,
    validators: Vec<ValidatorRecord>,
    logic_candidates: Vec<LogicMap>,

    /// Name stack for call-site attribution (`Class.method`, nested defs).
    scope: Vec<String>,
    /// Cyclomatic counters; statements add to the innermost function only.
    complexity: Vec<u32>,
}

impl<'a> ModuleVisitor<'a> {
    fn new(source: &'a str, module: ModulePath, is_package: bool, config: &'a AstConfig) -> Self {
        Self {
            source,
            lines: LinePositions::from(source),
            config,
            module,
            is_package,
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
            scope: Vec::new(),
            complexity: Vec::new(),
        }
    }

    fn run(mut self, body: &[ast::Stmt], relative_path: String) -> FileAnalysis {
        self.docstring = docstring_of(body);
        for stmt in body {
            self.visit_module_stmt(stmt);
        }
        FileAnalysis {
            module: self.module,
            relative_path,
            docstring: self.docstring,
            classes: self.classes,
            functions: self.functions,
            constants: self.constants,
            imports: self.imports,
            calls: self.calls,
            annotations: self.annotations,
            has_main_guard: self.has_main_guard,
            env_reads: self.env_reads,
            long_literals: self.long_literals,
            validators: self.validators,
            logic_candidates: self.logic_candidates,
        }
    }

    fn visit_module_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::ClassDef(class) => {
                let record = self.build_class(class);
                self.classes.push(record);
            }
            ast::Stmt::FunctionDef(_) | ast::Stmt::AsyncFunctionDef(_) => {
                // walk_stmt records nested defs too; at module level the
                // record is not nested.
                self.collect_function(stmt, false);
            }
            ast::Stmt::Assign(assign) => {
                self.collect_constant_targets(&assign.targets, assign.range.start().into());
                self.walk_stmt(stmt);
            }
            ast::Stmt::AnnAssign(ann) => {
                self.collect_constant_targets(
                    std::slice::from_ref(&ann.target),
                    ann.range.start().into(),
                );
                self.walk_stmt(stmt);
            }
            ast::Stmt::If(if_stmt) if is_main_guard(&if_stmt.test) => {
                self.has_main_guard = true;
                for inner in &if_stmt.body {
                    self.visit_module_stmt(inner);
                }
                for inner in &if_stmt.orelse {
                    self.visit_module_stmt(inner);
                }
            }
            _ => self.walk_stmt(stmt),
        }
    }

    fn collect_constant_targets(&mut self, targets: &[ast::Expr], offset: usize) {
        for target in targets {
            if let ast::Expr::Name(name) = target {
                let id = name.id.as_str();
                let looks_constant = id.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                    && id
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
                if looks_constant {
                    self.constants.push(ConstantRecord {
                        name: id.to_string(),
                        line: self.line_at(offset),
                    });
                }
            }
        }
    }

    fn collect_function(&mut self, stmt: &ast::Stmt, is_nested: bool) {
        let record = match stmt {
            ast::Stmt::FunctionDef(f) => self.build_function(
                f.name.as_str(),
                &f.args,
                &f.body,
                &f.decorator_list,
                f.returns.as_deref(),
                false,
                f.range.start().into(),
                is_nested,
            ),
            ast::Stmt::AsyncFunctionDef(f) => self.build_function(
                f.name.as_str(),
                &f.args,
                &f.body,
                &f.decorator_list,
                f.returns.as_deref(),
                true,
                f.range.start().into(),
                is_nested,
            ),
            _ => return,
        };
        self.functions.push(record);
    }

    #[allow(clippy::too_many_arguments)]
    fn build_function(
        &mut self,
        name: &str,
        args: &ast::Arguments,
        body: &[ast::Stmt],
        decorator_list: &[ast::Expr],
        returns: Option<&ast::Expr>,
        is_async: bool,
        offset: usize,
        is_nested: bool,
    ) -> FunctionRecord {
        let method = self.build_method(name, args, body, decorator_list, returns, is_async, offset);
        FunctionRecord {
            name: method.name,
            line: method.line,
            params: method.params,
            returns: method.returns,
            is_async: method.is_async,
            decorators: method.decorators,
            docstring: method.docstring,
            complexity: method.complexity,
            is_nested,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_method(
        &mut self,
        name: &str,
        args: &ast::Arguments,
        body: &[ast::Stmt],
        decorator_list: &[ast::Expr],
        returns: Option<&ast::Expr>,
        is_async: bool,
        offset: usize,
    ) -> MethodRecord {
        let params = self.collect_params(args);
        self.tally_annotations(&params, returns.is_some());

        let decorators: Vec<String> = decorator_list
            .iter()
            .map(|d| self.decorator_name(d))
            .collect();

        self.scope.push(name.to_string());
        self.complexity.push(1);
        for stmt in body {
            self.walk_stmt(stmt);
        }
        let complexity = self.complexity.pop().unwrap_or(1);
        self.scope.pop();

        let record = MethodRecord {
            name: name.to_string(),
            line: self.line_at(offset),
            params,
            returns: returns.map(|r| self.expr_text(r)),
            is_async,
            decorators,
            docstring: docstring_of(body),
            complexity,
        };
        if complexity > self.config.logic.min_complexity {
            self.collect_logic_candidate(&record, body);
        }
        record
    }

    fn collect_logic_candidate(&mut self, record: &MethodRecord, body: &[ast::Stmt]) {
        let function = if self.scope.is_empty() {
            record.name.clone()
        } else {
            format!("{}.{}", self.scope.join("."), record.name)
        };
        let flow = logic_map::extract(self.source, body, &self.config.logic);
        let map_bytes = flow.map_bytes();
        self.logic_candidates.push(LogicMap {
            module: self.module.clone(),
            function,
            line: record.line,
            signature: record.signature(),
            docstring: record.docstring.clone(),
            complexity: record.complexity,
            flow: flow.flow,
            side_effects: flow.side_effects,
            state_mutations: flow.state_mutations,
            external_inputs: flow.external_inputs,
            body_bytes: flow.body_bytes,
            map_bytes,
        });
    }

    fn collect_params(&self, args: &ast::Arguments) -> Vec<ParamRecord> {
        let mut params = Vec::new();
        for arg in args.posonlyargs.iter().chain(args.args.iter()) {
            params.push(ParamRecord {
                name: arg.def.arg.to_string(),
                annotation: arg.def.annotation.as_deref().map(|a| self.expr_text(a)),
                default: arg.default.as_deref().map(|d| self.expr_text(d)),
            });
        }
        if let Some(vararg) = &args.vararg {
            params.push(ParamRecord {
                name: format!("*{}", vararg.arg),
                annotation: vararg.annotation.as_deref().map(|a| self.expr_text(a)),
                default: None,
            });
        }
        for arg in &args.kwonlyargs {
            params.push(ParamRecord {
                name: arg.def.arg.to_string(),
                annotation: arg.def.annotation.as_deref().map(|a| self.expr_text(a)),
                default: arg.default.as_deref().map(|d| self.expr_text(d)),
            });
        }
        if let Some(kwarg) = &args.kwarg {
            params.push(ParamRecord {
                name: format!("**{}", kwarg.arg),
                annotation: kwarg.annotation.as_deref().map(|a| self.expr_text(a)),
                default: None,
            });
        }
        params
    }

    fn tally_annotations(&mut self, params: &[ParamRecord], has_return: bool) {
        self.annotations.function_count += 1;
        if has_return {
            self.annotations.annotated_returns += 1;
        }
        for param in params {
            let bare = param.name.trim_start_matches('*');
            if bare == "self" || bare == "cls" {
                continue;
            }
            self.annotations.total_params += 1;
            if param.annotation.is_some() {
                self.annotations.annotated_params += 1;
            }
        }
    }

    fn build_class(&mut self, class: &ast::StmtClassDef) -> ClassRecord {
        let bases: Vec<String> = class.bases.iter().map(|b| self.expr_text(b)).collect();
        let decorators: Vec<String> = class
            .decorator_list
            .iter()
            .map(|d| self.decorator_name(d))
            .collect();
        let model_kind = detect_model_kind(&bases, &decorators);

        let mut fields: Vec<FieldRecord> = Vec::new();
        let mut methods: Vec<MethodRecord> = Vec::new();

        self.scope.push(class.name.to_string());
        for stmt in &class.body {
            match stmt {
                ast::Stmt::AnnAssign(ann) => {
                    if let ast::Expr::Name(name) = ann.target.as_ref() {
                        let constraints = self.field_constraints(
                            ann.value.as_deref(),
                            Some(ann.annotation.as_ref()),
                        );
                        fields.push(FieldRecord {
                            name: name.id.to_string(),
                            annotation: Some(self.expr_text(&ann.annotation)),
                            default: ann.value.as_deref().map(|v| self.expr_text(v)),
                            source: FieldSource::ClassBody,
                            constraints,
                        });
                    }
                    self.walk_stmt(stmt);
                }
                ast::Stmt::FunctionDef(f) => {
                    let method = self.build_method(
                        f.name.as_str(),
                        &f.args,
                        &f.body,
                        &f.decorator_list,
                        f.returns.as_deref(),
                        false,
                        f.range.start().into(),
                    );
                    if f.name.as_str() == "__init__" {
                        self.lift_init_fields(&f.body, &mut fields);
                    }
                    self.collect_validator(class.name.as_str(), &method, model_kind);
                    methods.push(method);
                }
                ast::Stmt::AsyncFunctionDef(f) => {
                    let method = self.build_method(
                        f.name.as_str(),
                        &f.args,
                        &f.body,
                        &f.decorator_list,
                        f.returns.as_deref(),
                        true,
                        f.range.start().into(),
                    );
                    self.collect_validator(class.name.as_str(), &method, model_kind);
                    methods.push(method);
                }
                ast::Stmt::ClassDef(nested) => {
                    let record = self.build_class(nested);
                    self.classes.push(record);
                }
                _ => self.walk_stmt(stmt),
            }
        }
        self.scope.pop();

        ClassRecord {
            name: class.name.to_string(),
            line: self.line_at(class.range.start().into()),
            bases,
            decorators,
            docstring: docstring_of(&class.body),
            methods,
            fields,
            model_kind,
        }
    }

    /// Every `self.<name> = ...` in `__init__`, in first-assignment order.
    fn lift_init_fields(&mut self, body: &[ast::Stmt], fields: &mut Vec<FieldRecord>) {
        let mut seen: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
        self.scan_self_assigns(body, &mut seen, fields);
    }

    fn scan_self_assigns(
        &mut self,
        body: &[ast::Stmt],
        seen: &mut Vec<String>,
        fields: &mut Vec<FieldRecord>,
    ) {
        for stmt in body {
            match stmt {
                ast::Stmt::Assign(assign) => {
                    for target in &assign.targets {
                        if let Some(name) = self_attr_name(target) {
                            if !seen.contains(&name) {
                                seen.push(name.clone());
                                fields.push(FieldRecord {
                                    name,
                                    annotation: None,
                                    default: Some(self.expr_text(&assign.value)),
                                    source: FieldSource::InitAssignment,
                                    constraints: BTreeMap::new(),
                                });
                            }
                        }
                    }
                }
                ast::Stmt::AnnAssign(ann) => {
                    if let Some(name) = self_attr_name(&ann.target) {
                        if !seen.contains(&name) {
                            seen.push(name.clone());
                            fields.push(FieldRecord {
                                name,
                                annotation: Some(self.expr_text(&ann.annotation)),
                                default: ann.value.as_deref().map(|v| self.expr_text(v)),
                                source: FieldSource::InitAssignment,
                                constraints: BTreeMap::new(),
                            });
                        }
                    }
                }
                ast::Stmt::If(s) => {
                    self.scan_self_assigns(&s.body, seen, fields);
                    self.scan_self_assigns(&s.orelse, seen, fields);
                }
                ast::Stmt::For(s) => self.scan_self_assigns(&s.body, seen, fields),
                ast::Stmt::While(s) => self.scan_self_assigns(&s.body, seen, fields),
                ast::Stmt::With(s) => self.scan_self_assigns(&s.body, seen, fields),
                ast::Stmt::Try(s) => {
                    self.scan_self_assigns(&s.body, seen, fields);
                    self.scan_self_assigns(&s.orelse, seen, fields);
                    self.scan_self_assigns(&s.finalbody, seen, fields);
                }
                _ => {}
            }
        }
    }

    fn collect_validator(&mut self, class_name: &str, method: &MethodRecord, kind: ModelKind) {
        if kind != ModelKind::Pydantic {
            return;
        }
        for decorator in &method.decorators {
            let bare = decorator.rsplit('.').next().unwrap_or(decorator);
            if VALIDATOR_DECORATORS.contains(&bare) {
                self.validators.push(ValidatorRecord {
                    class_name: class_name.to_string(),
                    method_name: method.name.clone(),
                    decorator: bare.to_string(),
                    line: method.line,
                });
                break;
            }
        }
    }

    /// Keyword constraints from `Field(...)` in a default or inside
    /// `Annotated[..., Field(...)]`.
    fn field_constraints(
        &self,
        default: Option<&ast::Expr>,
        annotation: Option<&ast::Expr>,
    ) -> BTreeMap<String, String> {
        let mut constraints = BTreeMap::new();
        if let Some(call) = default.and_then(field_call) {
            self.mine_field_call(call, &mut constraints);
        }
        if let Some(ast::Expr::Subscript(sub)) = annotation {
            if dotted(&sub.value).as_deref() == Some("Annotated")
                || dotted(&sub.value).as_deref() == Some("typing.Annotated")
            {
                if let ast::Expr::Tuple(tuple) = sub.slice.as_ref() {
                    for elt in &tuple.elts {
                        if let Some(call) = field_call(elt) {
                            self.mine_field_call(call, &mut constraints);
                        }
                    }
                }
            }
        }
        constraints
    }

    fn mine_field_call(&self, call: &ast::ExprCall, out: &mut BTreeMap<String, String>) {
        if let Some(first) = call.args.first() {
            out.insert("default".to_string(), self.expr_text(first));
        }
        for keyword in &call.keywords {
            if let Some(arg) = &keyword.arg {
                out.insert(arg.to_string(), self.expr_text(&keyword.value));
            }
        }
    }

    // ---- generic statement/expression walk -------------------------------

    fn bump(&mut self, amount: u32) {
        if let Some(top) = self.complexity.last_mut() {
            *top += amount;
        }
    }

    fn walk_stmt(&mut self, stmt: &ast::Stmt) {
        match stmt {
            ast::Stmt::FunctionDef(_) | ast::Stmt::AsyncFunctionDef(_) => {
                self.collect_function(stmt, true);
            }
            ast::Stmt::ClassDef(class) => {
                let record = self.build_class(class);
                self.classes.push(record);
            }
            ast::Stmt::If(s) => {
                self.bump(1);
                self.walk_expr(&s.test);
                self.walk_stmts(&s.body);
                self.walk_stmts(&s.orelse);
            }
            ast::Stmt::While(s) => {
                self.bump(1);
                self.walk_expr(&s.test);
                self.walk_stmts(&s.body);
                self.walk_stmts(&s.orelse);
            }
            ast::Stmt::For(s) => {
                self.bump(1);
                self.walk_expr(&s.iter);
                self.walk_stmts(&s.body);
                self.walk_stmts(&s.orelse);
            }
            ast::Stmt::AsyncFor(s) => {
                self.bump(1);
                self.walk_expr(&s.iter);
                self.walk_stmts(&s.body);
                self.walk_stmts(&s.orelse);
            }
            ast::Stmt::Try(s) => {
                self.walk_stmts(&s.body);
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    self.bump(1);
                    self.walk_stmts(&h.body);
                }
                self.walk_stmts(&s.orelse);
                self.walk_stmts(&s.finalbody);
            }
            ast::Stmt::TryStar(s) => {
                self.walk_stmts(&s.body);
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    self.bump(1);
                    self.walk_stmts(&h.body);
                }
                self.walk_stmts(&s.orelse);
                self.walk_stmts(&s.finalbody);
            }
            ast::Stmt::With(s) => {
                for item in &s.items {
                    self.walk_expr(&item.context_expr);
                }
                self.walk_stmts(&s.body);
            }
            ast::Stmt::AsyncWith(s) => {
                for item in &s.items {
                    self.walk_expr(&item.context_expr);
                }
                self.walk_stmts(&s.body);
            }
            ast::Stmt::Match(s) => {
                self.walk_expr(&s.subject);
                for case in &s.cases {
                    self.bump(1);
                    if let Some(guard) = &case.guard {
                        self.walk_expr(guard);
                    }
                    self.walk_stmts(&case.body);
                }
            }
            ast::Stmt::Return(s) => {
                if let Some(value) = &s.value {
                    self.walk_expr(value);
                }
            }
            ast::Stmt::Assign(s) => {
                self.walk_expr(&s.value);
            }
            ast::Stmt::AugAssign(s) => {
                self.walk_expr(&s.value);
            }
            ast::Stmt::AnnAssign(s) => {
                if let Some(value) = &s.value {
                    self.walk_expr(value);
                }
            }
            ast::Stmt::Expr(s) => self.walk_expr(&s.value),
            ast::Stmt::Assert(s) => {
                self.walk_expr(&s.test);
                if let Some(msg) = &s.msg {
                    self.walk_expr(msg);
                }
            }
            ast::Stmt::Raise(s) => {
                if let Some(exc) = &s.exc {
                    self.walk_expr(exc);
                }
                if let Some(cause) = &s.cause {
                    self.walk_expr(cause);
                }
            }
            ast::Stmt::Import(s) => {
                for alias in &s.names {
                    self.imports.push(RawImport {
                        module: alias.name.to_string(),
                        symbol: None,
                        alias: alias.asname.as_ref().map(|a| a.to_string()),
                        line: self.line_at(s.range.start().into()),
                    });
                }
            }
            ast::Stmt::ImportFrom(s) => {
                let level = s.level.as_ref().map(|l| l.to_u32()).unwrap_or(0);
                let written = s.module.as_ref().map(|m| m.as_str()).unwrap_or("");
                let module = if level > 0 {
                    self.resolve_relative(level, written)
                } else {
                    written.to_string()
                };
                for alias in &s.names {
                    if alias.name.as_str() == "*" {
                        self.imports.push(RawImport {
                            module: module.clone(),
                            symbol: None,
                            alias: None,
                            line: self.line_at(s.range.start().into()),
                        });
                        continue;
                    }
                    self.imports.push(RawImport {
                        module: module.clone(),
                        symbol: Some(alias.name.to_string()),
                        alias: alias.asname.as_ref().map(|a| a.to_string()),
                        line: self.line_at(s.range.start().into()),
                    });
                }
            }
            ast::Stmt::Delete(s) => {
                for target in &s.targets {
                    self.walk_expr(target);
                }
            }
            _ => {}
        }
    }

    fn walk_stmts(&mut self, stmts: &[ast::Stmt]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_expr(&mut self, expr: &ast::Expr) {
        match expr {
            ast::Expr::BoolOp(e) => {
                self.bump(e.values.len().saturating_sub(1) as u32);
                for value in &e.values {
                    self.walk_expr(value);
                }
            }
            ast::Expr::IfExp(e) => {
                self.bump(1);
                self.walk_expr(&e.test);
                self.walk_expr(&e.body);
                self.walk_expr(&e.orelse);
            }
            ast::Expr::Call(e) => {
                self.record_call(e);
                self.walk_expr(&e.func);
                for arg in &e.args {
                    self.walk_expr(arg);
                }
                for keyword in &e.keywords {
                    self.walk_expr(&keyword.value);
                }
            }
            ast::Expr::Subscript(e) => {
                self.record_env_subscript(e);
                self.walk_expr(&e.value);
                self.walk_expr(&e.slice);
            }
            ast::Expr::Attribute(e) => self.walk_expr(&e.value),
            ast::Expr::Constant(e) => {
                if let ast::Constant::Str(s) = &e.value {
                    if s.len() > self.config.literal_min_len {
                        self.long_literals.push(LongLiteral {
                            line: self.line_at(e.range.start().into()),
                            length: s.len(),
                            excerpt: truncate_chars(s.trim(), 160),
                        });
                    }
                }
            }
            ast::Expr::Lambda(e) => self.walk_expr(&e.body),
            ast::Expr::BinOp(e) => {
                self.walk_expr(&e.left);
                self.walk_expr(&e.right);
            }
            ast::Expr::UnaryOp(e) => self.walk_expr(&e.operand),
            ast::Expr::Compare(e) => {
                self.walk_expr(&e.left);
                for comparator in &e.comparators {
                    self.walk_expr(comparator);
                }
            }
            ast::Expr::ListComp(e) => {
                self.walk_comprehensions(&e.generators);
                self.walk_expr(&e.elt);
            }
            ast::Expr::SetComp(e) => {
                self.walk_comprehensions(&e.generators);
                self.walk_expr(&e.elt);
            }
            ast::Expr::GeneratorExp(e) => {
                self.walk_comprehensions(&e.generators);
                self.walk_expr(&e.elt);
            }
            ast::Expr::DictComp(e) => {
                self.walk_comprehensions(&e.generators);
                self.walk_expr(&e.key);
                self.walk_expr(&e.value);
            }
            ast::Expr::Dict(e) => {
                for key in e.keys.iter().flatten() {
                    self.walk_expr(key);
                }
                for value in &e.values {
                    self.walk_expr(value);
                }
            }
            ast::Expr::List(e) => {
                for elt in &e.elts {
                    self.walk_expr(elt);
                }
            }
            ast::Expr::Set(e) => {
                for elt in &e.elts {
                    self.walk_expr(elt);
                }
            }
            ast::Expr::Tuple(e) => {
                for elt in &e.elts {
                    self.walk_expr(elt);
                }
            }
            ast::Expr::Starred(e) => self.walk_expr(&e.value),
            ast::Expr::Await(e) => self.walk_expr(&e.value),
            ast::Expr::Yield(e) => {
                if let Some(value) = &e.value {
                    self.walk_expr(value);
                }
            }
            ast::Expr::YieldFrom(e) => self.walk_expr(&e.value),
            ast::Expr::NamedExpr(e) => {
                self.walk_expr(&e.target);
                self.walk_expr(&e.value);
            }
            ast::Expr::JoinedStr(e) => {
                for value in &e.values {
                    self.walk_expr(value);
                }
            }
            ast::Expr::FormattedValue(e) => self.walk_expr(&e.value),
            ast::Expr::Slice(e) => {
                if let Some(lower) = &e.lower {
                    self.walk_expr(lower);
                }
                if let Some(upper) = &e.upper {
                    self.walk_expr(upper);
                }
                if let Some(step) = &e.step {
                    self.walk_expr(step);
                }
            }
            _ => {}
        }
    }

    fn walk_comprehensions(&mut self, generators: &[ast::Comprehension]) {
        for generator in generators {
            self.bump(generator.ifs.len() as u32);
            self.walk_expr(&generator.iter);
            for if_clause in &generator.ifs {
                self.walk_expr(if_clause);
            }
        }
    }

    fn record_call(&mut self, call: &ast::ExprCall) {
        let kind = match call.func.as_ref() {
            ast::Expr::Name(_) => CallKind::Name,
            ast::Expr::Attribute(_) => CallKind::Attribute,
            ast::Expr::Subscript(_) => CallKind::Subscript,
            _ => return,
        };
        let target = dotted(&call.func)
            .unwrap_or_else(|| {
                let range = call.func.range();
                collapse_ws(self.span_text(range.start().into(), range.end().into()))
            });
        let line = self.line_at(call.range.start().into());
        self.record_env_call(&target, call, line);
        self.calls.push(RawCallSite {
            caller: self.caller(),
            target,
            line,
            kind,
        });
    }

    fn record_env_call(&mut self, target: &str, call: &ast::ExprCall, line: usize) {
        if target != "os.getenv" && target != "os.environ.get" {
            return;
        }
        let Some(ast::Expr::Constant(c)) = call.args.first() else {
            return;
        };
        let ast::Constant::Str(name) = &c.value else {
            return;
        };
        let default = call.args.get(1).map(|d| self.expr_text(d));
        self.env_reads.push(EnvRead {
            name: name.clone(),
            default,
            line,
        });
    }

    fn record_env_subscript(&mut self, sub: &ast::ExprSubscript) {
        if dotted(&sub.value).as_deref() != Some("os.environ") {
            return;
        }
        if let ast::Expr::Constant(c) = sub.slice.as_ref() {
            if let ast::Constant::Str(name) = &c.value {
                self.env_reads.push(EnvRead {
                    name: name.clone(),
                    default: None,
                    line: self.line_at(sub.range.start().into()),
                });
            }
        }
    }

    // ---- helpers ---------------------------------------------------------

    fn caller(&self) -> String {
        if self.scope.is_empty() {
            "<module>".to_string()
        } else {
            self.scope.join(".")
        }
    }

    fn line_at(&self, offset: usize) -> usize {
        self.lines.from_offset(offset).as_usize() + 1
    }

    fn span_text(&self, start: usize, end: usize) -> &str {
        self.source.get(start..end).unwrap_or("")
    }

    fn expr_text(&self, expr: &ast::Expr) -> String {
        let range = expr.range();
        truncate_chars(
            &collapse_ws(self.span_text(range.start().into(), range.end().into())),
            self.config.expr_truncate,
        )
    }

    fn decorator_name(&self, decorator: &ast::Expr) -> String {
        match decorator {
            ast::Expr::Call(call) => self.decorator_name(&call.func),
            _ => dotted(decorator)
                .unwrap_or_else(|| {
                    let range = decorator.range();
                    collapse_ws(self.span_text(range.start().into(), range.end().into()))
                }),
        }
    }

    fn resolve_relative(&self, level: u32, written: &str) -> String {
        let mut segments: Vec<&str> = self
            .module
            .as_str()
            .split('.')
            .filter(|s| !s.is_empty())
            .collect();
        if !self.is_package {
            segments.pop();
        }
        for _ in 1..level {
            segments.pop();
        }
        let base = segments.join(".");
        if base.is_empty() {
            written.to_string()
        } else if written.is_empty() {
            base
        } else {
            format!("{base}.{written}")
        }
    }
}

/// Dotted text of a Name/Attribute chain, or `None` for anything else.
fn dotted(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.to_string()),
        ast::Expr::Attribute(attr) => dotted(&attr.value).map(|base| format!("{base}.{}", attr.attr)),
        _ => None,
    }
}

/// `self.<name>` target, or `None`.
fn self_attr_name(expr: &ast::Expr) -> Option<String> {
    if let ast::Expr::Attribute(attr) = expr {
        if let ast::Expr::Name(name) = attr.value.as_ref() {
            if name.id.as_str() == "self" {
                return Some(attr.attr.to_string());
            }
        }
    }
    None
}

fn field_call(expr: &ast::Expr) -> Option<&ast::ExprCall> {
    if let ast::Expr::Call(call) = expr {
        let name = dotted(&call.func)?;
        let bare = name.rsplit('.').next().unwrap_or(&name);
        if bare == "Field" {
            return Some(call);
        }
    }
    None
}

fn detect_model_kind(bases: &[String], decorators: &[String]) -> ModelKind {
    let base_matches = |needle: &str| {
        bases.iter().any(|b| {
            let bare = b.rsplit('.').next().unwrap_or(b);
            bare == needle
        })
    };
    if base_matches("BaseModel") || base_matches("BaseSettings") {
        ModelKind::Pydantic
    } else if decorators.iter().any(|d| {
        let bare = d.rsplit('.').next().unwrap_or(d);
        bare == "dataclass"
    }) {
        ModelKind::Dataclass
    } else if base_matches("TypedDict") {
        ModelKind::TypedDict
    } else if base_matches("NamedTuple") {
        ModelKind::NamedTuple
    } else {
        ModelKind::Plain
    }
}

fn is_main_guard(test: &ast::Expr) -> bool {
    let ast::Expr::Compare(cmp) = test else {
        return false;
    };
    if cmp.ops.len() != 1 || !matches!(cmp.ops[0], ast::CmpOp::Eq) {
        return false;
    }
    let is_name = |e: &ast::Expr| matches!(e, ast::Expr::Name(n) if n.id.as_str() == "__name__");
    let is_main = |e: &ast::Expr| {
        matches!(e, ast::Expr::Constant(c) if matches!(&c.value, ast::Constant::Str(s) if s == "__main__"))
    };
    (is_name(&cmp.left) && cmp.comparators.first().is_some_and(is_main))
        || (is_main(&cmp.left) && cmp.comparators.first().is_some_and(is_name))
}

fn docstring_of(body: &[ast::Stmt]) -> String {
    if let Some(ast::Stmt::Expr(expr)) = body.first() {
        if let ast::Expr::Constant(c) = expr.value.as_ref() {
            if let ast::Constant::Str(s) = &c.value {
                return s.lines().next().unwrap_or("").trim().to_string();
            }
        }
    }
    String::new()
}
