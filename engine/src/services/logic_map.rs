use crate::models::logic::SideEffectCategory;
use crate::services::side_effects;
use crate::utils::{collapse_ws, truncate_chars};
use rustpython_parser::ast::{self, Ranged};

/// Tunables for flow-step rendering.
#[derive(Debug, Clone)]
pub struct LogicMapConfig {
    /// How many hotspot functions receive a logic map.
    pub top_n: usize,
    /// Per-line truncation.
    pub max_line_len: usize,
    /// Body cap; the tail collapses into `… (N more lines)`.
    pub max_lines: usize,
    /// Functions with complexity above this are hotspot candidates.
    pub min_complexity: u32,
}

impl Default for LogicMapConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            max_line_len: 80,
            max_lines: 30,
            min_complexity: 3,
        }
    }
}

/// Call targets treated as external inputs when they appear in a body.
const INPUT_PATTERNS: &[&str] = &["input", "click.prompt", "sys.stdin.read", "sys.stdin.readline"];

/// Raw flow extraction for one function body.
#[derive(Debug, Clone, Default)]
pub struct FlowExtract {
    pub flow: Vec<String>,
    pub side_effects: Vec<SideEffectCategory>,
    pub state_mutations: Vec<String>,
    pub external_inputs: Vec<String>,
    pub body_bytes: usize,
}

impl FlowExtract {
    pub fn map_bytes(&self) -> usize {
        self.flow.iter().map(|l| l.len() + 1).sum()
    }
}

/// Walk a function body and render its control-flow skeleton in the symbolic
/// grammar: `-> test?`, `* for ...:`, `try:` / `! except T`, `[CAT: callee]`,
/// `{self.x}`, `<input>`, `-> Return(expr)`.
pub fn extract(source: &str, body: &[ast::Stmt], config: &LogicMapConfig) -> FlowExtract {
    let mut walker = FlowWalker {
        source,
        config,
        out: FlowExtract::default(),
    };
    walker.out.body_bytes = body_span(body);
    walker.walk(body, 0);
    walker.finish()
}

fn body_span(body: &[ast::Stmt]) -> usize {
    match (body.first(), body.last()) {
        (Some(first), Some(last)) => {
            let start: usize = first.range().start().into();
            let end: usize = last.range().end().into();
            end.saturating_sub(start)
        }
        _ => 0,
    }
}

struct FlowWalker<'a> {
    source: &'a str,
    config: &'a LogicMapConfig,
    out: FlowExtract,
}

impl<'a> FlowWalker<'a> {
    fn finish(mut self) -> FlowExtract {
        if self.out.flow.len() > self.config.max_lines {
            let extra = self.out.flow.len() - self.config.max_lines;
            self.out.flow.truncate(self.config.max_lines);
            self.out.flow.push(format!("… ({extra} more lines)"));
        }
        self.out.side_effects.sort();
        self.out.side_effects.dedup();
        self.out
    }

    fn push(&mut self, depth: usize, text: String) {
        let line = format!("{}{}", "  ".repeat(depth), text);
        self.out.flow.push(truncate_chars(&line, self.config.max_line_len));
    }

    fn expr_text(&self, expr: &ast::Expr) -> String {
        let range = expr.range();
        let start: usize = range.start().into();
        let end: usize = range.end().into();
        collapse_ws(self.source.get(start..end).unwrap_or(""))
    }

    fn walk(&mut self, stmts: &[ast::Stmt], depth: usize) {
        for stmt in stmts {
            self.walk_stmt(stmt, depth);
        }
    }

    fn walk_stmt(&mut self, stmt: &ast::Stmt, depth: usize) {
        match stmt {
            ast::Stmt::If(s) => {
                self.push(depth, format!("-> {}?", self.expr_text(&s.test)));
                self.walk(&s.body, depth + 1);
                // An elif chain stays at the same depth; a plain else body is
                // indented under the test it belongs to.
                if s.orelse.len() == 1 && matches!(s.orelse[0], ast::Stmt::If(_)) {
                    self.walk(&s.orelse, depth);
                } else {
                    self.walk(&s.orelse, depth + 1);
                }
            }
            ast::Stmt::For(s) => {
                self.push(
                    depth,
                    format!(
                        "* for {} in {}:",
                        self.expr_text(&s.target),
                        self.expr_text(&s.iter)
                    ),
                );
                self.walk(&s.body, depth + 1);
                self.walk(&s.orelse, depth + 1);
            }
            ast::Stmt::AsyncFor(s) => {
                self.push(
                    depth,
                    format!(
                        "* for {} in {}:",
                        self.expr_text(&s.target),
                        self.expr_text(&s.iter)
                    ),
                );
                self.walk(&s.body, depth + 1);
                self.walk(&s.orelse, depth + 1);
            }
            ast::Stmt::While(s) => {
                self.push(depth, format!("* while {}:", self.expr_text(&s.test)));
                self.walk(&s.body, depth + 1);
                self.walk(&s.orelse, depth + 1);
            }
            ast::Stmt::Try(s) => {
                self.push(depth, "try:".to_string());
                self.walk(&s.body, depth + 1);
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    let kind = h
                        .type_
                        .as_deref()
                        .map(|t| self.expr_text(t))
                        .unwrap_or_default();
                    let label = if kind.is_empty() {
                        "! except".to_string()
                    } else {
                        format!("! except {kind}")
                    };
                    self.push(depth, label);
                    self.walk(&h.body, depth + 1);
                }
                self.walk(&s.orelse, depth + 1);
                self.walk(&s.finalbody, depth + 1);
            }
            ast::Stmt::TryStar(s) => {
                self.push(depth, "try:".to_string());
                self.walk(&s.body, depth + 1);
                for handler in &s.handlers {
                    let ast::ExceptHandler::ExceptHandler(h) = handler;
                    let kind = h
                        .type_
                        .as_deref()
                        .map(|t| self.expr_text(t))
                        .unwrap_or_default();
                    let label = if kind.is_empty() {
                        "! except".to_string()
                    } else {
                        format!("! except {kind}")
                    };
                    self.push(depth, label);
                    self.walk(&h.body, depth + 1);
                }
                self.walk(&s.orelse, depth + 1);
                self.walk(&s.finalbody, depth + 1);
            }
            ast::Stmt::Match(s) => {
                for case in &s.cases {
                    let pattern_range = case.pattern.range();
                    let start: usize = pattern_range.start().into();
                    let end: usize = pattern_range.end().into();
                    let pattern = collapse_ws(self.source.get(start..end).unwrap_or("_"));
                    self.push(depth, format!("-> case {pattern}?"));
                    self.walk(&case.body, depth + 1);
                }
            }
            ast::Stmt::With(s) => {
                for item in &s.items {
                    self.emit_expr_events(&item.context_expr, depth);
                }
                self.walk(&s.body, depth);
            }
            ast::Stmt::AsyncWith(s) => {
                for item in &s.items {
                    self.emit_expr_events(&item.context_expr, depth);
                }
                self.walk(&s.body, depth);
            }
            ast::Stmt::Return(s) => {
                match &s.value {
                    Some(value) => {
                        self.emit_expr_events(value, depth);
                        let text = self.expr_text(value);
                        self.push(depth, format!("-> Return({text})"));
                    }
                    None => self.push(depth, "-> Return()".to_string()),
                }
            }
            ast::Stmt::Assign(s) => {
                self.emit_expr_events(&s.value, depth);
                for target in &s.targets {
                    if let Some(name) = self_attr(target) {
                        self.push(depth, format!("{{self.{name}}}"));
                        if !self.out.state_mutations.contains(&name) {
                            self.out.state_mutations.push(name);
                        }
                    }
                }
            }
            ast::Stmt::AugAssign(s) => {
                self.emit_expr_events(&s.value, depth);
                if let Some(name) = self_attr(&s.target) {
                    self.push(depth, format!("{{self.{name}}}"));
                    if !self.out.state_mutations.contains(&name) {
                        self.out.state_mutations.push(name);
                    }
                }
            }
            ast::Stmt::AnnAssign(s) => {
                if let Some(value) = &s.value {
                    self.emit_expr_events(value, depth);
                }
                if let Some(name) = self_attr(&s.target) {
                    self.push(depth, format!("{{self.{name}}}"));
                    if !self.out.state_mutations.contains(&name) {
                        self.out.state_mutations.push(name);
                    }
                }
            }
            ast::Stmt::Expr(s) => self.emit_expr_events(&s.value, depth),
            ast::Stmt::Assert(s) => self.emit_expr_events(&s.test, depth),
            _ => {}
        }
    }

    /// Side-effect and external-input events from every call under `expr`.
    fn emit_expr_events(&mut self, expr: &ast::Expr, depth: usize) {
        let mut callees = Vec::new();
        collect_callees(expr, &mut callees);
        for callee in callees {
            if let Some(category) = side_effects::classify(&callee) {
                self.push(depth, format!("[{}: {}]", category.as_str(), callee));
                self.out.side_effects.push(category);
            } else if is_external_input(&callee) {
                self.push(depth, format!("<{callee}>"));
                if !self.out.external_inputs.contains(&callee) {
                    self.out.external_inputs.push(callee);
                }
            }
        }
    }
}

fn is_external_input(callee: &str) -> bool {
    INPUT_PATTERNS.contains(&callee) || callee.starts_with("request.") || callee.starts_with("self.request.")
}

fn self_attr(expr: &ast::Expr) -> Option<String> {
    if let ast::Expr::Attribute(attr) = expr {
        if let ast::Expr::Name(name) = attr.value.as_ref() {
            if name.id.as_str() == "self" {
                return Some(attr.attr.to_string());
            }
        }
    }
    None
}

/// Dotted callee text for every call expression, in source order.
fn collect_callees(expr: &ast::Expr, out: &mut Vec<String>) {
    if let ast::Expr::Call(call) = expr {
        if let Some(name) = dotted(&call.func) {
            out.push(name);
        }
        for arg in &call.args {
            collect_callees(arg, out);
        }
        for keyword in &call.keywords {
            collect_callees(&keyword.value, out);
        }
        return;
    }
    match expr {
        ast::Expr::BinOp(e) => {
            collect_callees(&e.left, out);
            collect_callees(&e.right, out);
        }
        ast::Expr::BoolOp(e) => {
            for value in &e.values {
                collect_callees(value, out);
            }
        }
        ast::Expr::UnaryOp(e) => collect_callees(&e.operand, out),
        ast::Expr::Compare(e) => {
            collect_callees(&e.left, out);
            for comparator in &e.comparators {
                collect_callees(comparator, out);
            }
        }
        ast::Expr::IfExp(e) => {
            collect_callees(&e.test, out);
            collect_callees(&e.body, out);
            collect_callees(&e.orelse, out);
        }
        ast::Expr::Attribute(e) => collect_callees(&e.value, out),
        ast::Expr::Subscript(e) => {
            collect_callees(&e.value, out);
            collect_callees(&e.slice, out);
        }
        ast::Expr::Await(e) => collect_callees(&e.value, out),
        ast::Expr::Tuple(e) => {
            for elt in &e.elts {
                collect_callees(elt, out);
            }
        }
        ast::Expr::List(e) => {
            for elt in &e.elts {
                collect_callees(elt, out);
            }
        }
        ast::Expr::Dict(e) => {
            for key in e.keys.iter().flatten() {
                collect_callees(key, out);
            }
            for value in &e.values {
                collect_callees(value, out);
            }
        }
        ast::Expr::JoinedStr(e) => {
            for value in &e.values {
                collect_callees(value, out);
            }
        }
        ast::Expr::FormattedValue(e) => collect_callees(&e.value, out),
        ast::Expr::Starred(e) => collect_callees(&e.value, out),
        _ => {}
    }
}

fn dotted(expr: &ast::Expr) -> Option<String> {
    match expr {
        ast::Expr::Name(name) => Some(name.id.to_string()),
        ast::Expr::Attribute(attr) => dotted(&attr.value).map(|base| format!("{base}.{}", attr.attr)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn body_of(source: &str) -> Vec<ast::Stmt> {
        let ast::Mod::Module(module) = parse(source, Mode::Module, "<test>").unwrap() else {
            panic!("expected module");
        };
        let ast::Stmt::FunctionDef(func) = module.body.into_iter().next().unwrap() else {
            panic!("expected function");
        };
        func.body
    }

    fn flow_of(source: &str) -> FlowExtract {
        let body = body_of(source);
        extract(source, &body, &LogicMapConfig::default())
    }

    #[test]
    fn conditional_chain_renders_tests_in_order() {
        let out = flow_of(
            "def f(x):\n    if x:\n        pass\n    elif x > 1:\n        pass\n    else:\n        pass\n",
        );
        assert_eq!(out.flow[0], "-> x?");
        assert_eq!(out.flow[1], "-> x > 1?");
    }

    #[test]
    fn loops_and_returns_use_the_grammar() {
        let out = flow_of(
            "def f(xs):\n    for x in xs:\n        if x:\n            return x\n    return None\n",
        );
        assert_eq!(out.flow[0], "* for x in xs:");
        assert_eq!(out.flow[1], "  -> x?");
        assert_eq!(out.flow[2], "    -> Return(x)");
        assert_eq!(out.flow[3], "-> Return(None)");
    }

    #[test]
    fn try_except_renders_handler_types() {
        let out = flow_of(
            "def f():\n    try:\n        g()\n    except ValueError:\n        pass\n",
        );
        assert_eq!(out.flow[0], "try:");
        assert!(out.flow.contains(&"! except ValueError".to_string()));
    }

    #[test]
    fn side_effects_and_mutations_are_events() {
        let out = flow_of(
            "def f(self, db):\n    db.session.commit()\n    self.count = 1\n",
        );
        assert!(out.flow.iter().any(|l| l.contains("[DB: db.session.commit]")));
        assert!(out.flow.contains(&"{self.count}".to_string()));
        assert_eq!(out.state_mutations, vec!["count"]);
        assert_eq!(out.side_effects, vec![SideEffectCategory::Db]);
    }

    #[test]
    fn external_input_is_marked() {
        let out = flow_of("def f():\n    name = input()\n    return name\n");
        assert!(out.flow.contains(&"<input>".to_string()));
        assert_eq!(out.external_inputs, vec!["input"]);
    }

    #[test]
    fn long_bodies_collapse_into_a_tail() {
        let mut source = String::from("def f(x):\n");
        for i in 0..40 {
            source.push_str(&format!("    if x > {i}:\n        pass\n"));
        }
        let out = extract(&source, &body_of(&source), &LogicMapConfig::default());
        assert_eq!(out.flow.len(), 31);
        assert!(out.flow.last().unwrap().starts_with("… ("));
    }

    #[test]
    fn lines_truncate_at_the_cap() {
        let cond = "x".repeat(200);
        let source = format!("def f({cond}):\n    if {cond}:\n        pass\n");
        let out = extract(&source, &body_of(&source), &LogicMapConfig::default());
        assert!(out.flow[0].len() <= 80 + 3);
    }
}
