use crate::models::analysis::FileAnalysis;
use crate::models::callgraph::{CallGraphReport, CallSite, ImpactLevel, SymbolUsage};
use crate::models::graph::ImportGraphReport;
use rustc_hash::{FxHashMap, FxHashSet};

/// Aggregate per-file call sites into the tree-wide call graph.
///
/// Cross-module classification is best-effort: when the leading identifier of
/// a target matches an import alias of the calling module, the alias is
/// substituted and the result resolved against known modules; anything else is
/// treated as same-module.
pub fn build(analyses: &[FileAnalysis], graph: &ImportGraphReport) -> CallGraphReport {
    let modules: FxHashSet<&str> = graph.nodes.iter().map(|m| m.as_str()).collect();

    let mut sites: Vec<CallSite> = Vec::new();
    for analysis in analyses {
        let aliases = graph.aliases.get(analysis.module.as_str());
        for call in &analysis.calls {
            let cross_module = aliases
                .and_then(|table| resolve_owner(&call.target, table, &modules))
                .map(|owner| owner != analysis.module.as_str())
                .unwrap_or(false);
            sites.push(CallSite {
                module: analysis.module.clone(),
                caller: call.caller.clone(),
                target: call.target.clone(),
                line: call.line,
                kind: call.kind,
                cross_module,
            });
        }
    }
    sites.sort_by(|a, b| {
        (a.module.as_str(), a.line, &a.target).cmp(&(b.module.as_str(), b.line, &b.target))
    });

    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for site in &sites {
        *counts.entry(site.target.as_str()).or_insert(0) += 1;
    }
    let mut most_called: Vec<SymbolUsage> = counts
        .into_iter()
        .map(|(symbol, count)| SymbolUsage {
            symbol: symbol.to_string(),
            count,
            impact: ImpactLevel::from_count(count),
        })
        .collect();
    most_called.sort_by(|a, b| (b.count, &a.symbol).cmp(&(a.count, &b.symbol)));

    CallGraphReport { sites, most_called }
}

/// Owning module of a call target, through the alias table.
fn resolve_owner<'a>(
    target: &str,
    aliases: &'a std::collections::BTreeMap<String, String>,
    modules: &FxHashSet<&str>,
) -> Option<String> {
    let (head, rest) = match target.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (target, None),
    };
    let bound = aliases.get(head)?;
    let substituted = match rest {
        Some(rest) => format!("{bound}.{rest}"),
        None => bound.clone(),
    };
    // Exact module, then longest module prefix.
    if modules.contains(substituted.as_str()) {
        return Some(substituted);
    }
    let mut prefix: &str = &substituted;
    while let Some(pos) = prefix.rfind('.') {
        prefix = &prefix[..pos];
        if modules.contains(prefix) {
            return Some(prefix.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{RawCallSite, RawImport};
    use crate::models::callgraph::CallKind;
    use crate::models::file::{FileRecord, ModulePath, ParseStatus};
    use crate::services::import_graph::{self, GraphConfig};
    use std::path::PathBuf;

    fn file(relative: &str) -> FileRecord {
        FileRecord {
            path: PathBuf::from(format!("/t/{relative}")),
            relative_path: relative.to_string(),
            bytes: 10,
            lines: 1,
            token_estimate: 2,
            module_path: ModulePath::from_relative(std::path::Path::new(relative)).unwrap(),
            parse_status: ParseStatus::Parsed,
        }
    }

    fn call(caller: &str, target: &str, line: usize) -> RawCallSite {
        RawCallSite {
            caller: caller.to_string(),
            target: target.to_string(),
            line,
            kind: CallKind::Attribute,
        }
    }

    #[test]
    fn aliased_cross_module_call_is_flagged() {
        let files = vec![file("a.py"), file("b.py")];
        let mut a = FileAnalysis::empty(ModulePath::new("a"), "a.py".into());
        a.imports = vec![RawImport {
            module: "b".into(),
            symbol: None,
            alias: None,
            line: 1,
        }];
        a.calls = vec![call("main", "b.run", 3), call("main", "local_helper", 4)];
        let b = FileAnalysis::empty(ModulePath::new("b"), "b.py".into());

        let graph = import_graph::build(&files, &[a.clone(), b.clone()], &GraphConfig::default());
        let report = build(&[a, b], &graph);

        let cross = report.sites.iter().find(|s| s.target == "b.run").unwrap();
        assert!(cross.cross_module);
        let local = report
            .sites
            .iter()
            .find(|s| s.target == "local_helper")
            .unwrap();
        assert!(!local.cross_module);
    }

    #[test]
    fn most_called_sorts_by_count_then_symbol() {
        let mut a = FileAnalysis::empty(ModulePath::new("a"), "a.py".into());
        a.calls = vec![
            call("f", "zeta", 1),
            call("f", "alpha", 2),
            call("g", "alpha", 3),
            call("g", "beta", 4),
            call("g", "beta", 5),
        ];
        let files = vec![file("a.py")];
        let graph = import_graph::build(&files, std::slice::from_ref(&a), &GraphConfig::default());
        let report = build(&[a], &graph);

        let order: Vec<(&str, usize)> = report
            .most_called
            .iter()
            .map(|u| (u.symbol.as_str(), u.count))
            .collect();
        assert_eq!(order, vec![("alpha", 2), ("beta", 2), ("zeta", 1)]);
    }

    #[test]
    fn reverse_lookup_matches_exact_target() {
        let mut a = FileAnalysis::empty(ModulePath::new("a"), "a.py".into());
        a.calls = vec![call("f", "db.commit", 1), call("g", "db.commit", 9)];
        let files = vec![file("a.py")];
        let graph = import_graph::build(&files, std::slice::from_ref(&a), &GraphConfig::default());
        let report = build(&[a], &graph);

        let callers = report.callers_of("db.commit");
        assert_eq!(callers.len(), 2);
        assert!(report.callers_of("db.rollback").is_empty());
    }

    #[test]
    fn self_calls_stay_same_module() {
        let mut a = FileAnalysis::empty(ModulePath::new("pkg.mod"), "pkg/mod.py".into());
        a.calls = vec![call("C.run", "self.helper", 7)];
        let files = vec![file("pkg/mod.py"), file("pkg/__init__.py")];
        let graph = import_graph::build(&files, std::slice::from_ref(&a), &GraphConfig::default());
        let report = build(&[a], &graph);
        assert!(!report.sites[0].cross_module);
    }
}
