use crate::models::analysis::FileAnalysis;
use crate::models::file::{FileRecord, ModulePath, ParseStatus};
use crate::models::graph::{HubModule, ImportEdge, ImportGraphReport, ImportKind, Layer};
use petgraph::algo::{dijkstra, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A reasonable top-level standard-library name table for Python 3. The split
/// is configurable; nothing inspects a running interpreter.
pub const DEFAULT_STDLIB_NAMES: &[&str] = &[
    "abc", "argparse", "array", "ast", "asyncio", "base64", "bisect", "builtins", "calendar",
    "collections", "concurrent", "configparser", "contextlib", "copy", "csv", "ctypes",
    "dataclasses", "datetime", "decimal", "difflib", "dis", "email", "enum", "errno", "faulthandler",
    "fcntl", "fileinput", "fnmatch", "fractions", "functools", "gc", "getpass", "gettext", "glob",
    "gzip", "hashlib", "heapq", "hmac", "html", "http", "importlib", "inspect", "io", "ipaddress",
    "itertools", "json", "keyword", "linecache", "locale", "logging", "lzma", "marshal", "math",
    "mimetypes", "multiprocessing", "numbers", "operator", "os", "pathlib", "pickle", "pkgutil",
    "platform", "plistlib", "pprint", "pstats", "pty", "queue", "random", "re", "readline",
    "reprlib", "resource", "sched", "secrets", "select", "selectors", "shelve", "shlex", "shutil",
    "signal", "site", "socket", "socketserver", "sqlite3", "ssl", "stat", "statistics", "string",
    "struct", "subprocess", "sys", "sysconfig", "tarfile", "tempfile", "termios", "textwrap",
    "threading", "time", "timeit", "tkinter", "token", "tokenize", "traceback", "types", "typing",
    "unicodedata", "unittest", "urllib", "uuid", "venv", "warnings", "weakref", "xml", "zipfile",
    "zlib", "zoneinfo",
];

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub foundation_min_in: usize,
    pub foundation_max_out: usize,
    pub orchestration_min_out: usize,
    pub orchestration_max_in: usize,
    pub hub_count: usize,
    pub stdlib_names: Vec<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            foundation_min_in: 5,
            foundation_max_out: 3,
            orchestration_min_out: 5,
            orchestration_max_in: 1,
            hub_count: 10,
            stdlib_names: DEFAULT_STDLIB_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Build the module import graph and everything derived from it.
pub fn build(
    files: &[FileRecord],
    analyses: &[FileAnalysis],
    config: &GraphConfig,
) -> ImportGraphReport {
    let mut nodes: Vec<ModulePath> = files
        .iter()
        .filter(|f| f.parse_status == ParseStatus::Parsed)
        .map(|f| f.module_path.clone())
        .collect();
    nodes.sort();
    nodes.dedup();

    let node_set: FxHashSet<&str> = nodes.iter().map(|m| m.as_str()).collect();
    let stdlib: FxHashSet<&str> = config.stdlib_names.iter().map(String::as_str).collect();
    let top_dirs = top_level_dirs(files);

    let mut edges: Vec<ImportEdge> = Vec::new();
    let mut aliases: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    let mut external_packages: BTreeMap<String, usize> = BTreeMap::new();

    for analysis in analyses {
        let module_aliases = aliases.entry(analysis.module.to_string()).or_default();
        for import in &analysis.imports {
            let dotted = import.dotted_target();
            if dotted.is_empty() {
                continue;
            }
            let (kind, target, resolved) =
                resolve_target(&dotted, &node_set, &top_dirs, &stdlib);

            if kind == ImportKind::External {
                let top = dotted.split('.').next().unwrap_or(&dotted);
                *external_packages.entry(top.to_string()).or_insert(0) += 1;
            }

            record_alias(module_aliases, import, &dotted);

            // Self-loops carry no structure.
            if kind == ImportKind::Internal && target == analysis.module.as_str() {
                continue;
            }
            edges.push(ImportEdge {
                source: analysis.module.clone(),
                target,
                kind,
                alias: import.alias.clone(),
                resolved,
            });
        }
    }

    edges.sort_by(|a, b| {
        (a.source.as_str(), a.target.as_str(), a.kind as u8)
            .cmp(&(b.source.as_str(), b.target.as_str(), b.kind as u8))
    });
    edges.dedup();

    // Resolved internal adjacency, deduplicated, drives every graph metric.
    let index: FxHashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, m)| (m.as_str(), i))
        .collect();
    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
    for edge in &edges {
        if edge.kind != ImportKind::Internal || !edge.resolved {
            continue;
        }
        if let (Some(&from), Some(&to)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            if from != to {
                adjacency[from].insert(to);
            }
        }
    }

    let mut in_degree = vec![0usize; nodes.len()];
    let mut out_degree = vec![0usize; nodes.len()];
    for (from, targets) in adjacency.iter().enumerate() {
        out_degree[from] = targets.len();
        for &to in targets {
            in_degree[to] += 1;
        }
    }

    let layers = classify_layers(&nodes, &in_degree, &out_degree, config);
    let hubs = rank_hubs(&nodes, &in_degree, &out_degree, config.hub_count);

    // petgraph mirrors the adjacency for SCC and distance queries.
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let petgraph_nodes: Vec<NodeIndex> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();
    for (from, targets) in adjacency.iter().enumerate() {
        for &to in targets {
            graph.add_edge(petgraph_nodes[from], petgraph_nodes[to], ());
        }
    }

    let (circular_groups, circular_pairs) = find_circulars(&graph, &nodes);
    let distances = all_distances(&graph, &nodes, &petgraph_nodes);

    let has_guard: FxHashMap<&str, bool> = analyses
        .iter()
        .map(|a| (a.module.as_str(), a.has_main_guard))
        .collect();
    let file_names: FxHashMap<&str, &str> = files
        .iter()
        .map(|f| (f.module_path.as_str(), f.relative_path.as_str()))
        .collect();
    let orphans = find_orphans(&nodes, &in_degree, &has_guard, &file_names);

    debug!(
        "import graph: {} nodes, {} edges, {} circular groups",
        nodes.len(),
        edges.len(),
        circular_groups.len()
    );

    ImportGraphReport {
        nodes,
        edges,
        layers,
        hubs,
        circular_pairs,
        circular_groups,
        orphans,
        distances,
        aliases,
        external_packages,
    }
}

/// Entry-point file-name patterns. Shared with orphan exclusion.
pub fn is_entry_file_name(relative_path: &str) -> bool {
    let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    matches!(
        file_name,
        "main.py"
            | "__main__.py"
            | "cli.py"
            | "app.py"
            | "wsgi.py"
            | "asgi.py"
            | "setup.py"
            | "manage.py"
            | "conftest.py"
    ) || file_name.starts_with("test_")
        || file_name.ends_with("_test.py")
}

/// Resolution precedence: exact module, longest module prefix, top-level
/// directory (internal but unresolved), stdlib name, external.
fn resolve_target(
    dotted: &str,
    node_set: &FxHashSet<&str>,
    top_dirs: &BTreeSet<String>,
    stdlib: &FxHashSet<&str>,
) -> (ImportKind, String, bool) {
    if node_set.contains(dotted) {
        return (ImportKind::Internal, dotted.to_string(), true);
    }
    let mut prefix = dotted;
    while let Some(pos) = prefix.rfind('.') {
        prefix = &prefix[..pos];
        if node_set.contains(prefix) {
            return (ImportKind::Internal, prefix.to_string(), true);
        }
    }
    let top = dotted.split('.').next().unwrap_or(dotted);
    if top_dirs.contains(top) {
        return (ImportKind::Internal, dotted.to_string(), false);
    }
    if stdlib.contains(top) {
        return (ImportKind::Stdlib, dotted.to_string(), true);
    }
    (ImportKind::External, dotted.to_string(), true)
}

fn record_alias(
    aliases: &mut BTreeMap<String, String>,
    import: &crate::models::analysis::RawImport,
    dotted: &str,
) {
    match (&import.symbol, &import.alias) {
        (Some(_), Some(alias)) => {
            aliases.insert(alias.clone(), dotted.to_string());
        }
        (Some(symbol), None) => {
            aliases.insert(symbol.clone(), dotted.to_string());
        }
        (None, Some(alias)) => {
            aliases.insert(alias.clone(), import.module.clone());
        }
        (None, None) => {
            let top = import.module.split('.').next().unwrap_or(&import.module);
            aliases.insert(top.to_string(), top.to_string());
        }
    }
}

fn top_level_dirs(files: &[FileRecord]) -> BTreeSet<String> {
    files
        .iter()
        .filter_map(|f| {
            let mut parts = f.relative_path.split('/');
            let first = parts.next()?;
            parts.next().map(|_| first.to_string())
        })
        .collect()
}

fn classify_layers(
    nodes: &[ModulePath],
    in_degree: &[usize],
    out_degree: &[usize],
    config: &GraphConfig,
) -> BTreeMap<String, Layer> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, module)| {
            let (fan_in, fan_out) = (in_degree[i], out_degree[i]);
            // Leaf means nothing imports the module; it may still import
            // others without becoming core.
            let layer = if fan_in >= config.foundation_min_in && fan_out <= config.foundation_max_out
            {
                Layer::Foundation
            } else if fan_out >= config.orchestration_min_out
                && fan_in <= config.orchestration_max_in
            {
                Layer::Orchestration
            } else if fan_in == 0 {
                Layer::Leaf
            } else {
                Layer::Core
            };
            (module.to_string(), layer)
        })
        .collect()
}

fn rank_hubs(
    nodes: &[ModulePath],
    in_degree: &[usize],
    out_degree: &[usize],
    count: usize,
) -> Vec<HubModule> {
    let mut hubs: Vec<HubModule> = nodes
        .iter()
        .enumerate()
        .map(|(i, module)| HubModule {
            module: module.clone(),
            fan_in: in_degree[i],
            fan_out: out_degree[i],
        })
        .filter(|h| h.fan_in + h.fan_out > 0)
        .collect();
    hubs.sort_by(|a, b| {
        (b.fan_in + b.fan_out, a.module.as_str()).cmp(&(a.fan_in + a.fan_out, b.module.as_str()))
    });
    hubs.truncate(count);
    hubs
}

fn find_circulars(
    graph: &DiGraph<usize, ()>,
    nodes: &[ModulePath],
) -> (Vec<Vec<String>>, Vec<(String, String)>) {
    let mut groups: Vec<Vec<String>> = Vec::new();
    let mut pairs: BTreeSet<(String, String)> = BTreeSet::new();

    for component in tarjan_scc(graph) {
        if component.len() < 2 {
            continue;
        }
        let mut names: Vec<String> = component
            .iter()
            .map(|&idx| nodes[graph[idx]].to_string())
            .collect();
        names.sort();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                pairs.insert((names[i].clone(), names[j].clone()));
            }
        }
        groups.push(names);
    }
    groups.sort();
    (groups, pairs.into_iter().collect())
}

fn all_distances(
    graph: &DiGraph<usize, ()>,
    nodes: &[ModulePath],
    petgraph_nodes: &[NodeIndex],
) -> BTreeMap<String, BTreeMap<String, u32>> {
    let mut distances = BTreeMap::new();
    for (i, module) in nodes.iter().enumerate() {
        let reachable = dijkstra(graph, petgraph_nodes[i], None, |_| 1u32);
        let mut row = BTreeMap::new();
        for (target_idx, distance) in reachable {
            if distance == 0 {
                continue;
            }
            row.insert(nodes[graph[target_idx]].to_string(), distance);
        }
        if !row.is_empty() {
            distances.insert(module.to_string(), row);
        }
    }
    distances
}

fn find_orphans(
    nodes: &[ModulePath],
    in_degree: &[usize],
    has_guard: &FxHashMap<&str, bool>,
    file_names: &FxHashMap<&str, &str>,
) -> Vec<ModulePath> {
    nodes
        .iter()
        .enumerate()
        .filter(|(i, module)| {
            if in_degree[*i] > 0 {
                return false;
            }
            if has_guard.get(module.as_str()).copied().unwrap_or(false) {
                return false;
            }
            let relative = file_names.get(module.as_str()).copied().unwrap_or("");
            !is_entry_file_name(relative)
        })
        .map(|(_, module)| module.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::RawImport;
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

    fn analysis(relative: &str, imports: Vec<RawImport>) -> FileAnalysis {
        let module = ModulePath::from_relative(std::path::Path::new(relative)).unwrap();
        let mut analysis = FileAnalysis::empty(module, relative.to_string());
        analysis.imports = imports;
        analysis
    }

    fn plain_import(module: &str) -> RawImport {
        RawImport {
            module: module.to_string(),
            symbol: None,
            alias: None,
            line: 1,
        }
    }

    #[test]
    fn two_file_tree_layers_match_reference_scenario() {
        let files = vec![file("a.py"), file("b.py")];
        let analyses = vec![
            analysis("a.py", vec![plain_import("b")]),
            analysis("b.py", vec![]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());

        assert_eq!(report.nodes.len(), 2);
        let internal: Vec<_> = report
            .edges
            .iter()
            .filter(|e| e.kind == ImportKind::Internal)
            .collect();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].source.as_str(), "a");
        assert_eq!(internal[0].target, "b");
        assert_eq!(report.imported_by("b").len(), 1);

        // b: in=1 out=0 fails foundation's in >= 5, so core; a: in=0 out=1.
        assert_eq!(report.layers["b"], Layer::Core);
        assert_eq!(report.layers["a"], Layer::Leaf);
    }

    #[test]
    fn circular_pair_is_canonical_and_terminates() {
        let files = vec![file("a.py"), file("b.py")];
        let analyses = vec![
            analysis("a.py", vec![plain_import("b")]),
            analysis("b.py", vec![plain_import("a")]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());
        assert_eq!(report.circular_pairs, vec![("a".to_string(), "b".to_string())]);
        assert_eq!(report.circular_groups, vec![vec!["a".to_string(), "b".to_string()]]);
        assert_eq!(report.distance("a", "b"), Some(1));
        assert_eq!(report.distance("b", "a"), Some(1));
    }

    #[test]
    fn no_self_loops() {
        let files = vec![file("a.py")];
        let analyses = vec![analysis("a.py", vec![plain_import("a")])];
        let report = build(&files, &analyses, &GraphConfig::default());
        assert!(report
            .edges
            .iter()
            .all(|e| !(e.kind == ImportKind::Internal && e.source.as_str() == e.target)));
        assert!(report.circular_pairs.is_empty());
    }

    #[test]
    fn from_import_resolves_to_longest_prefix() {
        let files = vec![file("pkg/__init__.py"), file("pkg/util.py"), file("top.py")];
        let analyses = vec![
            analysis(
                "top.py",
                vec![RawImport {
                    module: "pkg.util".to_string(),
                    symbol: Some("helper".to_string()),
                    alias: None,
                    line: 1,
                }],
            ),
            analysis("pkg/__init__.py", vec![]),
            analysis("pkg/util.py", vec![]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());
        let edge = report
            .edges
            .iter()
            .find(|e| e.source.as_str() == "top")
            .unwrap();
        assert_eq!(edge.kind, ImportKind::Internal);
        assert_eq!(edge.target, "pkg.util");
        assert!(edge.resolved);
    }

    #[test]
    fn stdlib_and_external_split() {
        let files = vec![file("a.py")];
        let analyses = vec![analysis(
            "a.py",
            vec![plain_import("os"), plain_import("numpy")],
        )];
        let report = build(&files, &analyses, &GraphConfig::default());
        let kinds: Vec<ImportKind> = report.edges.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ImportKind::Stdlib));
        assert!(kinds.contains(&ImportKind::External));
        assert_eq!(report.external_packages.get("numpy"), Some(&1));
    }

    #[test]
    fn entry_point_files_are_never_orphans() {
        let files = vec![file("cli.py"), file("lonely.py")];
        let analyses = vec![analysis("cli.py", vec![]), analysis("lonely.py", vec![])];
        let report = build(&files, &analyses, &GraphConfig::default());
        let orphan_names: Vec<&str> = report.orphans.iter().map(|m| m.as_str()).collect();
        assert!(!orphan_names.contains(&"cli"));
        assert!(orphan_names.contains(&"lonely"));
    }

    #[test]
    fn main_guard_excludes_from_orphans() {
        let files = vec![file("runner.py")];
        let mut with_guard = analysis("runner.py", vec![]);
        with_guard.has_main_guard = true;
        let report = build(&files, &[with_guard], &GraphConfig::default());
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn unresolved_top_dir_edges_skip_cycle_detection() {
        let files = vec![file("pkg/a.py"), file("other.py")];
        let analyses = vec![
            analysis("pkg/a.py", vec![]),
            analysis("other.py", vec![plain_import("pkg.missing")]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());
        let edge = report
            .edges
            .iter()
            .find(|e| e.source.as_str() == "other")
            .unwrap();
        assert_eq!(edge.kind, ImportKind::Internal);
        assert!(!edge.resolved);
        assert!(report.circular_groups.is_empty());
    }

    #[test]
    fn every_node_has_exactly_one_layer() {
        let files = vec![file("a.py"), file("b.py"), file("c.py")];
        let analyses = vec![
            analysis("a.py", vec![plain_import("b"), plain_import("c")]),
            analysis("b.py", vec![]),
            analysis("c.py", vec![]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());
        for node in &report.nodes {
            assert!(report.layers.contains_key(node.as_str()));
        }
        assert_eq!(report.layers.len(), report.nodes.len());
    }

    #[test]
    fn alias_table_binds_local_names() {
        let files = vec![file("a.py"), file("pkg/util.py"), file("pkg/__init__.py")];
        let analyses = vec![
            analysis(
                "a.py",
                vec![
                    RawImport {
                        module: "numpy".into(),
                        symbol: None,
                        alias: Some("np".into()),
                        line: 1,
                    },
                    RawImport {
                        module: "pkg.util".into(),
                        symbol: Some("helper".into()),
                        alias: None,
                        line: 2,
                    },
                ],
            ),
            analysis("pkg/util.py", vec![]),
            analysis("pkg/__init__.py", vec![]),
        ];
        let report = build(&files, &analyses, &GraphConfig::default());
        let table = &report.aliases["a"];
        assert_eq!(table["np"], "numpy");
        assert_eq!(table["helper"], "pkg.util.helper");
    }
}
