use crate::models::analysis::FileAnalysis;
use crate::models::file::ParseStatus;
use crate::models::gaps::{
    CliArgument, CliFramework, EntryKind, EntryPoint, EnvVarRecord, GapReport, Hazard,
    HazardReason, LinterRules, PersonaEntry, PillarModule, ProjectDomain, TestExample,
};
use crate::models::git::GitReport;
use crate::models::graph::{ImportGraphReport, ImportKind, Layer};
use crate::services::file_discovery::DiscoveredFile;
use crate::services::import_graph::is_entry_file_name;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Dataframe-ish packages that signal a data-processing codebase.
const DATAFRAME_PACKAGES: &[&str] = &["pandas", "polars", "dask", "pyspark", "modin"];

/// Patterns recognised by the rosetta-stone scorer.
const TEST_PATTERNS: &[&str] = &[
    "@pytest.fixture",
    "mock",
    "Mock",
    "patch",
    "assert ",
    "pytest.raises",
    "parametrize",
    "monkeypatch",
    "capsys",
    "tmp_path",
];

lazy_static! {
    static ref ADD_ARGUMENT_RE: Regex =
        Regex::new(r#"\.add_argument\(\s*['"]([^'"]+)['"]([^)]*)"#).expect("argparse regex");
    static ref CLICK_RE: Regex =
        Regex::new(r#"@click\.(option|argument)\(\s*['"]([^'"]+)['"]([^)]*)"#).expect("click regex");
    static ref HELP_RE: Regex = Regex::new(r#"help\s*=\s*['"]([^'"]*)['"]"#).expect("help regex");
    static ref DEFAULT_RE: Regex =
        Regex::new(r"default\s*=\s*([^,)]+)").expect("default regex");
    static ref REQUIRED_RE: Regex =
        Regex::new(r"required\s*=\s*True").expect("required regex");
    static ref ROUTE_DECORATOR_RE: Regex = Regex::new(
        r"^(app|router|api|blueprint|bp)\.(route|get|post|put|patch|delete|websocket)$"
    )
    .expect("route regex");
}

#[derive(Debug, Clone)]
pub struct GapConfig {
    /// Token estimate above which a file becomes a hazard.
    pub hazard_token_threshold: usize,
    pub pillar_count: usize,
    pub maintenance_count: usize,
    /// Line cap for the rosetta-stone test example.
    pub test_example_max_lines: usize,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            hazard_token_threshold: 10_000,
            pillar_count: 10,
            maintenance_count: 10,
            test_example_max_lines: 50,
        }
    }
}

/// Derive the composite gap features from everything the earlier phases built.
pub fn build(
    files: &[DiscoveredFile],
    analyses: &[FileAnalysis],
    graph: &ImportGraphReport,
    git: &GitReport,
    target: &Path,
    config: &GapConfig,
) -> GapReport {
    let hazards = find_hazards(files, config.hazard_token_threshold);
    let entry_points = find_entry_points(files, analyses, target);
    let env_vars = collect_env_vars(analyses);
    let linter_rules = read_linter_rules(target);
    let test_example = pick_test_example(files, config.test_example_max_lines);
    let pillars = rank_pillars(graph, config.pillar_count);
    let maintenance_hotspots = git
        .risk
        .iter()
        .take(config.maintenance_count)
        .cloned()
        .collect();
    let domain = detect_domain(analyses, graph, &entry_points);
    let prose = render_prose(files, graph, domain);
    let personas = find_personas(analyses);

    debug!(
        "gap features: {} hazards, {} entry points, {} env vars",
        hazards.len(),
        entry_points.len(),
        env_vars.len()
    );

    GapReport {
        hazards,
        entry_points,
        env_vars,
        linter_rules,
        test_example,
        pillars,
        maintenance_hotspots,
        prose,
        domain: Some(domain),
        personas,
    }
}

// ---- hazards -------------------------------------------------------------

fn is_data_path(relative: &str) -> bool {
    relative.split('/').any(|segment| {
        matches!(segment, "artifacts" | "cache" | "logs")
            || segment.starts_with("neo4j_")
            || segment.ends_with(".egg-info")
    })
}

fn is_generated_name(relative: &str) -> bool {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    name.contains("_pb2") || name.contains("generated") || name.starts_with("auto_")
}

fn find_hazards(files: &[DiscoveredFile], threshold: usize) -> Vec<Hazard> {
    let mut raw: Vec<(String, usize, HazardReason)> = Vec::new();
    for file in files {
        let record = &file.record;
        if record.token_estimate <= threshold {
            continue;
        }
        let reason = if is_data_path(&record.relative_path) {
            HazardReason::Data
        } else if is_generated_name(&record.relative_path) {
            HazardReason::Generated
        } else {
            HazardReason::Large
        };
        raw.push((record.relative_path.clone(), record.token_estimate, reason));
    }

    // Directories holding two or more hazards collapse to a single glob.
    let mut per_dir: BTreeMap<String, usize> = BTreeMap::new();
    for (path, _, _) in &raw {
        let dir = path.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
        *per_dir.entry(dir).or_insert(0) += 1;
    }

    raw.into_iter()
        .map(|(path, tokens, reason)| {
            let dir = path.rsplit_once('/').map(|(d, _)| d.to_string()).unwrap_or_default();
            let suggested_glob = if !dir.is_empty() && per_dir.get(&dir).copied().unwrap_or(0) >= 2 {
                format!("{dir}/**")
            } else {
                path.clone()
            };
            Hazard {
                relative_path: path,
                token_estimate: tokens,
                reason,
                suggested_glob,
            }
        })
        .collect()
}

// ---- entry points --------------------------------------------------------

fn find_entry_points(
    files: &[DiscoveredFile],
    analyses: &[FileAnalysis],
    target: &Path,
) -> Vec<EntryPoint> {
    let by_module: BTreeMap<&str, &FileAnalysis> = analyses
        .iter()
        .map(|a| (a.module.as_str(), a))
        .collect();
    let console_modules = console_script_modules(target);

    let mut entries = Vec::new();
    for file in files {
        let record = &file.record;
        if record.parse_status != ParseStatus::Parsed {
            continue;
        }
        let analysis = by_module.get(record.module_path.as_str());
        let has_guard = analysis.map(|a| a.has_main_guard).unwrap_or(false);
        let is_console = console_modules.contains(record.module_path.as_str());
        let is_named_entry = is_entry_file_name(&record.relative_path);
        if !has_guard && !is_named_entry && !is_console {
            continue;
        }

        let kind = if is_console {
            EntryKind::ConsoleEntry
        } else if has_guard {
            EntryKind::MainGuard
        } else {
            EntryKind::ScriptEntry
        };

        let source = file.source.as_deref().unwrap_or("");
        let framework = detect_cli_framework(analysis.copied(), source);
        let arguments = match framework {
            CliFramework::Argparse => extract_argparse_args(source),
            CliFramework::Click => extract_click_args(source),
            CliFramework::Typer => extract_typer_args(analysis.copied()),
            CliFramework::None => Vec::new(),
        };

        entries.push(EntryPoint {
            relative_path: record.relative_path.clone(),
            kind,
            framework,
            arguments,
        });
    }
    entries
}

/// `[project.scripts]` values in pyproject.toml name `module:function`
/// console entry points.
fn console_script_modules(target: &Path) -> BTreeSet<String> {
    let mut modules = BTreeSet::new();
    let Ok(text) = std::fs::read_to_string(target.join("pyproject.toml")) else {
        return modules;
    };
    let Ok(doc) = text.parse::<toml::Table>() else {
        return modules;
    };
    let scripts = doc
        .get("project")
        .and_then(|p| p.get("scripts"))
        .and_then(|s| s.as_table());
    if let Some(scripts) = scripts {
        for value in scripts.values() {
            if let Some(spec) = value.as_str() {
                let module = spec.split(':').next().unwrap_or(spec);
                modules.insert(module.trim().to_string());
            }
        }
    }
    modules
}

fn detect_cli_framework(analysis: Option<&FileAnalysis>, source: &str) -> CliFramework {
    if let Some(analysis) = analysis {
        let imports_package = |name: &str| {
            analysis
                .imports
                .iter()
                .any(|i| i.module == name || i.module.starts_with(&format!("{name}.")))
        };
        if imports_package("click") || source.contains("@click.") {
            return CliFramework::Click;
        }
        if imports_package("typer") {
            return CliFramework::Typer;
        }
        if imports_package("argparse")
            || analysis.calls.iter().any(|c| c.target.ends_with("ArgumentParser"))
        {
            return CliFramework::Argparse;
        }
    }
    CliFramework::None
}

fn extract_argparse_args(source: &str) -> Vec<CliArgument> {
    ADD_ARGUMENT_RE
        .captures_iter(source)
        .map(|captures| {
            let name = captures[1].to_string();
            let rest = &captures[2];
            let positional = !name.starts_with('-');
            CliArgument {
                required: positional || REQUIRED_RE.is_match(rest),
                default: DEFAULT_RE
                    .captures(rest)
                    .map(|d| d[1].trim().to_string()),
                help: HELP_RE.captures(rest).map(|h| h[1].to_string()),
                name,
            }
        })
        .collect()
}

fn extract_click_args(source: &str) -> Vec<CliArgument> {
    CLICK_RE
        .captures_iter(source)
        .map(|captures| {
            let kind = &captures[1];
            let name = captures[2].to_string();
            let rest = &captures[3];
            CliArgument {
                // click arguments are required unless a default is given.
                required: kind == "argument" && !rest.contains("default")
                    || REQUIRED_RE.is_match(rest),
                default: DEFAULT_RE.captures(rest).map(|d| d[1].trim().to_string()),
                help: HELP_RE.captures(rest).map(|h| h[1].to_string()),
                name,
            }
        })
        .collect()
}

/// Typer declares arguments in function signatures:
/// `def main(path: str = typer.Argument(...), count: int = typer.Option(3))`.
fn extract_typer_args(analysis: Option<&FileAnalysis>) -> Vec<CliArgument> {
    let Some(analysis) = analysis else {
        return Vec::new();
    };
    let mut arguments = Vec::new();
    for function in &analysis.functions {
        for param in &function.params {
            let Some(default) = &param.default else { continue };
            if !default.starts_with("typer.Option(") && !default.starts_with("typer.Argument(") {
                continue;
            }
            let inner = default
                .split_once('(')
                .map(|(_, rest)| rest)
                .unwrap_or("");
            arguments.push(CliArgument {
                name: param.name.clone(),
                required: inner.trim_start().starts_with("..."),
                default: (!inner.trim_start().starts_with("..."))
                    .then(|| inner.split(',').next().unwrap_or("").trim().to_string())
                    .filter(|d| !d.is_empty() && !d.ends_with("...")),
                help: HELP_RE.captures(default).map(|h| h[1].to_string()),
            });
        }
    }
    arguments
}

// ---- environment variables ----------------------------------------------

fn collect_env_vars(analyses: &[FileAnalysis]) -> Vec<EnvVarRecord> {
    let mut records: Vec<EnvVarRecord> = Vec::new();
    for analysis in analyses {
        for read in &analysis.env_reads {
            records.push(EnvVarRecord {
                name: read.name.clone(),
                default: read.default.clone(),
                required: read.default.is_none(),
                file: analysis.relative_path.clone(),
                line: read.line,
            });
        }
    }
    records.sort_by(|a, b| (&a.name, &a.file, a.line).cmp(&(&b.name, &b.file, b.line)));
    records.dedup();
    records
}

// ---- linter rules --------------------------------------------------------

fn read_linter_rules(target: &Path) -> LinterRules {
    if let Some(rules) = pyproject_rules(target) {
        return rules;
    }
    if let Some(rules) = ruff_toml_rules(target) {
        return rules;
    }
    if let Some(rules) = flake8_rules(target) {
        return rules;
    }
    LinterRules::default()
}

fn pyproject_rules(target: &Path) -> Option<LinterRules> {
    let text = std::fs::read_to_string(target.join("pyproject.toml")).ok()?;
    let doc: toml::Table = text.parse().ok()?;
    let tool = doc.get("tool")?.as_table()?;

    if let Some(ruff) = tool.get("ruff").and_then(|r| r.as_table()) {
        let mut rules = rules_from_ruff_table(ruff);
        rules.source = Some("pyproject.toml".to_string());
        return Some(rules);
    }
    if let Some(flake8) = tool.get("flake8").and_then(|f| f.as_table()) {
        let mut rules = LinterRules {
            line_length: flake8
                .get("max-line-length")
                .and_then(|v| v.as_integer())
                .map(|v| v as usize),
            ..Default::default()
        };
        rules.source = Some("pyproject.toml".to_string());
        return Some(rules);
    }
    None
}

fn rules_from_ruff_table(ruff: &toml::Table) -> LinterRules {
    let string_list = |value: Option<&toml::Value>| -> Vec<String> {
        value
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    };
    // Lint settings moved under [tool.ruff.lint] in newer layouts.
    let lint = ruff.get("lint").and_then(|l| l.as_table());
    LinterRules {
        line_length: ruff
            .get("line-length")
            .and_then(|v| v.as_integer())
            .map(|v| v as usize),
        select: string_list(
            lint.and_then(|l| l.get("select")).or_else(|| ruff.get("select")),
        ),
        ignore: string_list(
            lint.and_then(|l| l.get("ignore")).or_else(|| ruff.get("ignore")),
        ),
        source: None,
    }
}

fn ruff_toml_rules(target: &Path) -> Option<LinterRules> {
    let text = std::fs::read_to_string(target.join("ruff.toml")).ok()?;
    let doc: toml::Table = text.parse().ok()?;
    let mut rules = rules_from_ruff_table(&doc);
    rules.source = Some("ruff.toml".to_string());
    Some(rules)
}

/// `.flake8` is INI; a line-based scan keeps toml out of it.
fn flake8_rules(target: &Path) -> Option<LinterRules> {
    let text = std::fs::read_to_string(target.join(".flake8")).ok()?;
    let mut rules = LinterRules {
        source: Some(".flake8".to_string()),
        ..Default::default()
    };
    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else { continue };
        match key.trim() {
            "max-line-length" => rules.line_length = value.trim().parse().ok(),
            "select" => {
                rules.select = value.split(',').map(|s| s.trim().to_string()).collect();
            }
            "ignore" | "extend-ignore" => {
                rules.ignore = value.split(',').map(|s| s.trim().to_string()).collect();
            }
            _ => {}
        }
    }
    Some(rules)
}

// ---- rosetta stone -------------------------------------------------------

fn pick_test_example(files: &[DiscoveredFile], max_lines: usize) -> Option<TestExample> {
    let mut best: Option<TestExample> = None;
    for file in files {
        let relative = &file.record.relative_path;
        let first = relative.split('/').next().unwrap_or("");
        if !matches!(first, "tests" | "test" | "testing") {
            continue;
        }
        if file.record.lines == 0 || file.record.lines > max_lines {
            continue;
        }
        let Some(source) = &file.source else { continue };
        let patterns: Vec<String> = TEST_PATTERNS
            .iter()
            .filter(|p| source.contains(*p))
            .map(|p| p.to_string())
            .collect();
        if patterns.is_empty() {
            continue;
        }
        let candidate = TestExample {
            relative_path: relative.clone(),
            lines: file.record.lines,
            patterns,
            text: source.clone(),
        };
        let better = match &best {
            None => true,
            Some(current) => {
                candidate.patterns.len() > current.patterns.len()
                    || (candidate.patterns.len() == current.patterns.len()
                        && candidate.relative_path < current.relative_path)
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

// ---- pillars, prose, personas -------------------------------------------

fn rank_pillars(graph: &ImportGraphReport, count: usize) -> Vec<PillarModule> {
    let mut in_degrees: BTreeMap<&str, usize> = BTreeMap::new();
    for edge in &graph.edges {
        if edge.kind == ImportKind::Internal && edge.resolved {
            *in_degrees.entry(edge.target.as_str()).or_insert(0) += 1;
        }
    }
    let mut pillars: Vec<PillarModule> = graph
        .nodes
        .iter()
        .filter_map(|module| {
            let fan_in = in_degrees.get(module.as_str()).copied().unwrap_or(0);
            (fan_in > 0).then(|| PillarModule {
                module: module.clone(),
                fan_in,
            })
        })
        .collect();
    pillars.sort_by(|a, b| {
        (b.fan_in, a.module.as_str()).cmp(&(a.fan_in, b.module.as_str()))
    });
    pillars.truncate(count);
    pillars
}

fn detect_domain(
    analyses: &[FileAnalysis],
    graph: &ImportGraphReport,
    entry_points: &[EntryPoint],
) -> ProjectDomain {
    let agent_classes = analyses
        .iter()
        .flat_map(|a| &a.classes)
        .filter(|c| c.name.contains("Agent"))
        .count();
    if agent_classes > 5 {
        return ProjectDomain::AgentOriented;
    }

    let has_routes = analyses.iter().any(|a| {
        a.functions
            .iter()
            .flat_map(|f| &f.decorators)
            .chain(a.classes.iter().flat_map(|c| &c.decorators))
            .any(|d| ROUTE_DECORATOR_RE.is_match(d))
    });
    if has_routes {
        return ProjectDomain::ApiOriented;
    }

    let has_dataframes = graph
        .external_packages
        .keys()
        .any(|p| DATAFRAME_PACKAGES.contains(&p.as_str()));
    if has_dataframes {
        return ProjectDomain::DataProcessing;
    }

    if entry_points
        .iter()
        .any(|e| e.framework != CliFramework::None)
    {
        return ProjectDomain::CliTool;
    }
    ProjectDomain::General
}

fn render_prose(files: &[DiscoveredFile], graph: &ImportGraphReport, domain: ProjectDomain) -> String {
    let total = files.len();
    let mut layer_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for layer in graph.layers.values() {
        *layer_counts.entry(layer.as_str()).or_insert(0) += 1;
    }
    let foundation = layer_counts.get(Layer::Foundation.as_str()).copied().unwrap_or(0);
    let core = layer_counts.get(Layer::Core.as_str()).copied().unwrap_or(0);
    let orchestration = layer_counts
        .get(Layer::Orchestration.as_str())
        .copied()
        .unwrap_or(0);
    let leaf = layer_counts.get(Layer::Leaf.as_str()).copied().unwrap_or(0);

    let domain_sentence = match domain {
        ProjectDomain::AgentOriented => {
            "The codebase is agent-oriented: prompt-driven agent classes dominate the design."
        }
        ProjectDomain::ApiOriented => {
            "The codebase serves an API: route handlers form the outer surface."
        }
        ProjectDomain::DataProcessing => {
            "The codebase is a data-processing pipeline built on dataframe libraries."
        }
        ProjectDomain::CliTool => {
            "The codebase is a command-line tool; start from its entry points."
        }
        ProjectDomain::General => "The codebase is a general-purpose Python project.",
    };

    format!(
        "This tree holds {total} Python files. The import graph splits into \
{foundation} foundation, {core} core, {orchestration} orchestration, and {leaf} leaf modules. \
{domain_sentence}"
    )
}

fn find_personas(analyses: &[FileAnalysis]) -> Vec<PersonaEntry> {
    let mut personas = Vec::new();
    for analysis in analyses {
        let in_prompt_dir = analysis
            .relative_path
            .split('/')
            .any(|segment| segment == "agents" || segment == "prompts");
        if !in_prompt_dir {
            continue;
        }
        for literal in &analysis.long_literals {
            let prompt_like = literal.excerpt.to_lowercase().contains("you are")
                || literal.length > 400;
            if prompt_like {
                personas.push(PersonaEntry {
                    relative_path: analysis.relative_path.clone(),
                    line: literal.line,
                    excerpt: literal.excerpt.clone(),
                });
            }
        }
    }
    personas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::EnvRead;
    use crate::models::file::{FileRecord, ModulePath};
    use crate::services::import_graph::{self, GraphConfig};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn discovered(relative: &str, source: &str) -> DiscoveredFile {
        DiscoveredFile {
            record: FileRecord {
                path: PathBuf::from(format!("/t/{relative}")),
                relative_path: relative.to_string(),
                bytes: source.len() as u64,
                lines: source.lines().count(),
                token_estimate: source.len() / 4,
                module_path: ModulePath::from_relative(std::path::Path::new(relative)).unwrap(),
                parse_status: ParseStatus::Parsed,
            },
            source: Some(source.to_string()),
        }
    }

    fn discovered_sized(relative: &str, token_estimate: usize) -> DiscoveredFile {
        let mut file = discovered(relative, "");
        file.record.token_estimate = token_estimate;
        file
    }

    #[test]
    fn large_files_become_hazards_with_globs() {
        let files = vec![
            discovered_sized("data/huge_one.py", 20_000),
            discovered_sized("data/huge_two.py", 15_000),
            discovered_sized("small.py", 100),
            discovered_sized("big_single.py", 30_000),
        ];
        let hazards = find_hazards(&files, 10_000);
        assert_eq!(hazards.len(), 3);
        let clustered: Vec<&Hazard> = hazards
            .iter()
            .filter(|h| h.relative_path.starts_with("data/"))
            .collect();
        assert!(clustered.iter().all(|h| h.suggested_glob == "data/**"));
        let single = hazards
            .iter()
            .find(|h| h.relative_path == "big_single.py")
            .unwrap();
        assert_eq!(single.suggested_glob, "big_single.py");
    }

    #[test]
    fn data_directories_get_the_data_reason() {
        let files = vec![discovered_sized("artifacts/dump.py", 50_000)];
        let hazards = find_hazards(&files, 10_000);
        assert_eq!(hazards[0].reason, HazardReason::Data);
    }

    #[test]
    fn generated_names_get_the_generated_reason() {
        let files = vec![discovered_sized("proto/schema_pb2.py", 50_000)];
        let hazards = find_hazards(&files, 10_000);
        assert_eq!(hazards[0].reason, HazardReason::Generated);
    }

    #[test]
    fn argparse_arguments_are_extracted() {
        let source = r#"
import argparse

parser = argparse.ArgumentParser()
parser.add_argument("path", help="target directory")
parser.add_argument("--verbose", default=False, help="noisy output")
parser.add_argument("--retries", required=True)
"#;
        let args = extract_argparse_args(source);
        assert_eq!(args.len(), 3);
        assert!(args[0].required);
        assert_eq!(args[0].help.as_deref(), Some("target directory"));
        assert!(!args[1].required);
        assert_eq!(args[1].default.as_deref(), Some("False"));
        assert!(args[2].required);
    }

    #[test]
    fn click_options_are_extracted() {
        let source = r#"
@click.option("--count", default=3, help="how many")
@click.argument("target")
def main(count, target):
    pass
"#;
        let args = extract_click_args(source);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].name, "--count");
        assert_eq!(args[0].default.as_deref(), Some("3"));
        assert!(args[1].required);
    }

    #[test]
    fn entry_points_cover_guard_and_name_patterns() {
        let guard_file = discovered("runner.py", "if __name__ == \"__main__\":\n    pass\n");
        let mut guard_analysis =
            FileAnalysis::empty(ModulePath::new("runner"), "runner.py".into());
        guard_analysis.has_main_guard = true;
        let cli_file = discovered("cli.py", "import argparse\n");
        let mut cli_analysis = FileAnalysis::empty(ModulePath::new("cli"), "cli.py".into());
        cli_analysis.imports = vec![crate::models::analysis::RawImport {
            module: "argparse".into(),
            symbol: None,
            alias: None,
            line: 1,
        }];

        let temp = TempDir::new().unwrap();
        let entries = find_entry_points(
            &[guard_file, cli_file],
            &[guard_analysis, cli_analysis],
            temp.path(),
        );
        assert_eq!(entries.len(), 2);
        let guard = entries.iter().find(|e| e.relative_path == "runner.py").unwrap();
        assert_eq!(guard.kind, EntryKind::MainGuard);
        let cli = entries.iter().find(|e| e.relative_path == "cli.py").unwrap();
        assert_eq!(cli.kind, EntryKind::ScriptEntry);
        assert_eq!(cli.framework, CliFramework::Argparse);
    }

    #[test]
    fn env_vars_required_iff_no_default() {
        let mut analysis = FileAnalysis::empty(ModulePath::new("m"), "m.py".into());
        analysis.env_reads = vec![
            EnvRead {
                name: "API_KEY".into(),
                default: None,
                line: 3,
            },
            EnvRead {
                name: "HOST".into(),
                default: Some("\"localhost\"".into()),
                line: 4,
            },
        ];
        let records = collect_env_vars(&[analysis]);
        assert_eq!(records.len(), 2);
        assert!(records[0].required);
        assert!(!records[1].required);
    }

    #[test]
    fn linter_rules_from_pyproject_ruff() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("pyproject.toml"),
            "[tool.ruff]\nline-length = 100\n\n[tool.ruff.lint]\nselect = [\"E\", \"F\"]\nignore = [\"E501\"]\n",
        )
        .unwrap();
        let rules = read_linter_rules(temp.path());
        assert_eq!(rules.line_length, Some(100));
        assert_eq!(rules.select, vec!["E", "F"]);
        assert_eq!(rules.ignore, vec!["E501"]);
        assert_eq!(rules.source.as_deref(), Some("pyproject.toml"));
    }

    #[test]
    fn linter_rules_from_flake8_ini() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".flake8"),
            "[flake8]\nmax-line-length = 88\nignore = E203, W503\n",
        )
        .unwrap();
        let rules = read_linter_rules(temp.path());
        assert_eq!(rules.line_length, Some(88));
        assert_eq!(rules.ignore, vec!["E203", "W503"]);
    }

    #[test]
    fn missing_configs_yield_empty_rules() {
        let temp = TempDir::new().unwrap();
        assert_eq!(read_linter_rules(temp.path()), LinterRules::default());
    }

    #[test]
    fn rosetta_stone_prefers_pattern_variety() {
        let sparse = discovered("tests/test_sparse.py", "def test_a():\n    assert True\n");
        let rich = discovered(
            "tests/test_rich.py",
            "import pytest\nfrom unittest import mock\n\n@pytest.fixture\ndef thing():\n    yield 1\n\ndef test_b(thing, monkeypatch, tmp_path):\n    with pytest.raises(ValueError):\n        raise ValueError\n    assert thing == 1\n",
        );
        let example = pick_test_example(&[sparse, rich], 50).unwrap();
        assert_eq!(example.relative_path, "tests/test_rich.py");
        assert!(example.patterns.len() >= 4);
    }

    #[test]
    fn oversized_test_files_are_skipped() {
        let mut big_source = String::new();
        for i in 0..60 {
            big_source.push_str(&format!("def test_{i}():\n    assert True\n"));
        }
        let big = discovered("tests/test_big.py", &big_source);
        assert!(pick_test_example(&[big], 50).is_none());
    }

    #[test]
    fn personas_only_from_prompt_directories() {
        let prompt = "You are a meticulous reviewer. ".repeat(10);
        let mut agent = FileAnalysis::empty(ModulePath::new("agents.reviewer"), "agents/reviewer.py".into());
        agent.long_literals = vec![crate::models::analysis::LongLiteral {
            line: 4,
            length: prompt.len(),
            excerpt: prompt.clone(),
        }];
        let mut other = FileAnalysis::empty(ModulePath::new("core.engine"), "core/engine.py".into());
        other.long_literals = vec![crate::models::analysis::LongLiteral {
            line: 9,
            length: prompt.len(),
            excerpt: prompt,
        }];
        let personas = find_personas(&[agent, other]);
        assert_eq!(personas.len(), 1);
        assert_eq!(personas[0].relative_path, "agents/reviewer.py");
    }

    #[test]
    fn domain_detection_prefers_agents_then_routes() {
        let mut analysis = FileAnalysis::empty(ModulePath::new("m"), "m.py".into());
        for i in 0..6 {
            analysis.classes.push(crate::models::skeleton::ClassRecord {
                name: format!("WorkerAgent{i}"),
                line: 1,
                bases: vec![],
                decorators: vec![],
                docstring: String::new(),
                methods: vec![],
                fields: vec![],
                model_kind: crate::models::skeleton::ModelKind::Plain,
            });
        }
        let files = vec![discovered("m.py", "")];
        let graph = import_graph::build(
            &files.iter().map(|f| f.record.clone()).collect::<Vec<_>>(),
            std::slice::from_ref(&analysis),
            &GraphConfig::default(),
        );
        let domain = detect_domain(std::slice::from_ref(&analysis), &graph, &[]);
        assert_eq!(domain, ProjectDomain::AgentOriented);
    }
}
