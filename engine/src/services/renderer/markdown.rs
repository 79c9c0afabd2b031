use crate::models::bundle::AnalysisBundle;
use crate::models::gaps::CliFramework;
use crate::models::graph::ImportKind;
use crate::models::skeleton::ModelKind;
use crate::services::renderer::{mermaid, skeleton};
use std::fmt::Write;

/// Row caps keep long tables from swamping the report.
const TABLE_CAP: usize = 15;
const DETAIL_CAP: usize = 40;

/// Render the human-readable report. Sections appear in canonical order and
/// only when enabled in the bundle's effective section map.
pub fn render(bundle: &AnalysisBundle) -> String {
    let mut w = Writer {
        bundle,
        out: String::new(),
    };
    w.summary();
    w.prose();
    w.mermaid_section();
    w.pillars();
    w.maintenance_hotspots();
    w.complexity_hotspots();
    w.critical_classes();
    w.data_models();
    w.logic_maps();
    w.hazards();
    w.entry_points();
    w.explain();
    w.persona_map();
    w.github_about();
    w.data_flow();
    w.instance_vars();
    w.pydantic_validators();
    w.hazard_patterns();
    w.env_defaults();
    w.test_example();
    w.linter_rules();
    w.import_analysis();
    w.layer_details();
    w.git_risk();
    w.coupling();
    w.freshness();
    w.side_effects();
    w.side_effects_detail();
    w.tech_debt_markers();
    w.verify_imports();
    w.signatures();
    w.state_mutations();
    w.verify_commands();
    w.environment_variables();
    w.test_coverage();
    w.out
}

struct Writer<'a> {
    bundle: &'a AnalysisBundle,
    out: String,
}

impl<'a> Writer<'a> {
    fn on(&self, key: &str) -> bool {
        self.bundle.sections.enabled(key)
    }

    fn heading(&mut self, title: &str) {
        let _ = writeln!(self.out, "\n## {title}\n");
    }

    fn summary(&mut self) {
        if !self.on("summary") {
            return;
        }
        let m = &self.bundle.metadata;
        let _ = writeln!(self.out, "# Repository X-Ray");
        let _ = writeln!(
            self.out,
            "\nGenerated {} by pyxray v{} for `{}`.\n",
            m.generated_at.format("%Y-%m-%d %H:%M UTC"),
            m.tool_version,
            m.target.display()
        );
        let _ = writeln!(self.out, "| Metric | Value |");
        let _ = writeln!(self.out, "|---|---|");
        let _ = writeln!(self.out, "| Python files | {} |", m.total_files);
        let _ = writeln!(self.out, "| Lines | {} |", m.total_lines);
        let _ = writeln!(self.out, "| Token estimate | {} |", m.total_token_estimate);
        let _ = writeln!(self.out, "| Parse failures | {} |", m.parse_failures);
        let _ = writeln!(
            self.out,
            "| Annotation coverage | {:.0}% |",
            self.bundle.complexity.annotation_coverage * 100.0
        );
        for warning in &self.bundle.warnings {
            let _ = writeln!(self.out, "\n> {warning}");
        }
    }

    fn prose(&mut self) {
        if !self.on("prose") || self.bundle.gaps.prose.is_empty() {
            return;
        }
        self.heading("Overview");
        let _ = writeln!(self.out, "{}", self.bundle.gaps.prose);
    }

    fn mermaid_section(&mut self) {
        if !self.on("mermaid") || self.bundle.import_graph.nodes.is_empty() {
            return;
        }
        self.heading("Module Graph");
        let diagram = mermaid::generate(&self.bundle.import_graph);
        let _ = writeln!(self.out, "```mermaid\n{diagram}```");
    }

    fn pillars(&mut self) {
        if !self.on("architectural_pillars") || self.bundle.gaps.pillars.is_empty() {
            return;
        }
        self.heading("Architectural Pillars");
        let _ = writeln!(self.out, "Most-imported modules; read these first.\n");
        for pillar in &self.bundle.gaps.pillars {
            let _ = writeln!(
                self.out,
                "- `{}` (imported by {})",
                pillar.module, pillar.fan_in
            );
        }
    }

    fn maintenance_hotspots(&mut self) {
        if !self.on("maintenance_hotspots") || self.bundle.gaps.maintenance_hotspots.is_empty() {
            return;
        }
        self.heading("Maintenance Hotspots");
        let _ = writeln!(self.out, "| File | Risk | Commits | Hotfixes | Authors |");
        let _ = writeln!(self.out, "|---|---|---|---|---|");
        for entry in &self.bundle.gaps.maintenance_hotspots {
            let _ = writeln!(
                self.out,
                "| `{}` | {:.2} | {} | {} | {} |",
                entry.relative_path, entry.score, entry.commits, entry.hotfix_commits, entry.authors
            );
        }
    }

    fn complexity_hotspots(&mut self) {
        if !self.on("complexity_hotspots") || self.bundle.complexity.hotspots.is_empty() {
            return;
        }
        self.heading("Complexity Hotspots");
        let _ = writeln!(self.out, "| Function | Module | Line | Cyclomatic |");
        let _ = writeln!(self.out, "|---|---|---|---|");
        for hotspot in self.bundle.complexity.hotspots.iter().take(TABLE_CAP) {
            let _ = writeln!(
                self.out,
                "| `{}` | `{}` | {} | {} |",
                hotspot.function, hotspot.module, hotspot.line, hotspot.complexity
            );
        }
    }

    fn critical_classes(&mut self) {
        if !self.on("critical_classes") {
            return;
        }
        // The biggest classes carry the architecture; skeletons keep them cheap.
        let mut classes: Vec<_> = self
            .bundle
            .modules
            .iter()
            .flat_map(|m| m.classes.iter().map(move |c| (m, c)))
            .collect();
        classes.sort_by(|a, b| {
            (b.1.methods.len(), a.1.name.as_str()).cmp(&(a.1.methods.len(), b.1.name.as_str()))
        });
        let top: Vec<_> = classes
            .into_iter()
            .filter(|(_, c)| c.methods.len() >= 3)
            .take(5)
            .collect();
        if top.is_empty() {
            return;
        }
        self.heading("Critical Classes");
        for (module, class) in top {
            let _ = writeln!(self.out, "`{}`:\n", module.relative_path);
            let _ = writeln!(self.out, "```python\n{}```", skeleton::render_class(class));
        }
    }

    fn data_models(&mut self) {
        if !self.on("data_models") {
            return;
        }
        let models: Vec<_> = self
            .bundle
            .modules
            .iter()
            .flat_map(|m| m.classes.iter().map(move |c| (m, c)))
            .filter(|(_, c)| c.model_kind != ModelKind::Plain)
            .take(10)
            .collect();
        if models.is_empty() {
            return;
        }
        self.heading("Data Models");
        for (module, class) in models {
            let _ = writeln!(self.out, "`{}`:\n", module.relative_path);
            let _ = writeln!(self.out, "```python\n{}```", skeleton::render_class(class));
        }
    }

    fn logic_maps(&mut self) {
        if !self.on("logic_maps") || self.bundle.complexity.logic_maps.is_empty() {
            return;
        }
        self.heading("Logic Maps");
        for map in &self.bundle.complexity.logic_maps {
            let _ = writeln!(
                self.out,
                "### `{}` ({}, complexity {})\n",
                map.function, map.module, map.complexity
            );
            if !map.docstring.is_empty() {
                let _ = writeln!(self.out, "{}\n", map.docstring);
            }
            let _ = writeln!(self.out, "```\n{}", map.signature);
            for line in &map.flow {
                let _ = writeln!(self.out, "  {line}");
            }
            let _ = writeln!(self.out, "```");
            let _ = writeln!(
                self.out,
                "_{:.0}% smaller than the full body._",
                map.reduction_pct()
            );
        }
    }

    fn hazards(&mut self) {
        if !self.on("hazards") || self.bundle.gaps.hazards.is_empty() {
            return;
        }
        self.heading("Context Hazards");
        let _ = writeln!(self.out, "| File | Tokens | Reason | Exclude |");
        let _ = writeln!(self.out, "|---|---|---|---|");
        for hazard in &self.bundle.gaps.hazards {
            let _ = writeln!(
                self.out,
                "| `{}` | {} | {:?} | `{}` |",
                hazard.relative_path, hazard.token_estimate, hazard.reason, hazard.suggested_glob
            );
        }
    }

    fn entry_points(&mut self) {
        if !self.on("entry_points") || self.bundle.gaps.entry_points.is_empty() {
            return;
        }
        self.heading("Entry Points");
        for entry in &self.bundle.gaps.entry_points {
            let framework = match entry.framework {
                CliFramework::Argparse => " (argparse)",
                CliFramework::Click => " (click)",
                CliFramework::Typer => " (typer)",
                CliFramework::None => "",
            };
            let _ = writeln!(self.out, "- `{}` [{:?}]{}", entry.relative_path, entry.kind, framework);
            if self.on("cli_arguments") {
                for argument in &entry.arguments {
                    let required = if argument.required { "required" } else { "optional" };
                    let default = argument
                        .default
                        .as_deref()
                        .map(|d| format!(", default {d}"))
                        .unwrap_or_default();
                    let help = argument.help.as_deref().unwrap_or("");
                    let _ = writeln!(
                        self.out,
                        "    - `{}` ({required}{default}) {help}",
                        argument.name
                    );
                }
            }
        }
    }

    fn explain(&mut self) {
        if !self.on("explain") {
            return;
        }
        self.heading("How To Read This Report");
        let _ = writeln!(
            self.out,
            "Start with the pillars and module graph for orientation, check hazards \
before opening any large file, then use logic maps and skeletons instead of \
reading whole modules. Git sections flag where changes are risky."
        );
    }

    fn persona_map(&mut self) {
        if !self.on("persona_map") || self.bundle.gaps.personas.is_empty() {
            return;
        }
        self.heading("Persona Map");
        for persona in &self.bundle.gaps.personas {
            let _ = writeln!(
                self.out,
                "- `{}:{}` — {}",
                persona.relative_path,
                persona.line,
                crate::utils::truncate_chars(&persona.excerpt, 100)
            );
        }
    }

    fn github_about(&mut self) {
        if !self.on("github_about") {
            return;
        }
        self.heading("Suggested GitHub About");
        let first = self
            .bundle
            .gaps
            .prose
            .split(". ")
            .last()
            .unwrap_or("")
            .trim();
        let _ = writeln!(self.out, "> {first}");
    }

    fn data_flow(&mut self) {
        if !self.on("data_flow") {
            return;
        }
        let graph = &self.bundle.import_graph;
        let by_layer = |layer: &str| -> Vec<&str> {
            graph
                .layers
                .iter()
                .filter(|(_, l)| l.as_str() == layer)
                .map(|(name, _)| name.as_str())
                .take(8)
                .collect()
        };
        let orchestration = by_layer("orchestration");
        let foundation = by_layer("foundation");
        if orchestration.is_empty() && foundation.is_empty() {
            return;
        }
        self.heading("Data Flow");
        if !orchestration.is_empty() {
            let _ = writeln!(self.out, "Drivers: {}", code_list(&orchestration));
        }
        if !foundation.is_empty() {
            let _ = writeln!(self.out, "Shared foundations: {}", code_list(&foundation));
        }
    }

    fn instance_vars(&mut self) {
        if !self.on("instance_vars") {
            return;
        }
        let mut rows = Vec::new();
        for module in &self.bundle.modules {
            for class in &module.classes {
                for field in &class.fields {
                    if field.source == crate::models::skeleton::FieldSource::InitAssignment {
                        rows.push((class.name.as_str(), field));
                    }
                }
            }
        }
        if rows.is_empty() {
            return;
        }
        self.heading("Instance Variables");
        let _ = writeln!(self.out, "| Class | Variable | Initialised to |");
        let _ = writeln!(self.out, "|---|---|---|");
        for (class, field) in rows.into_iter().take(DETAIL_CAP) {
            let _ = writeln!(
                self.out,
                "| `{}` | `self.{}` | `{}` |",
                class,
                field.name,
                field.default.as_deref().unwrap_or("...")
            );
        }
    }

    fn pydantic_validators(&mut self) {
        if !self.on("pydantic_validators") {
            return;
        }
        let validators: Vec<_> = self
            .bundle
            .modules
            .iter()
            .flat_map(|m| m.validators.iter().map(move |v| (m, v)))
            .collect();
        if validators.is_empty() {
            return;
        }
        self.heading("Pydantic Validators");
        for (module, validator) in validators {
            let _ = writeln!(
                self.out,
                "- `{}.{}` (@{}) at `{}:{}`",
                validator.class_name,
                validator.method_name,
                validator.decorator,
                module.relative_path,
                validator.line
            );
        }
    }

    fn hazard_patterns(&mut self) {
        if !self.on("hazard_patterns") || self.bundle.gaps.hazards.is_empty() {
            return;
        }
        let mut globs: Vec<&str> = self
            .bundle
            .gaps
            .hazards
            .iter()
            .map(|h| h.suggested_glob.as_str())
            .collect();
        globs.sort();
        globs.dedup();
        self.heading("Hazard Exclude Patterns");
        for glob in globs {
            let _ = writeln!(self.out, "- `{glob}`");
        }
    }

    fn env_defaults(&mut self) {
        if !self.on("env_defaults") {
            return;
        }
        let with_defaults: Vec<_> = self
            .bundle
            .gaps
            .env_vars
            .iter()
            .filter(|v| v.default.is_some())
            .collect();
        if with_defaults.is_empty() {
            return;
        }
        self.heading("Environment Defaults");
        let _ = writeln!(self.out, "```");
        for variable in with_defaults {
            let _ = writeln!(
                self.out,
                "{}={}",
                variable.name,
                variable.default.as_deref().unwrap_or("")
            );
        }
        let _ = writeln!(self.out, "```");
    }

    fn test_example(&mut self) {
        if !self.on("test_example") {
            return;
        }
        let Some(example) = &self.bundle.gaps.test_example else {
            return;
        };
        self.heading("Test Example (Rosetta Stone)");
        let _ = writeln!(
            self.out,
            "`{}` ({} lines) shows the house test style:\n",
            example.relative_path, example.lines
        );
        let _ = writeln!(self.out, "```python\n{}```", example.text);
    }

    fn linter_rules(&mut self) {
        if !self.on("linter_rules") {
            return;
        }
        let rules = &self.bundle.gaps.linter_rules;
        if rules.source.is_none() {
            return;
        }
        self.heading("Linter Rules");
        if let Some(source) = &rules.source {
            let _ = writeln!(self.out, "From `{source}`:");
        }
        if let Some(length) = rules.line_length {
            let _ = writeln!(self.out, "- line length: {length}");
        }
        if !rules.select.is_empty() {
            let _ = writeln!(self.out, "- select: {}", rules.select.join(", "));
        }
        if !rules.ignore.is_empty() {
            let _ = writeln!(self.out, "- ignore: {}", rules.ignore.join(", "));
        }
    }

    fn import_analysis(&mut self) {
        if !self.on("import_analysis") {
            return;
        }
        let graph = &self.bundle.import_graph;
        if graph.nodes.is_empty() {
            return;
        }
        self.heading("Import Analysis");
        let internal = graph
            .edges
            .iter()
            .filter(|e| e.kind == ImportKind::Internal)
            .count();
        let external = graph
            .edges
            .iter()
            .filter(|e| e.kind == ImportKind::External)
            .count();
        let stdlib = graph
            .edges
            .iter()
            .filter(|e| e.kind == ImportKind::Stdlib)
            .count();
        let _ = writeln!(
            self.out,
            "{} modules; {internal} internal, {external} external, {stdlib} stdlib imports.",
            graph.nodes.len()
        );
        if !graph.external_packages.is_empty() {
            let mut packages: Vec<_> = graph.external_packages.iter().collect();
            packages.sort_by(|a, b| (b.1, a.0).cmp(&(a.1, b.0)));
            let top: Vec<String> = packages
                .into_iter()
                .take(10)
                .map(|(name, count)| format!("`{name}` ({count})"))
                .collect();
            let _ = writeln!(self.out, "\nTop external packages: {}", top.join(", "));
        }
        if !graph.circular_groups.is_empty() {
            let _ = writeln!(self.out, "\nCircular imports:");
            for group in &graph.circular_groups {
                let _ = writeln!(self.out, "- {}", group.join(" <-> "));
            }
        }
        if !graph.orphans.is_empty() {
            let orphan_names: Vec<&str> =
                graph.orphans.iter().take(TABLE_CAP).map(|m| m.as_str()).collect();
            let _ = writeln!(self.out, "\nOrphan modules: {}", code_list(&orphan_names));
        }
    }

    fn layer_details(&mut self) {
        if !self.on("layer_details") || self.bundle.import_graph.layers.is_empty() {
            return;
        }
        self.heading("Layer Assignments");
        let _ = writeln!(self.out, "| Module | Layer |");
        let _ = writeln!(self.out, "|---|---|");
        for (module, layer) in self.bundle.import_graph.layers.iter().take(DETAIL_CAP) {
            let _ = writeln!(self.out, "| `{module}` | {} |", layer.as_str());
        }
    }

    fn git_risk(&mut self) {
        if !self.on("git_risk") || self.bundle.git.risk.is_empty() {
            return;
        }
        self.heading("Change Risk");
        let _ = writeln!(
            self.out,
            "Files most likely to need care, from the last {} months of history.\n",
            self.bundle.git.window_months
        );
        let _ = writeln!(self.out, "| File | Risk |");
        let _ = writeln!(self.out, "|---|---|");
        for entry in self.bundle.git.risk.iter().take(TABLE_CAP) {
            let _ = writeln!(self.out, "| `{}` | {:.2} |", entry.relative_path, entry.score);
        }
    }

    fn coupling(&mut self) {
        if !self.on("coupling") || self.bundle.git.coupling.is_empty() {
            return;
        }
        self.heading("Change Coupling");
        let _ = writeln!(self.out, "Files that change together.\n");
        let _ = writeln!(self.out, "| Pair | Co-commits |");
        let _ = writeln!(self.out, "|---|---|");
        for pair in self.bundle.git.coupling.iter().take(TABLE_CAP) {
            let _ = writeln!(
                self.out,
                "| `{}` + `{}` | {} |",
                pair.a, pair.b, pair.count
            );
        }
    }

    fn freshness(&mut self) {
        if !self.on("freshness") || self.bundle.git.freshness.is_empty() {
            return;
        }
        let mut counts: std::collections::BTreeMap<&str, usize> = Default::default();
        for entry in &self.bundle.git.freshness {
            *counts.entry(entry.category.as_str()).or_insert(0) += 1;
        }
        self.heading("Freshness");
        let _ = writeln!(self.out, "| Category | Files |");
        let _ = writeln!(self.out, "|---|---|");
        for (category, count) in counts {
            let _ = writeln!(self.out, "| {category} | {count} |");
        }
    }

    fn side_effects(&mut self) {
        if !self.on("side_effects") || self.bundle.side_effects.by_category.is_empty() {
            return;
        }
        self.heading("Side Effects");
        let _ = writeln!(self.out, "| Category | Call sites |");
        let _ = writeln!(self.out, "|---|---|");
        for (category, count) in &self.bundle.side_effects.by_category {
            let _ = writeln!(self.out, "| {category} | {count} |");
        }
    }

    fn side_effects_detail(&mut self) {
        if !self.on("side_effects_detail") || self.bundle.side_effects.effects.is_empty() {
            return;
        }
        self.heading("Side Effect Sites");
        let _ = writeln!(self.out, "| Callee | Category | Location |");
        let _ = writeln!(self.out, "|---|---|---|");
        for effect in self.bundle.side_effects.effects.iter().take(DETAIL_CAP) {
            let _ = writeln!(
                self.out,
                "| `{}` | {} | `{}:{}` |",
                effect.callee,
                effect.category.as_str(),
                effect.file,
                effect.line
            );
        }
    }

    fn tech_debt_markers(&mut self) {
        if !self.on("tech_debt_markers") || self.bundle.tech_debt.markers.is_empty() {
            return;
        }
        self.heading("Tech Debt Markers");
        let counts: Vec<String> = self
            .bundle
            .tech_debt
            .counts
            .iter()
            .map(|(marker, count)| format!("{marker}: {count}"))
            .collect();
        let _ = writeln!(self.out, "{}\n", counts.join(", "));
        for marker in self.bundle.tech_debt.markers.iter().take(DETAIL_CAP) {
            let _ = writeln!(
                self.out,
                "- `{}:{}` {} {}",
                marker.file,
                marker.line,
                marker.marker.as_str(),
                marker.text
            );
        }
    }

    fn verify_imports(&mut self) {
        if !self.on("verify_imports") || self.bundle.gaps.pillars.is_empty() {
            return;
        }
        self.heading("Verify Imports");
        let _ = writeln!(self.out, "```bash");
        for pillar in self.bundle.gaps.pillars.iter().take(5) {
            let _ = writeln!(self.out, "python -c \"import {}\"", pillar.module);
        }
        let _ = writeln!(self.out, "```");
    }

    fn signatures(&mut self) {
        if !self.on("signatures") {
            return;
        }
        let hub_modules: std::collections::BTreeSet<&str> = self
            .bundle
            .import_graph
            .hubs
            .iter()
            .take(5)
            .map(|h| h.module.as_str())
            .collect();
        let mut blocks = Vec::new();
        for module in &self.bundle.modules {
            if !hub_modules.contains(module.module.as_str()) {
                continue;
            }
            let functions: Vec<String> = module
                .functions
                .iter()
                .filter(|f| !f.is_nested)
                .map(skeleton::render_function)
                .collect();
            if !functions.is_empty() {
                blocks.push((module.relative_path.clone(), functions));
            }
        }
        if blocks.is_empty() {
            return;
        }
        self.heading("Hub Signatures");
        for (path, functions) in blocks {
            let _ = writeln!(self.out, "`{path}`:\n");
            let _ = writeln!(self.out, "```python\n{}```", functions.join(""));
        }
    }

    fn state_mutations(&mut self) {
        if !self.on("state_mutations") {
            return;
        }
        let rows: Vec<_> = self
            .bundle
            .complexity
            .logic_maps
            .iter()
            .filter(|m| !m.state_mutations.is_empty())
            .collect();
        if rows.is_empty() {
            return;
        }
        self.heading("State Mutations");
        for map in rows {
            let targets: Vec<String> = map
                .state_mutations
                .iter()
                .map(|t| format!("`self.{t}`"))
                .collect();
            let _ = writeln!(self.out, "- `{}` writes {}", map.function, targets.join(", "));
        }
    }

    fn verify_commands(&mut self) {
        if !self.on("verify_commands") {
            return;
        }
        self.heading("Verify Commands");
        let _ = writeln!(self.out, "```bash");
        if self.bundle.test_coverage.test_files > 0 {
            let _ = writeln!(self.out, "python -m pytest -q");
        }
        if self.bundle.gaps.linter_rules.source.is_some() {
            let _ = writeln!(self.out, "ruff check .");
        }
        let _ = writeln!(self.out, "python -m compileall -q .");
        let _ = writeln!(self.out, "```");
    }

    fn environment_variables(&mut self) {
        if !self.on("environment_variables") || self.bundle.gaps.env_vars.is_empty() {
            return;
        }
        self.heading("Environment Variables");
        let _ = writeln!(self.out, "| Variable | Required | Default | Read at |");
        let _ = writeln!(self.out, "|---|---|---|---|");
        for variable in self.bundle.gaps.env_vars.iter().take(DETAIL_CAP) {
            let _ = writeln!(
                self.out,
                "| `{}` | {} | `{}` | `{}:{}` |",
                variable.name,
                if variable.required { "yes" } else { "no" },
                variable.default.as_deref().unwrap_or("-"),
                variable.file,
                variable.line
            );
        }
    }

    fn test_coverage(&mut self) {
        if !self.on("test_coverage") {
            return;
        }
        let coverage = &self.bundle.test_coverage;
        if coverage.test_files == 0 {
            return;
        }
        self.heading("Test Coverage Shape");
        let _ = writeln!(
            self.out,
            "{} test files, {} test functions.",
            coverage.test_files, coverage.test_functions
        );
        if !coverage.by_category.is_empty() {
            let categories: Vec<String> = coverage
                .by_category
                .iter()
                .map(|(category, count)| format!("{category}: {count}"))
                .collect();
            let _ = writeln!(self.out, "\nBy category: {}", categories.join(", "));
        }
        if !coverage.fixtures.is_empty() {
            let _ = writeln!(self.out, "\nFixtures: {}", coverage.fixtures.join(", "));
        }
        if !coverage.untested_dirs.is_empty() {
            let _ = writeln!(
                self.out,
                "\nSource dirs without tests: {}",
                coverage.untested_dirs.join(", ")
            );
        }
    }
}

fn code_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|i| format!("`{i}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{Preset, SectionMap};
    use std::fs;
    use tempfile::TempDir;

    async fn bundle_for(temp: &TempDir, sections: SectionMap) -> AnalysisBundle {
        crate::services::orchestrator::analyze(temp.path(), sections)
            .await
            .unwrap()
    }

    fn seed_tree(temp: &TempDir) {
        fs::create_dir_all(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg/__init__.py"), "").unwrap();
        fs::write(
            temp.path().join("pkg/core.py"),
            "import os\n\n\ndef run(x):\n    if x:\n        return 1\n    elif x is None:\n        return 2\n    if x == 3:\n        return 3\n    return 0\n",
        )
        .unwrap();
        fs::write(
            temp.path().join("main.py"),
            "from pkg import core\n\nif __name__ == \"__main__\":\n    core.run(1)\n",
        )
        .unwrap();
    }

    #[tokio::test]
    async fn full_report_contains_major_sections() {
        let temp = TempDir::new().unwrap();
        seed_tree(&temp);
        let bundle = bundle_for(&temp, SectionMap::preset(Preset::Full)).await;
        let report = render(&bundle);
        assert!(report.starts_with("# Repository X-Ray"));
        assert!(report.contains("## Module Graph"));
        assert!(report.contains("```mermaid"));
        assert!(report.contains("## Complexity Hotspots"));
        assert!(report.contains("## Entry Points"));
        assert!(report.contains("## Logic Maps"));
    }

    #[tokio::test]
    async fn disabled_sections_do_not_render() {
        let temp = TempDir::new().unwrap();
        seed_tree(&temp);
        let mut sections = SectionMap::preset(Preset::Full);
        sections.disable("mermaid");
        sections.disable("logic_maps");
        let bundle = bundle_for(&temp, sections).await;
        let report = render(&bundle);
        assert!(!report.contains("## Module Graph"));
        assert!(!report.contains("## Logic Maps"));
        assert!(report.contains("## Complexity Hotspots"));
    }

    #[tokio::test]
    async fn minimal_preset_is_compact() {
        let temp = TempDir::new().unwrap();
        seed_tree(&temp);
        let bundle = bundle_for(&temp, SectionMap::preset(Preset::Minimal)).await;
        let report = render(&bundle);
        assert!(report.contains("# Repository X-Ray"));
        assert!(report.contains("## Overview"));
        assert!(!report.contains("## Complexity Hotspots"));
        assert!(!report.contains("## Change Risk"));
    }
}
