use crate::models::bundle::{AnalysisBundle, BundleMetadata};
use crate::models::config::SectionMap;
use crate::models::error::XrayError;
use crate::services::ast_analyzer::{self, AstConfig};
use crate::services::call_graph;
use crate::services::complexity::{self, ComplexityConfig};
use crate::services::file_discovery::{DiscoveredFile, DiscoveryConfig, FileDiscovery};
use crate::services::gap_features::{self, GapConfig};
use crate::services::git_analysis::{GitAnalysisService, GitConfig};
use crate::services::import_graph::{self, GraphConfig};
use crate::services::side_effects;
use crate::services::tech_debt;
use crate::services::test_coverage;
use chrono::Utc;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Per-component settings, seeded from the section map's count/threshold
/// overrides. Tests may construct any component config directly; nothing here
/// is process-global.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub sections: SectionMap,
    pub discovery: DiscoveryConfig,
    pub ast: AstConfig,
    pub graph: GraphConfig,
    pub complexity: ComplexityConfig,
    pub git: GitConfig,
    pub gaps: GapConfig,
}

impl AnalysisConfig {
    pub fn from_sections(sections: SectionMap) -> Self {
        let mut config = AnalysisConfig::default();

        let logic_count = sections.count("logic_maps", config.complexity.logic_map_count);
        config.ast.logic.top_n = logic_count;
        config.complexity.logic_map_count = logic_count;

        let hotspot_threshold =
            sections.threshold("complexity_hotspots", config.complexity.min_complexity as usize);
        config.complexity.min_complexity = hotspot_threshold as u32;
        config.ast.logic.min_complexity = hotspot_threshold as u32;

        config.gaps.hazard_token_threshold =
            sections.threshold("hazards", config.gaps.hazard_token_threshold);
        config.gaps.pillar_count =
            sections.count("architectural_pillars", config.gaps.pillar_count);
        config.gaps.maintenance_count =
            sections.count("maintenance_hotspots", config.gaps.maintenance_count);
        config.git.coupling_min_count =
            sections.threshold("coupling", config.git.coupling_min_count);

        config.sections = sections;
        config
    }
}

/// The function-level contract of the engine: analyze a target tree under a
/// section map and hand back the immutable result bundle.
pub async fn analyze(target: &Path, sections: SectionMap) -> Result<AnalysisBundle, XrayError> {
    let config = AnalysisConfig::from_sections(sections);
    analyze_with_config(target, &config).await
}

pub async fn analyze_with_config(
    target: &Path,
    config: &AnalysisConfig,
) -> Result<AnalysisBundle, XrayError> {
    let started = std::time::Instant::now();
    let target = target
        .canonicalize()
        .map_err(|_| XrayError::InvalidTarget {
            path: target.to_path_buf(),
        })?;
    if !target.is_dir() {
        return Err(XrayError::InvalidTarget { path: target });
    }

    info!("analyzing {}", target.display());

    let discovered = FileDiscovery::new(target.clone())
        .with_config(config.discovery.clone())
        .discover()?;
    debug!("discovered {} files", discovered.len());

    // Per-file parsing and analysis is embarrassingly parallel; nothing below
    // this fan-out shares state across files.
    let mut per_file: Vec<(DiscoveredFile, crate::models::analysis::FileAnalysis)> = discovered
        .into_par_iter()
        .map(|file| {
            let source = file.source;
            let (record, analysis) =
                ast_analyzer::analyze_file(file.record, source.as_deref(), &config.ast);
            (DiscoveredFile { record, source }, analysis)
        })
        .collect();

    // Aggregation sorts by absolute path so parallel runs stay reproducible.
    per_file.sort_by(|a, b| a.0.record.path.cmp(&b.0.record.path));
    let (discovered, analyses): (Vec<DiscoveredFile>, Vec<_>) = per_file.into_iter().unzip();

    let files: Vec<_> = discovered.iter().map(|f| f.record.clone()).collect();

    let import_graph = import_graph::build(&files, &analyses, &config.graph);
    let call_graph = call_graph::build(&analyses, &import_graph);
    let side_effects = side_effects::detect(&analyses);
    let complexity = complexity::build(&analyses, &config.complexity);
    let test_coverage = test_coverage::analyze(&discovered);
    let tech_debt = tech_debt::scan(&discovered);

    let git = GitAnalysisService::analyze(&target, &config.git).await;

    let gaps = gap_features::build(&discovered, &analyses, &import_graph, &git, &target, &config.gaps);

    let parse_failures = AnalysisBundle::parse_failures(&files);
    let mut warnings: Vec<String> = git.warnings.clone();
    if parse_failures > 0 {
        warnings.push(format!("parse failed for {parse_failures} files"));
    }

    let metadata = BundleMetadata {
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        target: target.clone(),
        total_files: files.len(),
        total_lines: files.iter().map(|f| f.lines).sum(),
        total_token_estimate: files.iter().map(|f| f.token_estimate).sum(),
        parse_failures,
    };

    info!(
        "analysis complete: {} files in {:?}",
        metadata.total_files,
        started.elapsed()
    );

    Ok(AnalysisBundle {
        metadata,
        sections: config.sections.clone(),
        files,
        modules: analyses,
        import_graph,
        call_graph,
        side_effects,
        complexity,
        git,
        gaps,
        test_coverage,
        tech_debt,
        warnings,
    })
}
