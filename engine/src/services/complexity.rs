use crate::models::analysis::{AnnotationTally, FileAnalysis};
use crate::models::bundle::ComplexityReport;
use crate::models::logic::{HotspotEntry, LogicMap};

#[derive(Debug, Clone)]
pub struct ComplexityConfig {
    /// Functions above this cyclomatic value are hotspots.
    pub min_complexity: u32,
    /// How many hotspots keep their logic map.
    pub logic_map_count: usize,
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            min_complexity: 3,
            logic_map_count: 5,
        }
    }
}

/// Rank hotspot functions and pick the logic maps for the top N.
pub fn build(analyses: &[FileAnalysis], config: &ComplexityConfig) -> ComplexityReport {
    let mut hotspots: Vec<HotspotEntry> = Vec::new();
    let mut tally = AnnotationTally::default();

    for analysis in analyses {
        tally.merge(&analysis.annotations);
        for function in &analysis.functions {
            if function.complexity > config.min_complexity {
                hotspots.push(HotspotEntry {
                    module: analysis.module.clone(),
                    function: function.name.clone(),
                    line: function.line,
                    complexity: function.complexity,
                });
            }
        }
        for class in &analysis.classes {
            for method in &class.methods {
                if method.complexity > config.min_complexity {
                    hotspots.push(HotspotEntry {
                        module: analysis.module.clone(),
                        function: format!("{}.{}", class.name, method.name),
                        line: method.line,
                        complexity: method.complexity,
                    });
                }
            }
        }
    }
    sort_ranked(&mut hotspots);

    let mut logic_maps: Vec<LogicMap> = analyses
        .iter()
        .flat_map(|a| a.logic_candidates.iter().cloned())
        .collect();
    logic_maps.sort_by(|a, b| {
        (b.complexity, a.module.as_str(), &a.function)
            .cmp(&(a.complexity, b.module.as_str(), &b.function))
    });
    logic_maps.truncate(config.logic_map_count);

    ComplexityReport {
        hotspots,
        logic_maps,
        annotation_coverage: tally.coverage(),
    }
}

fn sort_ranked(hotspots: &mut [HotspotEntry]) {
    hotspots.sort_by(|a, b| {
        (b.complexity, a.module.as_str(), &a.function)
            .cmp(&(a.complexity, b.module.as_str(), &b.function))
    });
}
