use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical section keys, in report order.
pub const SECTION_KEYS: &[&str] = &[
    "summary",
    "prose",
    "mermaid",
    "architectural_pillars",
    "maintenance_hotspots",
    "complexity_hotspots",
    "critical_classes",
    "data_models",
    "logic_maps",
    "hazards",
    "entry_points",
    "explain",
    "persona_map",
    "github_about",
    "data_flow",
    "cli_arguments",
    "instance_vars",
    "pydantic_validators",
    "hazard_patterns",
    "env_defaults",
    "test_example",
    "linter_rules",
    "import_analysis",
    "layer_details",
    "git_risk",
    "coupling",
    "freshness",
    "side_effects",
    "side_effects_detail",
    "tech_debt_markers",
    "verify_imports",
    "signatures",
    "state_mutations",
    "verify_commands",
    "environment_variables",
    "test_coverage",
];

/// Sections enabled by the `minimal` preset.
const MINIMAL_KEYS: &[&str] = &["summary", "prose", "architectural_pillars", "hazards"];

/// Sections the `full` preset adds on top of `standard`.
const FULL_ONLY_KEYS: &[&str] = &[
    "explain",
    "persona_map",
    "github_about",
    "data_flow",
    "hazard_patterns",
    "side_effects_detail",
    "verify_imports",
    "state_mutations",
    "verify_commands",
];

/// Per-section switch, optionally carrying a count or threshold override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionToggle {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

impl SectionToggle {
    pub fn on() -> Self {
        Self {
            enabled: true,
            count: None,
            threshold: None,
        }
    }

    pub fn off() -> Self {
        Self {
            enabled: false,
            count: None,
            threshold: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Minimal,
    Standard,
    Full,
}

/// The effective section-enable map.
///
/// Built by layering defaults <- preset <- user config <- CLI flags, later
/// entries overriding earlier. Unknown keys never enter the map; callers
/// surface them as warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMap {
    sections: BTreeMap<String, SectionToggle>,
}

impl SectionMap {
    /// Defaults are the `standard` preset.
    pub fn defaults() -> Self {
        Self::preset(Preset::Standard)
    }

    pub fn preset(preset: Preset) -> Self {
        let mut sections = BTreeMap::new();
        for key in SECTION_KEYS {
            let enabled = match preset {
                Preset::Minimal => MINIMAL_KEYS.contains(key),
                Preset::Standard => !FULL_ONLY_KEYS.contains(key),
                Preset::Full => true,
            };
            sections.insert(
                key.to_string(),
                if enabled {
                    SectionToggle::on()
                } else {
                    SectionToggle::off()
                },
            );
        }
        Self { sections }
    }

    pub fn is_known(key: &str) -> bool {
        SECTION_KEYS.contains(&key)
    }

    /// Overlay one toggle. Returns false (and changes nothing) for unknown keys.
    pub fn set(&mut self, key: &str, toggle: SectionToggle) -> bool {
        if !Self::is_known(key) {
            return false;
        }
        self.sections.insert(key.to_string(), toggle);
        true
    }

    pub fn disable(&mut self, key: &str) -> bool {
        if !Self::is_known(key) {
            return false;
        }
        let entry = self.sections.entry(key.to_string()).or_insert_with(SectionToggle::off);
        entry.enabled = false;
        true
    }

    pub fn enabled(&self, key: &str) -> bool {
        self.sections.get(key).map(|t| t.enabled).unwrap_or(false)
    }

    /// Count override for a section, or the supplied default.
    pub fn count(&self, key: &str, default: usize) -> usize {
        self.sections
            .get(key)
            .and_then(|t| t.count)
            .unwrap_or(default)
    }

    pub fn threshold(&self, key: &str, default: usize) -> usize {
        self.sections
            .get(key)
            .and_then(|t| t.threshold)
            .unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionToggle)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for SectionMap {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_preset_enables_everything() {
        let map = SectionMap::preset(Preset::Full);
        for key in SECTION_KEYS {
            assert!(map.enabled(key), "{key} should be on under full");
        }
    }

    #[test]
    fn minimal_preset_is_sparse() {
        let map = SectionMap::preset(Preset::Minimal);
        assert!(map.enabled("summary"));
        assert!(map.enabled("hazards"));
        assert!(!map.enabled("git_risk"));
        assert!(!map.enabled("logic_maps"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut map = SectionMap::defaults();
        assert!(!map.set("no_such_section", SectionToggle::on()));
        assert!(!map.enabled("no_such_section"));
    }

    #[test]
    fn count_override_layers_over_default() {
        let mut map = SectionMap::defaults();
        assert_eq!(map.count("logic_maps", 5), 5);
        map.set(
            "logic_maps",
            SectionToggle {
                enabled: true,
                count: Some(2),
                threshold: None,
            },
        );
        assert_eq!(map.count("logic_maps", 5), 2);
    }

    #[test]
    fn disable_keeps_other_sections() {
        let mut map = SectionMap::preset(Preset::Full);
        assert!(map.disable("coupling"));
        assert!(!map.enabled("coupling"));
        assert!(map.enabled("freshness"));
    }
}
