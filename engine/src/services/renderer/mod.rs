pub mod markdown;
pub mod mermaid;
pub mod skeleton;

use crate::models::bundle::AnalysisBundle;
use crate::models::error::XrayError;

/// Output formats the front-end can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Json,
    Both,
}

/// Pretty JSON of the whole bundle; struct field order and sorted collections
/// keep re-runs byte-identical.
pub fn render_json(bundle: &AnalysisBundle) -> Result<String, XrayError> {
    Ok(serde_json::to_string_pretty(bundle)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::SectionMap;

    #[tokio::test]
    async fn json_round_trips() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("m.py"), "x = 1\n").unwrap();
        let bundle = crate::services::orchestrator::analyze(temp.path(), SectionMap::defaults())
            .await
            .unwrap();
        let json = render_json(&bundle).unwrap();
        let parsed: AnalysisBundle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.files.len(), 1);
    }
}
