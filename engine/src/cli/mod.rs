use crate::models::config::{Preset, SectionMap, SectionToggle, SECTION_KEYS};
use crate::models::error::XrayError;
use crate::services::orchestrator;
use crate::services::renderer::{self, markdown, OutputFormat};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// Static-analysis x-ray for Python source trees.
///
/// Produces a compact report guiding an AI assistant's first read of a
/// repository: structure, architecture, history, complexity, and hazards.
#[derive(Debug, Parser)]
#[command(name = "pyxray", version, about)]
pub struct Cli {
    /// Target directory to analyze.
    pub path: Option<PathBuf>,

    /// Section preset to start from.
    #[arg(long, value_enum, default_value = "standard")]
    pub preset: Preset,

    /// TOML config file with a [sections] table, merged over the preset.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Disable one section (repeatable). `--no-mermaid` works as shorthand.
    #[arg(long = "no", value_name = "SECTION")]
    pub no: Vec<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "markdown")]
    pub output: OutputFormat,

    /// Write `<prefix>.md` / `<prefix>.json` instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Progress to stderr.
    #[arg(long, short)]
    pub verbose: bool,

    /// Print a default config template and exit.
    #[arg(long)]
    pub init_config: bool,
}

impl Cli {
    /// Parse argv, rewriting the `--no-<section>` shorthand into
    /// `--no <section>` so clap sees a uniform surface.
    pub fn parse_args() -> Result<Self, clap::Error> {
        let args = std::env::args().flat_map(|arg| {
            match arg.strip_prefix("--no-") {
                Some(key) if SectionMap::is_known(key) => {
                    vec!["--no".to_string(), key.to_string()]
                }
                _ => vec![arg],
            }
        });
        Cli::try_parse_from(args)
    }
}

/// Run the CLI to completion and hand back the process exit code.
pub async fn run(cli: Cli) -> i32 {
    if cli.init_config {
        print!("{}", config_template());
        return 0;
    }

    let Some(path) = cli.path.clone() else {
        eprintln!("error: a target directory is required");
        return 1;
    };

    let sections = match build_section_map(&cli) {
        Ok(sections) => sections,
        Err(e) => {
            eprintln!("error: {e}");
            return e.exit_code();
        }
    };

    let bundle = match orchestrator::analyze(&path, sections).await {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("error: {e}");
            return e.exit_code();
        }
    };

    match emit(&cli, &bundle) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}

/// Effective map: defaults <- preset <- config file <- CLI disables.
fn build_section_map(cli: &Cli) -> Result<SectionMap, XrayError> {
    let mut sections = SectionMap::preset(cli.preset);

    if let Some(config_path) = &cli.config {
        for (key, toggle) in load_config_file(config_path)? {
            if !sections.set(&key, toggle) {
                warn!("unknown section key in config: {key}");
                eprintln!("warning: unknown section key ignored: {key}");
            }
        }
    }

    for key in &cli.no {
        if !sections.disable(key) {
            warn!("unknown section in --no flag: {key}");
            eprintln!("warning: unknown section ignored: --no-{key}");
        }
    }
    Ok(sections)
}

fn load_config_file(path: &PathBuf) -> Result<Vec<(String, SectionToggle)>, XrayError> {
    let text = std::fs::read_to_string(path).map_err(|e| XrayError::ConfigInvalid {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let doc: toml::Table = text.parse().map_err(|e: toml::de::Error| {
        XrayError::ConfigInvalid {
            path: path.clone(),
            reason: e.to_string(),
        }
    })?;

    let Some(sections) = doc.get("sections").and_then(|s| s.as_table()) else {
        return Ok(Vec::new());
    };

    let mut toggles = Vec::new();
    for (key, value) in sections {
        let toggle = match value {
            toml::Value::Boolean(enabled) => SectionToggle {
                enabled: *enabled,
                count: None,
                threshold: None,
            },
            toml::Value::Table(table) => SectionToggle {
                enabled: table
                    .get("enabled")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true),
                count: table
                    .get("count")
                    .and_then(|v| v.as_integer())
                    .map(|v| v as usize),
                threshold: table
                    .get("threshold")
                    .and_then(|v| v.as_integer())
                    .map(|v| v as usize),
            },
            other => {
                return Err(XrayError::ConfigInvalid {
                    path: path.clone(),
                    reason: format!("section `{key}` must be a bool or a table, got {other}"),
                })
            }
        };
        toggles.push((key.clone(), toggle));
    }
    Ok(toggles)
}

fn emit(cli: &Cli, bundle: &crate::models::bundle::AnalysisBundle) -> Result<(), XrayError> {
    let wants_markdown = matches!(cli.output, OutputFormat::Markdown | OutputFormat::Both);
    let wants_json = matches!(cli.output, OutputFormat::Json | OutputFormat::Both);

    match &cli.out {
        Some(prefix) => {
            if wants_markdown {
                let path = prefix.with_extension("md");
                std::fs::write(&path, markdown::render(bundle))?;
                eprintln!("wrote {}", path.display());
            }
            if wants_json {
                let path = prefix.with_extension("json");
                std::fs::write(&path, renderer::render_json(bundle)?)?;
                eprintln!("wrote {}", path.display());
            }
        }
        None => {
            if wants_markdown {
                print!("{}", markdown::render(bundle));
            }
            if wants_json {
                if wants_markdown {
                    eprintln!("warning: pass --out to write both formats; printing JSON last");
                }
                println!("{}", renderer::render_json(bundle)?);
            }
        }
    }
    Ok(())
}

fn config_template() -> String {
    let mut out = String::from(
        "# pyxray configuration\n\
         #\n\
         # Each key under [sections] is a section name; values are either a\n\
         # boolean or a table { enabled = true, count = 5, threshold = 10000 }.\n\
         # Unknown keys are ignored with a warning.\n\n[sections]\n",
    );
    for key in SECTION_KEYS {
        out.push_str(&format!("# {key} = true\n"));
    }
    out.push_str("\n# Examples:\n# logic_maps = { enabled = true, count = 5 }\n# hazards = { enabled = true, threshold = 10000 }\n# coupling = false\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn config_template_lists_every_section() {
        let template = config_template();
        for key in SECTION_KEYS {
            assert!(template.contains(key), "{key} missing from template");
        }
    }

    #[test]
    fn config_file_bool_and_table_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("xray.toml");
        fs::write(
            &path,
            "[sections]\ncoupling = false\nlogic_maps = { enabled = true, count = 2 }\n",
        )
        .unwrap();
        let toggles = load_config_file(&path).unwrap();
        assert_eq!(toggles.len(), 2);
        let coupling = toggles.iter().find(|(k, _)| k == "coupling").unwrap();
        assert!(!coupling.1.enabled);
        let logic = toggles.iter().find(|(k, _)| k == "logic_maps").unwrap();
        assert_eq!(logic.1.count, Some(2));
    }

    #[test]
    fn malformed_config_is_fatal_with_exit_one() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        fs::write(&path, "sections = \"oops").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn effective_map_layers_preset_config_flags() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("xray.toml");
        fs::write(&config_path, "[sections]\npersona_map = true\nmermaid = true\n").unwrap();
        let cli = Cli {
            path: Some(PathBuf::from(".")),
            preset: Preset::Minimal,
            config: Some(config_path),
            no: vec!["mermaid".to_string()],
            output: OutputFormat::Markdown,
            out: None,
            verbose: false,
            init_config: false,
        };
        let sections = build_section_map(&cli).unwrap();
        // minimal preset base
        assert!(sections.enabled("summary"));
        assert!(!sections.enabled("git_risk"));
        // config file addition survives
        assert!(sections.enabled("persona_map"));
        // CLI flag wins last
        assert!(!sections.enabled("mermaid"));
    }
}
