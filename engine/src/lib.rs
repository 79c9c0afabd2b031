//! pyxray: static-analysis x-ray for Python source trees.
//!
//! One run walks a target directory, parses every Python file exactly once,
//! derives the import graph, call graph, complexity hotspots, logic maps,
//! side effects, git-history analytics, and gap features, and assembles them
//! into a single immutable [`models::bundle::AnalysisBundle`].

pub mod cli;
pub mod models;
pub mod services;
pub mod utils;

// Public surface for embedding the engine without the CLI.
pub use models::bundle::AnalysisBundle;
pub use models::config::{Preset, SectionMap};
pub use models::error::XrayError;
pub use services::orchestrator::{analyze, analyze_with_config, AnalysisConfig};
