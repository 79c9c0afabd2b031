use crate::models::coverage::TestCoverageReport;
use crate::services::file_discovery::DiscoveredFile;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

/// Directories treated as test roots.
const TEST_ROOTS: &[&str] = &["tests", "test", "testing"];

lazy_static! {
    static ref TEST_DEF_RE: Regex = Regex::new(r"(?m)^\s*def\s+test_\w+").expect("test def regex");
    static ref FIXTURE_RE: Regex =
        Regex::new(r"@pytest\.fixture[^\n]*\s*\n\s*def\s+(\w+)").expect("fixture regex");
}

/// Enumerate the test tree: counts, categories, fixtures, and which source
/// directories have any test presence.
pub fn analyze(files: &[DiscoveredFile]) -> TestCoverageReport {
    let mut report = TestCoverageReport::default();
    let mut fixtures: BTreeSet<String> = BTreeSet::new();
    let mut test_stems: BTreeSet<String> = BTreeSet::new();
    let mut test_subdirs: BTreeSet<String> = BTreeSet::new();

    for file in files {
        let relative = &file.record.relative_path;
        let mut parts = relative.split('/');
        let first = parts.next().unwrap_or("");

        if file_name_of(relative) == "conftest.py" {
            if let Some(source) = &file.source {
                for captures in FIXTURE_RE.captures_iter(source) {
                    fixtures.insert(captures[1].to_string());
                }
            }
        }

        if !TEST_ROOTS.contains(&first) {
            continue;
        }
        report.test_files += 1;

        let rest: Vec<&str> = parts.collect();
        let category = if rest.len() > 1 { rest[0] } else { "root" };
        *report.by_category.entry(category.to_string()).or_insert(0) += 1;
        if rest.len() > 1 {
            test_subdirs.insert(rest[0].to_string());
        }

        if let Some(source) = &file.source {
            report.test_functions += TEST_DEF_RE.find_iter(source).count();
        }

        let stem = file_name_of(relative).trim_end_matches(".py");
        if let Some(bare) = stem.strip_prefix("test_") {
            test_stems.insert(bare.to_string());
        } else if let Some(bare) = stem.strip_suffix("_test") {
            test_stems.insert(bare.to_string());
        }
    }

    report.fixtures = fixtures.into_iter().collect();

    // Source dirs: top-level directories holding Python files outside the
    // test roots. A dir counts as tested when a test subdirectory carries its
    // name or some test file stem matches it or a module inside it.
    let mut source_dirs: BTreeSet<String> = BTreeSet::new();
    let mut modules_by_dir: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for file in files {
        let relative = &file.record.relative_path;
        let mut parts = relative.split('/');
        let first = parts.next().unwrap_or("");
        if parts.next().is_none() || TEST_ROOTS.contains(&first) {
            continue;
        }
        source_dirs.insert(first.to_string());
        let stem = file_name_of(relative).trim_end_matches(".py");
        modules_by_dir
            .entry(first.to_string())
            .or_default()
            .insert(stem.to_string());
    }

    for dir in source_dirs {
        let modules = modules_by_dir.get(&dir);
        let tested = test_subdirs.contains(&dir)
            || test_stems.contains(&dir)
            || modules
                .map(|m| m.iter().any(|module| test_stems.contains(module)))
                .unwrap_or(false);
        if tested {
            report.tested_dirs.push(dir);
        } else {
            report.untested_dirs.push(dir);
        }
    }

    report
}

fn file_name_of(relative: &str) -> &str {
    relative.rsplit('/').next().unwrap_or(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file::{FileRecord, ModulePath, ParseStatus};
    use std::path::PathBuf;

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

    #[test]
    fn counts_files_functions_and_categories() {
        let files = vec![
            discovered("tests/unit/test_parser.py", "def test_one():\n    pass\n\ndef test_two():\n    pass\n"),
            discovered("tests/integration/test_flow.py", "def test_flow():\n    pass\n"),
            discovered("tests/test_smoke.py", "def test_smoke():\n    pass\n"),
            discovered("app/parser.py", "def parse():\n    pass\n"),
        ];
        let report = analyze(&files);
        assert_eq!(report.test_files, 3);
        assert_eq!(report.test_functions, 4);
        assert_eq!(report.by_category["unit"], 1);
        assert_eq!(report.by_category["integration"], 1);
        assert_eq!(report.by_category["root"], 1);
    }

    #[test]
    fn fixtures_come_from_conftest() {
        let files = vec![discovered(
            "tests/conftest.py",
            "import pytest\n\n@pytest.fixture\ndef db():\n    yield None\n\n@pytest.fixture(scope=\"session\")\ndef client():\n    yield None\n",
        )];
        let report = analyze(&files);
        assert_eq!(report.fixtures, vec!["client".to_string(), "db".to_string()]);
    }

    #[test]
    fn tested_and_untested_dirs_split() {
        let files = vec![
            discovered("app/parser.py", ""),
            discovered("orphaned/util.py", ""),
            discovered("tests/test_parser.py", "def test_parse():\n    pass\n"),
        ];
        let report = analyze(&files);
        assert_eq!(report.tested_dirs, vec!["app".to_string()]);
        assert_eq!(report.untested_dirs, vec!["orphaned".to_string()]);
    }
}
