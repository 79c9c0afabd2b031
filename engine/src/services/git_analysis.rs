use crate::models::git::{
    CouplingPair, FreshnessCategory, FreshnessEntry, GitFileStats, GitReport, RiskEntry,
};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

/// Subject keywords that mark a commit as a hotfix, matched lowercased.
const HOTFIX_KEYWORDS: &[&str] = &[
    "fix",
    "bug",
    "urgent",
    "revert",
    "hotfix",
    "patch",
    "emergency",
];

const COMMIT_MARKER: &str = "COMMIT::";

#[derive(Debug, Clone)]
pub struct GitConfig {
    /// Risk window in months.
    pub window_months: u32,
    /// Number of recent commits sampled for coupling.
    pub coupling_commits: usize,
    /// Commits touching more than this many files are skipped for coupling.
    pub coupling_max_files: usize,
    /// Minimum co-change count for a reported pair.
    pub coupling_min_count: usize,
    /// Risk scores at or below this are not surfaced.
    pub risk_threshold: f64,
    /// Wall-clock bound for each git invocation.
    pub timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            window_months: 6,
            coupling_commits: 200,
            coupling_max_files: 20,
            coupling_min_count: 3,
            risk_threshold: 0.1,
            timeout_secs: 60,
        }
    }
}

pub struct GitAnalysisService;

impl GitAnalysisService {
    /// Run the three history passes. Every failure mode is soft: the report
    /// comes back empty with a warning and downstream consumers treat git
    /// data as optional.
    pub async fn analyze(project_path: &Path, config: &GitConfig) -> GitReport {
        let mut report = GitReport {
            window_months: config.window_months,
            ..GitReport::default()
        };

        if !project_path.join(".git").exists() {
            report
                .warnings
                .push("target is not a git repository; history sections are empty".to_string());
            return report;
        }

        info!(
            "analyzing git history (window: {} months)",
            config.window_months
        );

        let since = format!("{} months ago", config.window_months);
        let risk_args = [
            "log",
            "--since",
            since.as_str(),
            "--name-only",
            "--format=COMMIT::%an::%s",
        ];
        let count = config.coupling_commits.to_string();
        let coupling_args = ["log", "-n", count.as_str(), "--name-only", "--format=COMMIT"];
        let freshness_args = ["log", "--name-only", "--format=COMMIT::%ct"];

        let risk_log = Self::run_git(project_path, &risk_args, config, &mut report.warnings).await;
        let coupling_log =
            Self::run_git(project_path, &coupling_args, config, &mut report.warnings).await;
        let freshness_log =
            Self::run_git(project_path, &freshness_args, config, &mut report.warnings).await;

        if risk_log.is_none() && coupling_log.is_none() && freshness_log.is_none() {
            return report;
        }
        report.available = true;

        let now = Utc::now();
        let freshness = freshness_log
            .as_deref()
            .map(|log| parse_freshness(log, now))
            .unwrap_or_default();
        let last_commits: BTreeMap<&str, DateTime<Utc>> = freshness
            .iter()
            .map(|f| (f.relative_path.as_str(), f.last_commit))
            .collect();

        if let Some(log) = risk_log.as_deref() {
            let stats = parse_risk_window(log);
            report.risk = rank_risk(&stats, config.risk_threshold);
            report.stats = stats
                .into_iter()
                .map(|(path, s)| GitFileStats {
                    last_commit: last_commits.get(path.as_str()).copied(),
                    relative_path: path,
                    commits: s.commits,
                    hotfix_commits: s.hotfixes,
                    authors: s.authors,
                })
                .collect();
        }
        if let Some(log) = coupling_log.as_deref() {
            report.coupling = parse_coupling(
                log,
                config.coupling_max_files,
                config.coupling_min_count,
            );
        }
        report.freshness = freshness;
        report
    }

    /// One read-only git invocation: argv vector, no shell, bounded by the
    /// configured wall-clock timeout, child reaped on every path.
    async fn run_git(
        project_path: &Path,
        args: &[&str],
        config: &GitConfig,
        warnings: &mut Vec<String>,
    ) -> Option<String> {
        let mut command = Command::new("git");
        command
            .args(args)
            .current_dir(project_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(Duration::from_secs(config.timeout_secs), command.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("git unavailable: {e}");
                warnings.push(format!("git unavailable: {e}"));
                return None;
            }
            Err(_) => {
                warn!("git invocation timed out after {}s", config.timeout_secs);
                warnings.push(format!(
                    "git invocation exceeded the {}s timeout; history sections are partial",
                    config.timeout_secs
                ));
                return None;
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("does not have any commits yet") {
                return Some(String::new());
            }
            warnings.push(format!("git log failed: {}", stderr.trim()));
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Default, Clone)]
pub struct WindowStats {
    pub commits: usize,
    pub hotfixes: usize,
    pub authors: BTreeSet<String>,
}

pub fn is_hotfix_subject(subject: &str) -> bool {
    let lowered = subject.to_lowercase();
    HOTFIX_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// First pass: per-file churn, hotfix counts, and author sets in the window.
pub fn parse_risk_window(log: &str) -> BTreeMap<String, WindowStats> {
    let mut stats: BTreeMap<String, WindowStats> = BTreeMap::new();
    let mut author = String::new();
    let mut hotfix = false;

    for line in log.lines() {
        if let Some(rest) = line.strip_prefix(COMMIT_MARKER) {
            let (commit_author, subject) = rest.split_once("::").unwrap_or((rest, ""));
            author = commit_author.to_string();
            hotfix = is_hotfix_subject(subject);
        } else if !line.trim().is_empty() {
            let entry = stats.entry(line.trim().to_string()).or_default();
            entry.commits += 1;
            if hotfix {
                entry.hotfixes += 1;
            }
            if !author.is_empty() {
                entry.authors.insert(author.clone());
            }
        }
    }
    stats
}

/// Rank files by risk score, dropping everything at or under the threshold.
pub fn rank_risk(stats: &BTreeMap<String, WindowStats>, threshold: f64) -> Vec<RiskEntry> {
    let max_churn = stats.values().map(|s| s.commits).max().unwrap_or(0);
    if max_churn == 0 {
        return Vec::new();
    }
    let mut entries: Vec<RiskEntry> = stats
        .iter()
        .map(|(path, s)| RiskEntry {
            relative_path: path.clone(),
            score: RiskEntry::score(s.commits, s.hotfixes, s.authors.len(), max_churn),
            commits: s.commits,
            hotfix_commits: s.hotfixes,
            authors: s.authors.len(),
        })
        .filter(|e| e.score > threshold)
        .collect();
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.relative_path.cmp(&b.relative_path))
    });
    entries
}

/// Second pass: co-commit pairs over the sampled commits. Commits touching
/// more than `max_files` Python files are excluded entirely.
pub fn parse_coupling(log: &str, max_files: usize, min_count: usize) -> Vec<CouplingPair> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut current: BTreeSet<String> = BTreeSet::new();

    let mut flush = |commit: &mut BTreeSet<String>, counts: &mut BTreeMap<(String, String), usize>| {
        if commit.len() >= 2 && commit.len() <= max_files {
            let files: Vec<&String> = commit.iter().collect();
            for i in 0..files.len() {
                for j in (i + 1)..files.len() {
                    let key = (files[i].clone(), files[j].clone());
                    *counts.entry(key).or_insert(0) += 1;
                }
            }
        }
        commit.clear();
    };

    for line in log.lines() {
        if line.starts_with("COMMIT") {
            flush(&mut current, &mut counts);
        } else if line.trim().ends_with(".py") {
            current.insert(line.trim().to_string());
        }
    }
    flush(&mut current, &mut counts);

    let mut pairs: Vec<CouplingPair> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .map(|((a, b), count)| CouplingPair { a, b, count })
        .collect();
    pairs.sort_by(|x, y| (y.count, &x.a, &x.b).cmp(&(x.count, &y.a, &y.b)));
    pairs
}

/// Third pass: first (newest) timestamp per file, categorised by age.
pub fn parse_freshness(log: &str, now: DateTime<Utc>) -> Vec<FreshnessEntry> {
    let mut seen: BTreeMap<String, DateTime<Utc>> = BTreeMap::new();
    let mut current: Option<DateTime<Utc>> = None;

    for line in log.lines() {
        if let Some(rest) = line.strip_prefix(COMMIT_MARKER) {
            current = rest
                .trim()
                .parse::<i64>()
                .ok()
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single());
        } else if !line.trim().is_empty() {
            if let Some(ts) = current {
                seen.entry(line.trim().to_string()).or_insert(ts);
            }
        }
    }

    seen.into_iter()
        .map(|(path, last_commit)| {
            let age_days = (now - last_commit).num_days();
            FreshnessEntry {
                relative_path: path,
                last_commit,
                age_days,
                category: FreshnessCategory::from_age_days(age_days),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn hotfix_subjects_match_keyword_set() {
        assert!(is_hotfix_subject("Fix login crash"));
        assert!(is_hotfix_subject("URGENT: rollback deploy"));
        assert!(is_hotfix_subject("Revert \"feature\""));
        assert!(!is_hotfix_subject("Add churn analyzer"));
    }

    #[test]
    fn risk_window_counts_churn_hotfixes_authors() {
        let log = "COMMIT::alice::Fix crash\nsrc/a.py\nsrc/b.py\n\nCOMMIT::bob::Add feature\nsrc/a.py\n";
        let stats = parse_risk_window(log);
        let a = &stats["src/a.py"];
        assert_eq!(a.commits, 2);
        assert_eq!(a.hotfixes, 1);
        assert_eq!(a.authors.len(), 2);
        let b = &stats["src/b.py"];
        assert_eq!(b.commits, 1);
    }

    #[test]
    fn risk_reference_example_scores_088() {
        let mut stats = BTreeMap::new();
        let mut s = WindowStats::default();
        s.commits = 10;
        s.hotfixes = 6;
        s.authors = ["a".to_string(), "b".to_string()].into_iter().collect();
        stats.insert("hot.py".to_string(), s);
        let ranked = rank_risk(&stats, 0.1);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].score - 0.88).abs() < 1e-9);
    }

    #[test]
    fn risk_is_empty_when_window_has_no_commits() {
        let stats = parse_risk_window("");
        assert!(rank_risk(&stats, 0.1).is_empty());
    }

    #[test]
    fn low_scores_are_not_surfaced() {
        let mut stats = BTreeMap::new();
        let mut hot = WindowStats::default();
        hot.commits = 100;
        stats.insert("hot.py".to_string(), hot);
        let mut cold = WindowStats::default();
        cold.commits = 1;
        stats.insert("cold.py".to_string(), cold);
        let ranked = rank_risk(&stats, 0.1);
        assert!(ranked.iter().all(|e| e.score > 0.1));
        assert!(ranked.iter().any(|e| e.relative_path == "hot.py"));
        assert!(ranked.iter().all(|e| e.relative_path != "cold.py"));
    }

    #[test]
    fn coupling_reference_scenario() {
        // Three commits touching {a, b}; two touching {a, b, c}.
        let mut log = String::new();
        for _ in 0..3 {
            log.push_str("COMMIT\na.py\nb.py\n");
        }
        for _ in 0..2 {
            log.push_str("COMMIT\na.py\nb.py\nc.py\n");
        }
        let pairs = parse_coupling(&log, 20, 3);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a, "a.py");
        assert_eq!(pairs[0].b, "b.py");
        assert_eq!(pairs[0].count, 5);
    }

    #[test]
    fn oversized_commits_are_excluded_entirely() {
        let mut log = String::new();
        for _ in 0..5 {
            log.push_str("COMMIT\n");
            for i in 0..21 {
                log.push_str(&format!("f{i}.py\n"));
            }
        }
        assert!(parse_coupling(&log, 20, 3).is_empty());
    }

    #[test]
    fn non_python_files_do_not_couple() {
        let mut log = String::new();
        for _ in 0..3 {
            log.push_str("COMMIT\na.py\nREADME.md\n");
        }
        assert!(parse_coupling(&log, 20, 3).is_empty());
    }

    #[test]
    fn freshness_keeps_first_timestamp_per_file() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let recent = now - ChronoDuration::days(10);
        let old = now - ChronoDuration::days(400);
        let log = format!(
            "COMMIT::{}\na.py\n\nCOMMIT::{}\na.py\nb.py\n",
            recent.timestamp(),
            old.timestamp()
        );
        let entries = parse_freshness(&log, now);
        let a = entries.iter().find(|e| e.relative_path == "a.py").unwrap();
        assert_eq!(a.age_days, 10);
        assert_eq!(a.category, FreshnessCategory::Active);
        let b = entries.iter().find(|e| e.relative_path == "b.py").unwrap();
        assert_eq!(b.category, FreshnessCategory::Dormant);
    }

    #[tokio::test]
    async fn non_repository_is_soft_and_empty() {
        let temp = tempfile::TempDir::new().unwrap();
        let report = GitAnalysisService::analyze(temp.path(), &GitConfig::default()).await;
        assert!(!report.available);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.risk.is_empty());
        assert!(report.coupling.is_empty());
        assert!(report.freshness.is_empty());
    }
}
