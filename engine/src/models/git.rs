use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-file history inside the risk window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitFileStats {
    pub relative_path: String,
    pub commits: usize,
    pub hotfix_commits: usize,
    pub authors: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<DateTime<Utc>>,
}

/// A file surfaced by the risk ranking. Scores stay within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEntry {
    pub relative_path: String,
    pub score: f64,
    pub commits: usize,
    pub hotfix_commits: usize,
    pub authors: usize,
}

impl RiskEntry {
    /// risk = 0.4 * churn_norm + 0.4 * hotfix_score + 0.2 * author_score.
    pub fn score(commits: usize, hotfix_commits: usize, authors: usize, max_churn: usize) -> f64 {
        if max_churn == 0 {
            return 0.0;
        }
        let churn_norm = commits as f64 / max_churn as f64;
        let hotfix_score = (hotfix_commits.min(3)) as f64 / 3.0;
        let author_score = (authors.min(5)) as f64 / 5.0;
        0.4 * churn_norm + 0.4 * hotfix_score + 0.2 * author_score
    }
}

/// Two files that co-changed in at least three sampled commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingPair {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Age category of a file's last modification, against wall-clock at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessCategory {
    Active,
    Aging,
    Stale,
    Dormant,
}

impl FreshnessCategory {
    pub fn from_age_days(days: i64) -> Self {
        if days < 30 {
            FreshnessCategory::Active
        } else if days < 90 {
            FreshnessCategory::Aging
        } else if days < 180 {
            FreshnessCategory::Stale
        } else {
            FreshnessCategory::Dormant
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FreshnessCategory::Active => "active",
            FreshnessCategory::Aging => "aging",
            FreshnessCategory::Stale => "stale",
            FreshnessCategory::Dormant => "dormant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessEntry {
    pub relative_path: String,
    pub last_commit: DateTime<Utc>,
    pub age_days: i64,
    pub category: FreshnessCategory,
}

/// Everything derived from git history. Optional by design: when the
/// version-control command is missing or times out, the report is empty and
/// carries a warning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitReport {
    pub available: bool,
    pub window_months: u32,
    pub stats: Vec<GitFileStats>,
    /// Ranked descending; entries with score <= 0.1 are not surfaced.
    pub risk: Vec<RiskEntry>,
    pub coupling: Vec<CouplingPair>,
    pub freshness: Vec<FreshnessEntry>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_formula_matches_reference_example() {
        // 10 commits (the max), 6 hotfixes, 2 authors.
        let score = RiskEntry::score(10, 6, 2, 10);
        assert!((score - 0.88).abs() < 1e-9);
    }

    #[test]
    fn risk_is_empty_without_churn() {
        assert_eq!(RiskEntry::score(0, 5, 5, 0), 0.0);
    }

    #[test]
    fn risk_stays_in_unit_interval() {
        for commits in 0..20 {
            for hotfixes in 0..10 {
                for authors in 0..10 {
                    let s = RiskEntry::score(commits, hotfixes, authors, 20);
                    assert!((0.0..=1.0).contains(&s), "score {s} out of bounds");
                }
            }
        }
    }

    #[test]
    fn risk_monotone_in_hotfix_count() {
        let mut prev = 0.0;
        for hotfixes in 0..6 {
            let s = RiskEntry::score(3, hotfixes, 2, 10);
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn freshness_partition_boundaries() {
        assert_eq!(FreshnessCategory::from_age_days(0), FreshnessCategory::Active);
        assert_eq!(FreshnessCategory::from_age_days(29), FreshnessCategory::Active);
        assert_eq!(FreshnessCategory::from_age_days(30), FreshnessCategory::Aging);
        assert_eq!(FreshnessCategory::from_age_days(89), FreshnessCategory::Aging);
        assert_eq!(FreshnessCategory::from_age_days(90), FreshnessCategory::Stale);
        assert_eq!(FreshnessCategory::from_age_days(179), FreshnessCategory::Stale);
        assert_eq!(FreshnessCategory::from_age_days(180), FreshnessCategory::Dormant);
    }
}
