use crate::models::analysis::FileAnalysis;
use crate::models::bundle::SideEffectReport;
use crate::models::logic::{SideEffect, SideEffectCategory};
use lazy_static::lazy_static;
use regex::RegexSet;
use std::collections::BTreeMap;

// Callee patterns are matched against the callee text with a trailing `(`
// appended, so `.post(` distinguishes a call from an attribute mention.

/// Exact env-read callees. These bypass the allow-list so that
/// `os.environ.get` is not swallowed by the `.get(` guard.
const ENV_CALLEES: &[&str] = &["os.getenv", "os.environ.get"];

lazy_static! {
    /// False-positive guard. A callee matching any of these is never a side
    /// effect, whatever the category patterns say.
    static ref ALLOW_LIST: RegexSet = RegexSet::new([
        r"\.get\($",
        r"\.read\($",
        r"^isinstance\($",
        r"^len\($",
        r"\.items\($",
        r"\.keys\($",
        r"\.values\($",
        r"\.append\($",
        r"^str\($",
        r"^print\($",
        r"^format\($",
        r"\.split\($",
        r"\.join\($",
        r"\.strip\($",
    ])
    .expect("allow-list patterns");

    static ref DB_PATTERNS: RegexSet = RegexSet::new([
        r"session\.commit\(",
        r"session\.rollback\(",
        r"cursor\.execute\(",
        r"\.executemany\(",
        r"\.insert\(",
        r"\.update\(",
        r"\.delete\(",
        r"\.query\(",
        r"\.bulk_save_objects\(",
    ])
    .expect("db patterns");

    static ref API_PATTERNS: RegexSet = RegexSet::new([
        r"^requests\.",
        r"^httpx\.",
        r"^aiohttp\.",
        r"\.post\(",
        r"\.put\(",
        r"\.patch\(",
        r"^urllib\.request\.",
        r"^fetch\(",
    ])
    .expect("api patterns");

    static ref FILE_PATTERNS: RegexSet = RegexSet::new([
        r"\.write\(",
        r"\.writelines\(",
        r"^json\.dump",
        r"^pickle\.dump",
        r"^open\(",
        r"\.write_text\(",
        r"\.write_bytes\(",
        r"^shutil\.",
    ])
    .expect("file patterns");

    static ref ENV_PATTERNS: RegexSet = RegexSet::new([
        r"^os\.environ\.get\(",
        r"^os\.getenv\(",
        r"^os\.putenv\(",
    ])
    .expect("env patterns");

    static ref SUBPROCESS_PATTERNS: RegexSet = RegexSet::new([
        r"^subprocess\.",
        r"^os\.system\(",
        r"^os\.popen\(",
        r"Popen\(",
        r"^os\.exec",
    ])
    .expect("subprocess patterns");
}

/// Categorise one callee, or `None` when it is harmless.
///
/// The allow-list is consulted first and vetoes every category; exact env
/// reads are the single carve-out, otherwise `os.environ.get` could never be
/// reported as the Env category documents.
pub fn classify(callee: &str) -> Option<SideEffectCategory> {
    if ENV_CALLEES.contains(&callee) {
        return Some(SideEffectCategory::Env);
    }
    let probe = format!("{callee}(");
    if ALLOW_LIST.is_match(&probe) {
        return None;
    }
    if DB_PATTERNS.is_match(&probe) {
        Some(SideEffectCategory::Db)
    } else if API_PATTERNS.is_match(&probe) {
        Some(SideEffectCategory::Api)
    } else if FILE_PATTERNS.is_match(&probe) {
        Some(SideEffectCategory::File)
    } else if ENV_PATTERNS.is_match(&probe) {
        Some(SideEffectCategory::Env)
    } else if SUBPROCESS_PATTERNS.is_match(&probe) {
        Some(SideEffectCategory::Subprocess)
    } else {
        None
    }
}

/// Run the detector over every call site of every module.
pub fn detect(analyses: &[FileAnalysis]) -> SideEffectReport {
    let mut effects = Vec::new();
    for analysis in analyses {
        for call in &analysis.calls {
            if let Some(category) = classify(&call.target) {
                effects.push(SideEffect {
                    category,
                    callee: call.target.clone(),
                    file: analysis.relative_path.clone(),
                    line: call.line,
                });
            }
        }
    }
    effects.sort_by(|a, b| {
        (&a.file, a.line, &a.callee).cmp(&(&b.file, b.line, &b.callee))
    });

    let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
    for effect in &effects {
        *by_category
            .entry(effect.category.as_str().to_string())
            .or_insert(0) += 1;
    }
    SideEffectReport {
        effects,
        by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_vetoes_api_pattern() {
        // `.get(` would match nothing harmful; `resp.get` must be discarded
        // even though HTTP GET-ish names exist in the API table.
        assert_eq!(classify("resp.get"), None);
    }

    #[test]
    fn env_reads_survive_the_get_guard() {
        assert_eq!(classify("os.environ.get"), Some(SideEffectCategory::Env));
        assert_eq!(classify("os.getenv"), Some(SideEffectCategory::Env));
    }

    #[test]
    fn db_patterns_match_first() {
        assert_eq!(classify("session.commit"), Some(SideEffectCategory::Db));
        assert_eq!(classify("cursor.execute"), Some(SideEffectCategory::Db));
        assert_eq!(classify("table.insert"), Some(SideEffectCategory::Db));
    }

    #[test]
    fn api_and_file_and_subprocess() {
        assert_eq!(classify("requests.post"), Some(SideEffectCategory::Api));
        assert_eq!(classify("client.put"), Some(SideEffectCategory::Api));
        assert_eq!(classify("json.dump"), Some(SideEffectCategory::File));
        assert_eq!(classify("open"), Some(SideEffectCategory::File));
        assert_eq!(classify("subprocess.run"), Some(SideEffectCategory::Subprocess));
        assert_eq!(classify("os.system"), Some(SideEffectCategory::Subprocess));
    }

    #[test]
    fn plain_calls_are_not_effects() {
        assert_eq!(classify("len"), None);
        assert_eq!(classify("helper.compute"), None);
        assert_eq!(classify("dict.items"), None);
    }

    #[test]
    fn category_order_prefers_db_over_api() {
        // `.delete(` appears in the DB table; HTTP delete would too, and the
        // first matching category must win.
        assert_eq!(classify("client.delete"), Some(SideEffectCategory::Db));
    }
}
