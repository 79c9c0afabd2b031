use crate::models::coverage::{DebtMarker, DebtMarkerKind, TechDebtReport};
use crate::services::file_discovery::DiscoveredFile;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref MARKER_RE: Regex =
        Regex::new(r"(?i)#\s*(TODO|FIXME|HACK|XXX|BUG|OPTIMIZE)\b:?\s*(.*)").expect("marker regex");
}

/// Scan comments for debt markers with their line context.
pub fn scan(files: &[DiscoveredFile]) -> TechDebtReport {
    let mut markers = Vec::new();
    for file in files {
        let Some(source) = &file.source else { continue };
        for (index, line) in source.lines().enumerate() {
            if let Some(captures) = MARKER_RE.captures(line) {
                let Some(kind) = DebtMarkerKind::from_keyword(&captures[1]) else {
                    continue;
                };
                markers.push(DebtMarker {
                    marker: kind,
                    file: file.record.relative_path.clone(),
                    line: index + 1,
                    text: captures[2].trim().to_string(),
                });
            }
        }
    }
    markers.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for marker in &markers {
        *counts.entry(marker.marker.as_str().to_string()).or_insert(0) += 1;
    }
    TechDebtReport { markers, counts }
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
                module_path: ModulePath::new("m"),
                parse_status: ParseStatus::Parsed,
            },
            source: Some(source.to_string()),
        }
    }

    #[test]
    fn markers_record_kind_line_and_trailing_text() {
        let file = discovered(
            "m.py",
            "x = 1  # TODO: retry on failure\n# fixme handle unicode\ny = 2\n",
        );
        let report = scan(&[file]);
        assert_eq!(report.markers.len(), 2);
        assert_eq!(report.markers[0].marker, DebtMarkerKind::Todo);
        assert_eq!(report.markers[0].line, 1);
        assert_eq!(report.markers[0].text, "retry on failure");
        assert_eq!(report.markers[1].marker, DebtMarkerKind::Fixme);
        assert_eq!(report.counts["TODO"], 1);
        assert_eq!(report.counts["FIXME"], 1);
    }

    #[test]
    fn plain_words_outside_comments_do_not_match() {
        let file = discovered("m.py", "todo_list = []\nhack = \"value\"\n");
        let report = scan(&[file]);
        assert!(report.markers.is_empty());
    }

    #[test]
    fn hack_xxx_bug_optimize_all_scan() {
        let file = discovered(
            "m.py",
            "# HACK temporary\n# XXX revisit\n# BUG off by one\n# OPTIMIZE slow path\n",
        );
        let report = scan(&[file]);
        let kinds: Vec<DebtMarkerKind> = report.markers.iter().map(|m| m.marker).collect();
        assert_eq!(
            kinds,
            vec![
                DebtMarkerKind::Hack,
                DebtMarkerKind::Xxx,
                DebtMarkerKind::Bug,
                DebtMarkerKind::Optimize
            ]
        );
    }
}
