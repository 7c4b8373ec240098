//! Line-level diffs between page bodies

use serde::Serialize;
use similar::{ChangeTag, TextDiff};

/// Lines of context around each hunk in unified output
const CONTEXT_RADIUS: usize = 3;

/// Result of comparing two bodies line by line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDiff {
    /// Are the bodies identical?
    pub is_equivalent: bool,
    /// Added and removed lines, in document order
    pub changes: Vec<LineChange>,
    /// Similarity ratio (0.0 to 1.0)
    pub similarity: f64,
}

/// A single changed line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum LineChange {
    /// Present only in the new text; `line` is 1-based in the new text
    Added { line: usize, content: String },
    /// Present only in the old text; `line` is 1-based in the old text
    Removed { line: usize, content: String },
}

impl ContentDiff {
    /// Create a diff indicating the bodies are identical
    pub fn equivalent() -> Self {
        Self {
            is_equivalent: true,
            changes: Vec::new(),
            similarity: 1.0,
        }
    }

    /// Compare `old` to `new` line by line.
    pub fn compute(old: &str, new: &str) -> Self {
        if old == new {
            return Self::equivalent();
        }

        let text_diff = TextDiff::from_lines(old, new);
        let similarity = text_diff.ratio() as f64;

        let changes = text_diff
            .iter_all_changes()
            .filter_map(|change| {
                let content = change.value().trim_end_matches('\n').to_string();
                match change.tag() {
                    ChangeTag::Delete => Some(LineChange::Removed {
                        line: change.old_index()? + 1,
                        content,
                    }),
                    ChangeTag::Insert => Some(LineChange::Added {
                        line: change.new_index()? + 1,
                        content,
                    }),
                    ChangeTag::Equal => None,
                }
            })
            .collect::<Vec<_>>();

        Self {
            is_equivalent: changes.is_empty(),
            changes,
            similarity,
        }
    }

    pub fn added(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, LineChange::Added { .. }))
            .count()
    }

    pub fn removed(&self) -> usize {
        self.changes
            .iter()
            .filter(|c| matches!(c, LineChange::Removed { .. }))
            .count()
    }
}

impl Default for ContentDiff {
    fn default() -> Self {
        Self::equivalent()
    }
}

/// Render a unified diff from `old` to `new`. Empty when they are equal.
pub fn unified_diff(old_label: &str, new_label: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(CONTEXT_RADIUS)
        .header(old_label, new_label)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_equivalent() {
        let diff = ContentDiff::compute("a\nb\n", "a\nb\n");
        assert!(diff.is_equivalent);
        assert_eq!(diff.similarity, 1.0);
    }

    #[test]
    fn test_compute_added_and_removed() {
        let diff = ContentDiff::compute("keep\nold\n", "keep\nnew\nextra\n");
        assert!(!diff.is_equivalent);
        assert_eq!(diff.removed(), 1);
        assert_eq!(diff.added(), 2);
        assert!(diff.changes.contains(&LineChange::Removed {
            line: 2,
            content: "old".into()
        }));
        assert!(diff.changes.contains(&LineChange::Added {
            line: 3,
            content: "extra".into()
        }));
    }

    #[test]
    fn test_unified_has_headers_and_hunk() {
        let out = unified_diff("remote/a.md", "local/a.md", "one\ntwo\n", "one\nTWO\n");
        assert!(out.starts_with("--- remote/a.md\n+++ local/a.md\n"));
        assert!(out.contains("@@"));
        assert!(out.contains("-two\n"));
        assert!(out.contains("+TWO\n"));
    }

    #[test]
    fn test_unified_empty_when_equal() {
        assert_eq!(unified_diff("a", "b", "same\n", "same\n"), "");
    }
}
