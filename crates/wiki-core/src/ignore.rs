//! Local ignore rules
//!
//! Patterns use gitignore syntax and are read from `.gitignore` and then
//! `.wikisyncignore` at the workspace root, so the latter can override the
//! former. The last matching pattern wins; a path inside an ignored
//! directory stays ignored. The marker directory is always ignored.

use regex::Regex;
use wiki_fs::{NormalizedPath, WorkspacePath, io};

use crate::Result;

#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    negated: bool,
    dir_only: bool,
}

/// Compiled ignore patterns for one workspace
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    rules: Vec<Rule>,
}

impl IgnoreFilter {
    /// Load the ignore files of the workspace at `root`.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let mut lines = Vec::new();
        for file in [WorkspacePath::VcsIgnoreFile, WorkspacePath::IgnoreFile] {
            if let Some(text) = io::read_text_opt(&root.join(file.as_str()))? {
                lines.extend(text.lines().map(str::to_string));
            }
        }
        Ok(Self::from_patterns(lines.iter().map(String::as_str)))
    }

    pub fn from_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Self {
        let rules = patterns
            .into_iter()
            .filter_map(|line| {
                let rule = compile(line);
                if rule.is_none() && !line.trim().is_empty() && !line.starts_with('#') {
                    tracing::warn!(pattern = line, "Ignoring unparseable ignore pattern");
                }
                rule
            })
            .collect();
        Self { rules }
    }

    /// Whether a workspace-relative path is excluded from sync.
    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        let marker = WorkspacePath::MarkerDir.as_str();
        if relative == marker || relative.starts_with(&format!("{marker}/")) {
            return true;
        }

        // An excluded parent directory cannot be re-included from below
        let mut prefix_end = 0;
        while let Some(offset) = relative[prefix_end..].find('/') {
            prefix_end += offset;
            if self.matches(&relative[..prefix_end], true) == Some(true) {
                return true;
            }
            prefix_end += 1;
        }

        self.matches(relative, is_dir).unwrap_or(false)
    }

    fn matches(&self, path: &str, is_dir: bool) -> Option<bool> {
        self.rules
            .iter()
            .rev()
            .find(|rule| (!rule.dir_only || is_dir) && rule.regex.is_match(path))
            .map(|rule| !rule.negated)
    }
}

fn compile(line: &str) -> Option<Rule> {
    let mut pattern = line.trim_end();
    if pattern.is_empty() || pattern.starts_with('#') {
        return None;
    }

    let negated = pattern.starts_with('!');
    if negated {
        pattern = &pattern[1..];
    }
    let dir_only = pattern.ends_with('/');
    let pattern = pattern.trim_end_matches('/');
    let anchored = pattern.contains('/');
    let pattern = pattern.trim_start_matches('/');
    if pattern.is_empty() {
        return None;
    }

    let body = translate(pattern);
    let source = if anchored {
        format!("^{body}$")
    } else {
        format!("^(?:.*/)?{body}$")
    };
    let regex = Regex::new(&source).ok()?;
    Some(Rule {
        regex,
        negated,
        dir_only,
    })
}

/// Glob to regex body: `**` spans directories, `*` and `?` do not.
fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let leading = i == 0 || chars[i - 1] == '/';
                let trailing_slash = chars.get(i + 2) == Some(&'/');
                if leading && trailing_slash {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match chars[i..].iter().position(|&c| c == ']') {
                Some(end) if end > 1 => {
                    let class: String = chars[i + 1..i + end].iter().collect();
                    let class = class.strip_prefix('!').map_or(class.clone(), |c| format!("^{c}"));
                    out.push('[');
                    out.push_str(&class.replace('\\', "\\\\"));
                    out.push(']');
                    i += end + 1;
                    continue;
                }
                _ => out.push_str("\\["),
            },
            '\\' if i + 1 < chars.len() => {
                out.push_str(&regex::escape(&chars[i + 1].to_string()));
                i += 2;
                continue;
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out
}
