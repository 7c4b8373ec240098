//! Attachment references inside page bodies
//!
//! A page at `dir/intro.md` keeps its attachments under
//! `dir/intro.attachments/`. Only links pointing into that directory count
//! as references; external URLs and links elsewhere are ignored.

use regex::Regex;
use std::sync::LazyLock;

/// Markdown link or image target: `[text](target "title")` / `![alt](<target>)`
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!?\[[^\]]*\]\(\s*<?([^)>\s]+)>?(?:\s+"[^"]*")?\s*\)"#).unwrap()
});

const ATTACHMENT_SUFFIX: &str = ".attachments";

/// Attachment directory name for a page file name (`intro.md` -> `intro.attachments`).
pub fn attachment_dir_name(page_file_name: &str) -> String {
    let stem = page_file_name
        .strip_suffix(".md")
        .unwrap_or(page_file_name);
    format!("{stem}{ATTACHMENT_SUFFIX}")
}

/// Filenames referenced from `body` inside the page's attachment directory,
/// deduplicated, in order of first appearance.
pub fn attachment_refs(body: &str, page_file_name: &str) -> Vec<String> {
    let prefix = format!("{}/", attachment_dir_name(page_file_name));
    let mut found: Vec<String> = Vec::new();

    for capture in LINK_PATTERN.captures_iter(body) {
        let target = &capture[1];
        let target = target.strip_prefix("./").unwrap_or(target);
        let Some(name) = target.strip_prefix(&prefix) else {
            continue;
        };
        let name = name.split(['#', '?']).next().unwrap_or_default();
        if name.is_empty() || name.contains('/') {
            continue;
        }
        let name = name.replace("%20", " ");
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}
