//! Working-file discovery and loading

use std::fs;

use wiki_content::Document;
use wiki_fs::{NormalizedPath, io, join_relative};

use crate::ignore::IgnoreFilter;
use crate::state::StateStore;
use crate::tracking::Tracking;
use crate::Result;

const MARKDOWN_EXT: &str = ".md";
const ATTACHMENT_DIR_SUFFIX: &str = ".attachments";

/// A parsed working file with its resolved binding
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub path: String,
    pub document: Document,
    pub tracking: Tracking,
}

impl LocalFile {
    pub fn read(root: &NormalizedPath, relative: &str, state: &StateStore) -> Result<Self> {
        let text = io::read_text(&root.join(relative))?;
        let document = Document::parse(&text)?;
        let tracking = Tracking::resolve(&document, relative, state);
        Ok(Self {
            path: relative.to_string(),
            document,
            tracking,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.tracking.id()
    }
}

/// Markdown files at or below `under`, sorted, honouring ignore rules.
///
/// Hidden entries and `*.attachments` directories are never descended into.
pub fn markdown_files(root: &NormalizedPath, under: &str, filter: &IgnoreFilter) -> Result<Vec<String>> {
    let target = root.join(under);
    let mut found = Vec::new();

    if target.is_file() {
        if under.ends_with(MARKDOWN_EXT) && !filter.is_ignored(under, false) {
            found.push(under.to_string());
        }
        return Ok(found);
    }
    if target.is_dir() {
        walk(root, under, filter, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn walk(root: &NormalizedPath, dir: &str, filter: &IgnoreFilter, found: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(root.join(dir).to_native())? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let relative = join_relative(dir, &name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            if name.ends_with(ATTACHMENT_DIR_SUFFIX) || filter.is_ignored(&relative, true) {
                continue;
            }
            walk(root, &relative, filter, found)?;
        } else if name.ends_with(MARKDOWN_EXT) && !filter.is_ignored(&relative, false) {
            found.push(relative);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(temp: &TempDir, relative: &str) {
        let path = temp.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn lists_markdown_outside_hidden_and_attachment_dirs() {
        let temp = TempDir::new().unwrap();
        for file in [
            "index.md",
            "guide/setup.md",
            "guide/setup.attachments/notes.md",
            ".wikisync/base/1.md",
            ".git/x.md",
            "image.png",
            "drafts/wip.md",
        ] {
            touch(&temp, file);
        }
        let filter = IgnoreFilter::from_patterns(["drafts/"]);
        let root = NormalizedPath::new(temp.path());

        let files = markdown_files(&root, "", &filter).unwrap();
        assert_eq!(files, vec!["guide/setup.md".to_string(), "index.md".to_string()]);
    }

    #[test]
    fn single_file_target() {
        let temp = TempDir::new().unwrap();
        touch(&temp, "guide/setup.md");
        let root = NormalizedPath::new(temp.path());

        let files = markdown_files(&root, "guide/setup.md", &IgnoreFilter::default()).unwrap();
        assert_eq!(files, vec!["guide/setup.md".to_string()]);
    }

    #[test]
    fn missing_target_is_empty() {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path());
        assert!(markdown_files(&root, "nope", &IgnoreFilter::default()).unwrap().is_empty());
    }
}
