//! Path handling
//!
//! Two kinds of path flow through a sync run. Workspace-relative paths are
//! what the state store records and what the mapper computes: plain
//! forward-slash strings with no leading slash, `""` meaning the root.
//! Absolute paths on disk are wrapped in [`NormalizedPath`] and only turned
//! back into a [`PathBuf`] at the I/O boundary.

use std::fmt;
use std::path::{Path, PathBuf};

const SEP: char = '/';

/// Absolute or base-anchored path kept with forward slashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: slashes(&path.as_ref().to_string_lossy()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Append a workspace-relative path. `.` segments and empty segments
    /// are dropped, so `join("")` is the path itself.
    pub fn join(&self, relative: &str) -> Self {
        let relative = slashes(relative);
        let mut inner = self.inner.clone();
        for segment in relative.split(SEP).filter(|s| !s.is_empty() && *s != ".") {
            if !inner.ends_with(SEP) {
                inner.push(SEP);
            }
            inner.push_str(segment);
        }
        Self { inner }
    }

    /// Containing directory; `None` for a bare name or the filesystem root.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches(SEP);
        let (dir, _) = trimmed.rsplit_once(SEP)?;
        let inner = if dir.is_empty() { SEP.to_string() } else { dir.to_string() };
        Some(Self { inner })
    }

    /// Last segment.
    pub fn file_name(&self) -> Option<&str> {
        self.inner
            .trim_end_matches(SEP)
            .rsplit(SEP)
            .next()
            .filter(|name| !name.is_empty())
    }

    /// Extension of the last segment, without the dot. Dotfiles have none.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// This path as a workspace-relative string under `root`.
    ///
    /// `None` when outside `root`; `root` itself gives `""`. A sibling that
    /// merely shares a name prefix (`/ws` vs `/wsx`) is outside.
    pub fn relative_to(&self, root: &NormalizedPath) -> Option<String> {
        let root = root.inner.trim_end_matches(SEP);
        let rest = self.inner.strip_prefix(root)?;
        if rest.is_empty() {
            return Some(String::new());
        }
        let rest = rest.strip_prefix(SEP)?;
        Some(rest.trim_end_matches(SEP).to_string())
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

fn slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

/// Join two workspace-relative paths. Either side may be empty.
pub fn join_relative(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches(SEP);
    match (dir.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => dir.to_string(),
        (false, false) => format!("{dir}{SEP}{name}"),
    }
}

/// Directory part of a workspace-relative path; `""` for top-level entries.
pub fn parent_dir(relative: &str) -> &str {
    relative.rsplit_once(SEP).map_or("", |(dir, _)| dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/work/space/docs/intro.md", Some("docs/intro.md"))]
    #[case("/work/space", Some(""))]
    #[case("/work/space/", Some(""))]
    #[case("/work/spaceship/a.md", None)]
    #[case("/elsewhere/a.md", None)]
    fn relative_to_root(#[case] path: &str, #[case] expected: Option<&str>) {
        let root = NormalizedPath::new("/work/space");
        assert_eq!(NormalizedPath::new(path).relative_to(&root).as_deref(), expected);
    }

    #[test]
    fn join_skips_empty_and_dot_segments() {
        let root = NormalizedPath::new("/ws");
        assert_eq!(root.join("").as_str(), "/ws");
        assert_eq!(root.join("./docs//a.md").as_str(), "/ws/docs/a.md");
        assert_eq!(root.join("docs\\b.md").as_str(), "/ws/docs/b.md");
    }

    #[test]
    fn parent_and_extension() {
        let file = NormalizedPath::new("/ws/docs/a.attachments/diagram.png");
        assert_eq!(file.parent().unwrap().as_str(), "/ws/docs/a.attachments");
        assert_eq!(file.extension(), Some("png"));
        assert_eq!(NormalizedPath::new("/ws/.gitignore").extension(), None);
        assert_eq!(NormalizedPath::new("/a").parent().unwrap().as_str(), "/");
        assert_eq!(NormalizedPath::new("a").parent(), None);
    }

    #[test]
    fn join_relative_handles_empty_sides() {
        assert_eq!(join_relative("", "a.md"), "a.md");
        assert_eq!(join_relative("docs", ""), "docs");
        assert_eq!(join_relative("docs/", "a.md"), "docs/a.md");
    }

    #[test]
    fn parent_dir_of_top_level_is_empty() {
        assert_eq!(parent_dir("a.md"), "");
        assert_eq!(parent_dir("docs/guide/index.md"), "docs/guide");
    }
}
