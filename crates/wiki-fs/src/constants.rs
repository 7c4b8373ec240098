//! Names of the files and directories that make up a sync workspace.

use std::path::Path;

/// Well-known workspace paths, relative to the workspace root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspacePath {
    /// The `.wikisync` marker directory
    MarkerDir,
    /// `.wikisync/config.toml`
    Config,
    /// `.wikisync/state.toml`
    State,
    /// `.wikisync/base`, one normalized base body per page
    BaseDir,
    /// `.wikisync/conflicts`, remote bodies captured at conflict time
    ConflictDir,
    /// `.wikisyncignore` at the workspace root
    IgnoreFile,
    /// `.gitignore` at the workspace root, merged into the ignore filter
    VcsIgnoreFile,
}

impl WorkspacePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkerDir => ".wikisync",
            Self::Config => ".wikisync/config.toml",
            Self::State => ".wikisync/state.toml",
            Self::BaseDir => ".wikisync/base",
            Self::ConflictDir => ".wikisync/conflicts",
            Self::IgnoreFile => ".wikisyncignore",
            Self::VcsIgnoreFile => ".gitignore",
        }
    }
}

impl AsRef<Path> for WorkspacePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for WorkspacePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for WorkspacePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
