//! [`TestWorkspace`] builder for sync scenarios.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use wiki_core::{RemoteApi, Scope, SyncContext, Workspace, WorkspaceConfig, commands};

pub const BASE_URL: &str = "https://wiki.example.com";
pub const SPACE: &str = "DOCS";

/// A temporary directory that becomes a wikisync workspace.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use wiki_core::Scope;
/// use wiki_test_utils::{InMemoryRemote, TestWorkspace};
///
/// let remote = Arc::new(InMemoryRemote::new());
/// remote.add_page("100", None, "Root", "# Root\n");
///
/// let mut ws = TestWorkspace::new();
/// ws.init(Scope::tree("100"));
/// let ctx = ws.context(remote.clone());
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
    workspace: Option<Workspace>,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
            workspace: None,
        }
    }

    /// Root of the temporary directory.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Absolute path of a workspace-relative path.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Run `init` with the default test space and the given scope.
    pub fn init(&mut self, scope: Scope) -> &Workspace {
        let config = WorkspaceConfig::new(BASE_URL, SPACE, scope);
        let workspace = commands::init(self.root(), config)
            .unwrap_or_else(|e| panic!("TestWorkspace::init failed: {e}"));
        self.workspace.insert(workspace)
    }

    /// The initialized workspace.
    ///
    /// # Panics
    /// Panics if [`init`](Self::init) has not been called.
    pub fn workspace(&self) -> &Workspace {
        self.workspace
            .as_ref()
            .expect("TestWorkspace::workspace: call init first")
    }

    /// Sync context over this workspace and `remote`.
    pub fn context(&self, remote: Arc<dyn RemoteApi>) -> SyncContext {
        SyncContext::new(self.workspace().clone(), remote)
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    pub fn write_bytes(&self, relative: &str, content: &[u8]) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    /// Read a file as text.
    ///
    /// # Panics
    /// Panics with the path if the file cannot be read.
    pub fn read(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    pub fn read_bytes(&self, relative: &str) -> Vec<u8> {
        let path = self.path(relative);
        fs::read(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Assert that the file at `relative` contains `content`.
    pub fn assert_file_contains(&self, relative: &str, content: &str) {
        let text = self.read(relative);
        assert!(
            text.contains(content),
            "File {} does not contain expected content.\nExpected: {}\nActual: {}",
            relative,
            content,
            text
        );
    }
}
