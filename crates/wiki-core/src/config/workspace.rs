//! Workspace discovery and path resolution

use std::path::{Path, PathBuf};

use wiki_fs::{ConfigStore, NormalizedPath, WorkspacePath};

use super::WorkspaceConfig;
use crate::{Error, Result};

/// An initialized local workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    root: NormalizedPath,
    config: WorkspaceConfig,
}

impl Workspace {
    /// Find the workspace containing `start` by walking up its ancestors.
    ///
    /// `start` may be a file or a directory inside the workspace.
    pub fn discover(start: &Path) -> Result<Self> {
        let canonical = dunce::canonicalize(start).map_err(|_| Error::NotInitialized {
            path: start.to_path_buf(),
        })?;

        for dir in canonical.ancestors() {
            if dir.join(WorkspacePath::Config.as_str()).is_file() {
                tracing::debug!(root = %dir.display(), "Discovered workspace");
                return Self::open(dir);
            }
        }

        Err(Error::NotInitialized { path: canonical })
    }

    /// Open the workspace rooted exactly at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let root = NormalizedPath::new(dunce::canonicalize(root).map_err(|_| {
            Error::NotInitialized {
                path: root.to_path_buf(),
            }
        })?);
        let config_path = root.join(WorkspacePath::Config.as_str());
        if !config_path.is_file() {
            return Err(Error::NotInitialized {
                path: root.to_native(),
            });
        }

        let config: WorkspaceConfig = ConfigStore::new().load(&config_path)?;
        config.validate()?;
        Ok(Self { root, config })
    }

    /// Write a fresh configuration under `root` and open it.
    pub(crate) fn create(root: &Path, config: WorkspaceConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(root)?;
        let root = NormalizedPath::new(dunce::canonicalize(root)?);
        let config_path = root.join(WorkspacePath::Config.as_str());
        if config_path.exists() {
            return Err(Error::AlreadyInitialized {
                path: root.to_native(),
            });
        }
        ConfigStore::new().save(&config_path, &config)?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Absolute path of a workspace-relative path.
    pub fn path_of(&self, relative: &str) -> NormalizedPath {
        self.root.join(relative)
    }

    /// Workspace-relative form of a user-supplied path.
    ///
    /// Relative inputs are taken relative to the process working directory.
    /// The root itself maps to `""`.
    pub fn relative(&self, path: &Path) -> Result<String> {
        let absolute: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let resolved = dunce::canonicalize(&absolute).unwrap_or(absolute);

        NormalizedPath::new(&resolved)
            .relative_to(&self.root)
            .ok_or(Error::OutsideWorkspace { path: resolved })
    }
}
