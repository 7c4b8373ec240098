//! Error types for wiki-core

use std::path::PathBuf;

use crate::remote::RemoteError;

/// Result type for wiki-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in wiki-core operations
///
/// Only precondition failures abort a command; per-node problems are
/// collected into reports instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No `.wikisync/config.toml` at or above the given path
    #[error("Not a wikisync workspace (or any parent): {path}")]
    NotInitialized { path: PathBuf },

    /// `init` on a directory that already has a workspace
    #[error("Workspace already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    /// Scope configuration does not identify a single subtree
    #[error("Ambiguous scope: {message}")]
    AmbiguousScope { message: String },

    /// State file changed on disk since it was loaded
    #[error("Sync state changed on disk (expected revision {expected}, found {found}); re-run the command")]
    StaleState { expected: u64, found: u64 },

    /// Path argument lies outside the workspace root
    #[error("Path is outside the workspace: {path}")]
    OutsideWorkspace { path: PathBuf },

    /// File is not bound to a remote node
    #[error("File is not tracked: {path}")]
    NotTracked { path: String },

    /// File already carries a node id
    #[error("File {path} is already tracked as node {id}")]
    AlreadyTracked { path: String, id: String },

    /// Manual resolution attempted while markers remain
    #[error("Conflict markers still present in {path}")]
    MarkersPresent { path: String },

    /// Resolution asked for a file that has nothing to resolve
    #[error("{path} is not in conflict")]
    NotInConflict { path: String },

    /// Remote-side resolution without a captured remote body
    #[error("No captured remote content for node {id}; pull again to record the conflict")]
    NoRemoteSnapshot { id: String },

    /// Remote API failure
    #[error(transparent)]
    Remote(#[from] RemoteError),

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from wiki-fs
    #[error(transparent)]
    Fs(#[from] wiki_fs::Error),

    /// Content error from wiki-content
    #[error(transparent)]
    Content(#[from] wiki_content::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML deserialization error
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    pub fn ambiguous_scope(message: impl Into<String>) -> Self {
        Self::AmbiguousScope {
            message: message.into(),
        }
    }
}
