//! Workspace configuration and the explicit sync context
//!
//! A workspace is a directory holding `.wikisync/config.toml`. Everything a
//! command needs is bundled in a [`SyncContext`] built from that workspace;
//! nothing reads process-global configuration.

mod context;
mod settings;
mod workspace;

pub use context::SyncContext;
pub use settings::{Scope, ScopeKind, WorkspaceConfig};
pub use workspace::Workspace;
