//! Explicit context passed to every command

use std::sync::Arc;

use super::{Workspace, WorkspaceConfig};
use crate::convert::{ContentConverter, PassthroughConverter};
use crate::remote::RemoteApi;
use wiki_fs::NormalizedPath;

/// Everything a sync command needs: workspace, remote client and converter.
#[derive(Clone)]
pub struct SyncContext {
    workspace: Workspace,
    remote: Arc<dyn RemoteApi>,
    converter: Arc<dyn ContentConverter>,
}

impl SyncContext {
    /// Context with the identity converter.
    pub fn new(workspace: Workspace, remote: Arc<dyn RemoteApi>) -> Self {
        Self::with_converter(workspace, remote, Arc::new(PassthroughConverter))
    }

    pub fn with_converter(
        workspace: Workspace,
        remote: Arc<dyn RemoteApi>,
        converter: Arc<dyn ContentConverter>,
    ) -> Self {
        Self {
            workspace,
            remote,
            converter,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn root(&self) -> &NormalizedPath {
        self.workspace.root()
    }

    pub fn config(&self) -> &WorkspaceConfig {
        self.workspace.config()
    }

    pub fn remote(&self) -> &dyn RemoteApi {
        self.remote.as_ref()
    }

    pub fn converter(&self) -> &dyn ContentConverter {
        self.converter.as_ref()
    }

    /// Name of the credential profile the remote client was built from.
    pub fn credential_profile(&self) -> Option<&str> {
        self.config().profile.as_deref()
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("root", self.root())
            .field("space", &self.config().space)
            .finish_non_exhaustive()
    }
}
