//! Remote wiki API boundary
//!
//! The sync engine talks to the wiki only through [`RemoteApi`]. Concrete
//! HTTP clients live outside this crate; tests use an in-memory fake.

mod types;

pub use types::{
    ContentType, NewAttachment, NewNode, NodeSummary, NodeUpdate, RemoteAttachment, RemoteNode,
    ScopeQuery,
};

use async_trait::async_trait;

/// Errors reported by a remote implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Remote node not found: {id}")]
    NotFound { id: String },

    /// Optimistic lock failure on update
    #[error("Version conflict on {id}: remote expects version {expected}, got {actual}")]
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Network or server failure; the same call may succeed later
    #[error("Remote transport failure: {0}")]
    Transport(String),

    /// Request understood but refused (permissions, validation)
    #[error("Remote rejected request: {0}")]
    Rejected(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Page-oriented operations the sync engine needs from the wiki.
///
/// Bodies cross this boundary in the wiki's storage format; conversion to
/// and from Markdown is the job of a [`crate::ContentConverter`].
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetch one node with its body.
    async fn get_node(&self, id: &str) -> RemoteResult<RemoteNode>;

    /// Direct children of a node.
    async fn list_children(&self, id: &str) -> RemoteResult<Vec<NodeSummary>>;

    /// Every node matching a scope query.
    async fn search_by_scope(&self, query: &ScopeQuery) -> RemoteResult<Vec<NodeSummary>>;

    async fn create_node(&self, node: NewNode) -> RemoteResult<RemoteNode>;

    /// Replace title and body. `update.version` must be the current remote
    /// version plus one.
    async fn update_node(&self, id: &str, update: NodeUpdate) -> RemoteResult<RemoteNode>;

    /// Re-parent a node.
    async fn move_node(&self, id: &str, new_parent_id: &str) -> RemoteResult<RemoteNode>;

    async fn delete_node(&self, id: &str) -> RemoteResult<()>;

    async fn list_attachments(&self, page_id: &str) -> RemoteResult<Vec<RemoteAttachment>>;

    async fn download_attachment(&self, page_id: &str, attachment_id: &str)
    -> RemoteResult<Vec<u8>>;

    async fn upload_attachment(
        &self,
        page_id: &str,
        attachment: NewAttachment,
    ) -> RemoteResult<RemoteAttachment>;

    /// Replace the content of an existing attachment.
    async fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        attachment: NewAttachment,
    ) -> RemoteResult<RemoteAttachment>;

    async fn delete_attachment(&self, page_id: &str, attachment_id: &str) -> RemoteResult<()>;
}
