//! Values exchanged with the remote API

use serde::{Deserialize, Serialize};

/// Kind of remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Page,
    /// Container node without a body
    Folder,
}

/// A node with its body, as returned by `get_node`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub title: String,
    /// Body in storage format
    pub body: String,
    pub version: u64,
    pub parent_id: Option<String>,
    /// Root-first ancestor chain, excluding the node itself
    pub ancestors: Vec<String>,
    pub content_type: ContentType,
    pub space_key: String,
}

impl RemoteNode {
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            version: self.version,
            parent_id: self.parent_id.clone(),
            ancestors: self.ancestors.clone(),
            content_type: self.content_type,
        }
    }
}

/// Listing entry without body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: String,
    pub title: String,
    pub version: u64,
    pub parent_id: Option<String>,
    pub ancestors: Vec<String>,
    pub content_type: ContentType,
}

/// Query for `search_by_scope`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeQuery {
    pub space: String,
    /// Restrict to this node and its descendants
    pub root_id: Option<String>,
}

/// Payload for `create_node`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub space_key: String,
    pub title: String,
    pub body: String,
    pub parent_id: Option<String>,
    pub content_type: ContentType,
}

/// Payload for `update_node`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeUpdate {
    pub title: String,
    pub body: String,
    /// New version, one above the version the caller observed
    pub version: u64,
}

/// Attachment metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAttachment {
    pub id: String,
    pub filename: String,
    pub media_type: String,
    pub file_size: u64,
    pub version: u64,
}

/// Payload for attachment upload and update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub filename: String,
    pub media_type: String,
    pub data: Vec<u8>,
}
