//! Per-node sync records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remote::ContentType;

/// Reconciliation state of a page or attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    #[default]
    Synced,
    LocalModified,
    RemoteModified,
    Conflict,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Synced => "synced",
            Self::LocalModified => "local-modified",
            Self::RemoteModified => "remote-modified",
            Self::Conflict => "conflict",
        };
        f.write_str(label)
    }
}

/// What the workspace last agreed with the remote about one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Workspace-relative path of the working file
    pub path: String,
    pub title: String,
    pub space_key: String,
    /// Remote version at the last successful sync
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub ancestors: Vec<String>,
    #[serde(default)]
    pub content_type: ContentType,
    pub local_hash: String,
    pub remote_hash: String,
    /// Hash of the common ancestor of local and remote
    pub base_hash: String,
    #[serde(default)]
    pub sync_state: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_attachments: bool,
}

impl PageRecord {
    /// Local, remote and base all agree on `hash`.
    pub fn mark_synced(&mut self, hash: &str) {
        self.local_hash = hash.to_string();
        self.remote_hash = hash.to_string();
        self.base_hash = hash.to_string();
        self.sync_state = SyncState::Synced;
        self.last_synced_at = Some(Utc::now());
    }

    /// Remote content diverged from the base since the last sync, as far
    /// as the stored hashes know or `live_remote_hash` shows.
    pub fn remote_diverged(&self, live_remote_hash: &str) -> bool {
        live_remote_hash != self.remote_hash || self.remote_hash != self.base_hash
    }

    pub fn is_folder(&self) -> bool {
        self.content_type == ContentType::Folder
    }
}

/// Sync record of one attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub filename: String,
    pub media_type: String,
    pub file_size: u64,
    /// Remote version at the last successful sync; 0 when never synced
    pub version: u64,
    pub local_hash: String,
    pub remote_hash: String,
    pub base_hash: String,
    #[serde(default)]
    pub sync_state: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl AttachmentRecord {
    pub fn synced(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        file_size: u64,
        version: u64,
        hash: &str,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            file_size,
            version,
            local_hash: hash.to_string(),
            remote_hash: hash.to_string(),
            base_hash: hash.to_string(),
            sync_state: SyncState::Synced,
            last_synced_at: Some(Utc::now()),
        }
    }
}
