//! Outcome reports for pull and push
//!
//! Per-node problems never abort a command; they end up in these reports.

use serde::Serialize;

/// Why a file or node was left alone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// Local edits that sync would overwrite
    LocalChanges,
    /// File without a node binding
    Untracked,
    /// Untracked or foreign file occupies the mapped path
    PathOccupied,
    /// Node has an id but no sync record yet
    NotRecorded,
    /// Conflict recorded or markers still in the file
    UnresolvedConflict,
    /// No path could be derived for the node
    Unmappable(String),
    /// Frontmatter could not be parsed
    Malformed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalChanges => write!(f, "local changes would be overwritten"),
            Self::Untracked => write!(f, "file is not tracked"),
            Self::PathOccupied => write!(f, "path is occupied by another file"),
            Self::NotRecorded => write!(f, "no sync record; pull first"),
            Self::UnresolvedConflict => write!(f, "unresolved conflict; run resolve first"),
            Self::Unmappable(reason) => write!(f, "cannot map to a path: {reason}"),
            Self::Malformed(reason) => write!(f, "malformed frontmatter: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub id: Option<String>,
    pub path: Option<String>,
    pub reason: SkipReason,
}

/// A recorded conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictItem {
    pub id: String,
    pub path: String,
    /// Attachment file name when the conflict is on an attachment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

/// A per-node failure (transport error, rejected write)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeError {
    pub id: Option<String>,
    pub path: Option<String>,
    pub message: String,
}

/// A remote edit replaced by a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overwritten {
    pub id: String,
    pub path: String,
    /// Version the last sync saw
    pub recorded_version: u64,
    /// Version the push replaced
    pub replaced_version: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentCounts {
    pub downloaded: usize,
    pub uploaded: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

/// Report from a pull
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullReport {
    /// Files written with new remote content
    pub pulled: usize,
    /// Files relocated after a remote rename or re-parent
    pub moved: usize,
    pub unchanged: usize,
    pub skipped: Vec<Skipped>,
    pub conflicts: Vec<ConflictItem>,
    /// Recorded ids the remote no longer returns; local files are kept
    pub remote_deleted: Vec<String>,
    pub attachments: AttachmentCounts,
    pub errors: Vec<NodeError>,
    /// Planned actions, filled in dry-run mode
    pub actions: Vec<String>,
}

/// Report from a push
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushReport {
    /// Bodies uploaded
    pub pushed: usize,
    /// Nodes re-parented remotely to match the local tree
    pub moved: usize,
    pub unchanged: usize,
    pub skipped: Vec<Skipped>,
    /// Nodes the remote refused because its version moved
    pub conflicts: Vec<ConflictItem>,
    /// Pushes that replaced remote edits not pulled first
    pub overwritten: Vec<Overwritten>,
    pub attachments: AttachmentCounts,
    pub errors: Vec<NodeError>,
    pub actions: Vec<String>,
}

/// Shared bookkeeping between pull and push reports
pub(crate) trait Tally {
    fn skipped_mut(&mut self) -> &mut Vec<Skipped>;
    fn errors_mut(&mut self) -> &mut Vec<NodeError>;
    fn conflicts_mut(&mut self) -> &mut Vec<ConflictItem>;
    fn attachments_mut(&mut self) -> &mut AttachmentCounts;
    fn actions_mut(&mut self) -> &mut Vec<String>;

    fn skip(&mut self, id: Option<&str>, path: Option<&str>, reason: SkipReason) {
        tracing::warn!(id = ?id, path = ?path, %reason, "Skipped");
        self.skipped_mut().push(Skipped {
            id: id.map(str::to_string),
            path: path.map(str::to_string),
            reason,
        });
    }

    fn conflict(&mut self, id: &str, path: &str, attachment: Option<&str>) {
        tracing::warn!(id, path, attachment = ?attachment, "Conflict recorded");
        self.conflicts_mut().push(ConflictItem {
            id: id.to_string(),
            path: path.to_string(),
            attachment: attachment.map(str::to_string),
        });
    }

    /// Note an action that dry-run mode did not perform.
    fn plan(&mut self, action: String) {
        tracing::info!("[dry-run] {}", action);
        self.actions_mut().push(action);
    }

    fn error(&mut self, id: Option<&str>, path: Option<&str>, message: impl std::fmt::Display) {
        tracing::warn!(id = ?id, path = ?path, error = %message, "Node failed");
        self.errors_mut().push(NodeError {
            id: id.map(str::to_string),
            path: path.map(str::to_string),
            message: message.to_string(),
        });
    }
}

impl Tally for PullReport {
    fn skipped_mut(&mut self) -> &mut Vec<Skipped> {
        &mut self.skipped
    }
    fn errors_mut(&mut self) -> &mut Vec<NodeError> {
        &mut self.errors
    }
    fn conflicts_mut(&mut self) -> &mut Vec<ConflictItem> {
        &mut self.conflicts
    }
    fn attachments_mut(&mut self) -> &mut AttachmentCounts {
        &mut self.attachments
    }
    fn actions_mut(&mut self) -> &mut Vec<String> {
        &mut self.actions
    }
}

impl Tally for PushReport {
    fn skipped_mut(&mut self) -> &mut Vec<Skipped> {
        &mut self.skipped
    }
    fn errors_mut(&mut self) -> &mut Vec<NodeError> {
        &mut self.errors
    }
    fn conflicts_mut(&mut self) -> &mut Vec<ConflictItem> {
        &mut self.conflicts
    }
    fn attachments_mut(&mut self) -> &mut AttachmentCounts {
        &mut self.attachments
    }
    fn actions_mut(&mut self) -> &mut Vec<String> {
        &mut self.actions
    }
}

impl PullReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.conflicts.is_empty() && self.errors.is_empty()
    }
}

impl PushReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.conflicts.is_empty() && self.errors.is_empty()
    }
}
