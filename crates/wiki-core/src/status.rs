//! Status and diff reporting. Neither writes anything.

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use serde::Serialize;

use wiki_content::{ContentDiff, unified_diff};
use wiki_fs::{hash_text, normalize};

use crate::config::SyncContext;
use crate::remote::ContentType;
use crate::state::{BlobStore, StateStore, SyncState};
use crate::sync::{LocalFile, NodeError};
use crate::Result;

/// Pure classification of one tracked file.
///
/// `remote_changed` is `None` when the remote side is unknown, which is
/// treated as unchanged.
pub fn classify(local_hash: &str, base_hash: &str, remote_changed: Option<bool>) -> SyncState {
    let local_changed = local_hash != base_hash;
    match (local_changed, remote_changed.unwrap_or(false)) {
        (false, false) => SyncState::Synced,
        (true, false) => SyncState::LocalModified,
        (false, true) => SyncState::RemoteModified,
        (true, true) => SyncState::Conflict,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub path: String,
    pub id: String,
    pub state: SyncState,
}

/// A record whose working file is gone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEntry {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
    pub untracked: Vec<String>,
    pub missing: Vec<MissingEntry>,
    pub errors: Vec<NodeError>,
}

impl StatusReport {
    pub fn count(&self, state: SyncState) -> usize {
        self.entries.iter().filter(|e| e.state == state).count()
    }

    pub fn state_of(&self, path: &str) -> Option<SyncState> {
        self.entries.iter().find(|e| e.path == path).map(|e| e.state)
    }
}

struct Tracked {
    path: String,
    id: String,
    local_hash: String,
}

/// Classify `files` (workspace-relative). Records under `under` whose file
/// is missing are listed separately.
///
/// With `check_remote`, every tracked node is fetched to detect remote
/// changes; otherwise the recorded remote hash is used.
pub async fn status(
    ctx: &SyncContext,
    state: &StateStore,
    files: &[String],
    under: &str,
    check_remote: bool,
) -> Result<StatusReport> {
    let mut report = StatusReport::default();
    let mut tracked = Vec::new();

    for path in files {
        let file = match LocalFile::read(ctx.root(), path, state) {
            Ok(file) => file,
            Err(e) => {
                report.errors.push(NodeError {
                    id: None,
                    path: Some(path.clone()),
                    message: e.to_string(),
                });
                continue;
            }
        };
        match file.id().filter(|id| state.page(id).is_some()) {
            Some(id) => tracked.push(Tracked {
                path: path.clone(),
                id: id.to_string(),
                local_hash: hash_text(&file.document.body),
            }),
            None => report.untracked.push(path.clone()),
        }
    }

    let live = if check_remote {
        remote_hashes(ctx, &tracked, &mut report.errors).await
    } else {
        HashMap::new()
    };

    for item in &tracked {
        let Some(record) = state.page(&item.id) else {
            continue;
        };
        let remote_changed = if check_remote {
            live.get(&item.id).map(|hash| record.remote_diverged(hash))
        } else {
            Some(record.remote_hash != record.base_hash)
        };
        let classified = classify(&item.local_hash, &record.base_hash, remote_changed);
        report.entries.push(StatusEntry {
            path: item.path.clone(),
            id: item.id.clone(),
            state: classified,
        });
    }

    let seen: HashSet<&str> = tracked.iter().map(|t| t.id.as_str()).collect();
    report.missing = state
        .pages()
        .filter(|(id, record)| {
            !seen.contains(id)
                && (under.is_empty()
                    || record.path == under
                    || record.path.starts_with(&format!("{under}/")))
                && !ctx.root().join(&record.path).is_file()
        })
        .map(|(id, record)| MissingEntry {
            id: id.to_string(),
            path: record.path.clone(),
        })
        .collect();

    report.entries.sort_by(|a, b| a.path.cmp(&b.path));
    report.missing.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(report)
}

/// Hash of each node's converted remote body, fetched concurrently.
async fn remote_hashes(
    ctx: &SyncContext,
    tracked: &[Tracked],
    errors: &mut Vec<NodeError>,
) -> HashMap<String, String> {
    let remote = ctx.remote();
    let results: Vec<_> = stream::iter(tracked)
        .map(|item| async move { (item, remote.get_node(&item.id).await) })
        .buffer_unordered(ctx.config().concurrency())
        .collect()
        .await;

    let mut hashes = HashMap::new();
    for (item, result) in results {
        match result {
            Ok(node) => {
                let markdown = match node.content_type {
                    ContentType::Folder => String::new(),
                    ContentType::Page => ctx.converter().to_markdown(&node.body),
                };
                hashes.insert(item.id.clone(), hash_text(&markdown));
            }
            Err(e) => {
                tracing::warn!(id = %item.id, error = %e, "Remote status unavailable");
                errors.push(NodeError {
                    id: Some(item.id.clone()),
                    path: Some(item.path.clone()),
                    message: e.to_string(),
                });
            }
        }
    }
    hashes
}

/// What the local body was compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffSource {
    /// Current remote body, converted to Markdown
    Remote,
    /// Recorded base body
    Base,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDiff {
    pub path: String,
    pub id: String,
    pub against: DiffSource,
    pub unified: String,
    pub changes: ContentDiff,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiffReport {
    /// Only files that differ
    pub diffs: Vec<FileDiff>,
    pub errors: Vec<NodeError>,
}

/// Diff each tracked file against the remote body, or against the recorded
/// base when `use_remote` is false.
pub async fn diff(
    ctx: &SyncContext,
    state: &StateStore,
    files: &[String],
    use_remote: bool,
) -> Result<DiffReport> {
    let mut report = DiffReport::default();
    let base = BlobStore::base(ctx.root());

    for path in files {
        let file = match LocalFile::read(ctx.root(), path, state) {
            Ok(file) => file,
            Err(e) => {
                report.errors.push(NodeError {
                    id: None,
                    path: Some(path.clone()),
                    message: e.to_string(),
                });
                continue;
            }
        };
        let Some(id) = file.id().filter(|id| state.page(id).is_some()) else {
            continue;
        };

        let (other, against) = if use_remote {
            match ctx.remote().get_node(id).await {
                Ok(node) => (ctx.converter().to_markdown(&node.body), DiffSource::Remote),
                Err(e) => {
                    report.errors.push(NodeError {
                        id: Some(id.to_string()),
                        path: Some(path.clone()),
                        message: e.to_string(),
                    });
                    continue;
                }
            }
        } else {
            (base.read(id)?.unwrap_or_default(), DiffSource::Base)
        };

        let (old, new) = (normalize(&other), normalize(&file.document.body));
        let changes = ContentDiff::compute(&old, &new);
        if changes.is_equivalent {
            continue;
        }
        let label = match against {
            DiffSource::Remote => "remote",
            DiffSource::Base => "base",
        };
        report.diffs.push(FileDiff {
            path: path.clone(),
            id: id.to_string(),
            against,
            unified: unified_diff(&format!("{label}/{path}"), &format!("local/{path}"), &old, &new),
            changes,
        });
    }
    Ok(report)
}
