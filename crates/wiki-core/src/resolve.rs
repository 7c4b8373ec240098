//! Conflict resolution
//!
//! Resolving a conflict settles the working file's content and moves the
//! record's base to the remote content seen when the conflict was recorded.
//! The result is a plain local modification, ready to push.

use serde::Serialize;

use wiki_content::{Document, Side, has_markers, strip_markers};
use wiki_fs::{NormalizedPath, hash_text, io};

use crate::state::{BlobStore, StateStore, SyncState};
use crate::tracking::Tracking;
use crate::{Error, Result};

/// Which content wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Keep the local side
    Local,
    /// Take the remote side
    Remote,
    /// Accept the file as edited by hand; refused while markers remain
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveOutcome {
    pub id: String,
    pub path: String,
    pub resolution: Resolution,
    pub state: SyncState,
}

/// Resolve the conflict on the working file at `path`.
pub fn resolve(
    root: &NormalizedPath,
    state: &mut StateStore,
    path: &str,
    resolution: Resolution,
) -> Result<ResolveOutcome> {
    let file = root.join(path);
    let mut document = Document::parse(&io::read_text(&file)?)?;
    let id = Tracking::resolve(&document, path, state)
        .id()
        .map(str::to_string)
        .ok_or_else(|| Error::NotTracked {
            path: path.to_string(),
        })?;
    let record = state.page(&id).cloned().ok_or_else(|| Error::NotTracked {
        path: path.to_string(),
    })?;
    let conflicts = BlobStore::conflicts(root);

    let marked = has_markers(&document.body);
    if record.sync_state != SyncState::Conflict && !marked {
        return Err(Error::NotInConflict {
            path: path.to_string(),
        });
    }
    let body = match (resolution, marked) {
        (Resolution::Manual, true) => {
            return Err(Error::MarkersPresent {
                path: path.to_string(),
            });
        }
        (Resolution::Manual, false) | (Resolution::Local, false) => document.body.clone(),
        (Resolution::Local, true) => strip_markers(&document.body, Side::Local)?,
        (Resolution::Remote, true) => strip_markers(&document.body, Side::Remote)?,
        (Resolution::Remote, false) => match conflicts.read(&id)? {
            Some(remote) => remote,
            None if record.remote_hash == record.base_hash => BlobStore::base(root)
                .read(&id)?
                .ok_or_else(|| Error::NoRemoteSnapshot { id: id.clone() })?,
            None => return Err(Error::NoRemoteSnapshot { id }),
        },
    };

    if body != document.body {
        document.body = body;
        io::write_text(&file, &document.render()?)?;
    }

    let local_hash = hash_text(&document.body);
    if let Some(current) = state.page_mut(&id) {
        current.local_hash = local_hash;
        current.base_hash = current.remote_hash.clone();
        current.sync_state = SyncState::LocalModified;
    }
    conflicts.remove(&id)?;

    tracing::info!(id = %id, path, ?resolution, "Conflict resolved");
    Ok(ResolveOutcome {
        id,
        path: path.to_string(),
        resolution,
        state: SyncState::LocalModified,
    })
}
