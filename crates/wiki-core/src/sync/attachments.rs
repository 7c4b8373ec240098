//! Attachment sync
//!
//! Attachments follow the same reconciliation rules as page bodies, with
//! hashes taken over their base64 encoding. Only attachments a page body
//! references are downloaded or uploaded. A binary conflict never
//! overwrites the local file: the remote copy is written beside it.

use futures::future::join_all;

use wiki_content::{attachment_dir_name, attachment_refs};
use wiki_fs::{NormalizedPath, hash_bytes, io, join_relative, parent_dir};

use super::report::Tally;
use crate::config::SyncContext;
use crate::remote::{NewAttachment, RemoteAttachment};
use crate::state::{AttachmentRecord, StateStore, SyncState};
use crate::Result;

/// Name for the remote copy of a conflicting attachment:
/// `diagram.png` at version 3 becomes `diagram.conflict-v3.png`.
pub fn conflict_file_name(filename: &str, version: u64) -> String {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => format!(
            "{}.conflict-v{}{}",
            &filename[..idx],
            version,
            &filename[idx..]
        ),
        _ => format!("{filename}.conflict-v{version}"),
    }
}

/// Attachment directory of a page file, workspace-relative.
pub fn attachment_dir(page_path: &str) -> String {
    let file_name = page_path.rsplit('/').next().unwrap_or(page_path);
    join_relative(parent_dir(page_path), &attachment_dir_name(file_name))
}

fn referenced(page_path: &str, body: &str) -> Vec<String> {
    let file_name = page_path.rsplit('/').next().unwrap_or(page_path);
    attachment_refs(body, file_name)
}

fn media_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn read_opt(path: &NormalizedPath) -> Result<Option<Vec<u8>>> {
    if path.is_file() {
        Ok(Some(io::read_bytes(path)?))
    } else {
        Ok(None)
    }
}

struct Download {
    remote: RemoteAttachment,
    local_hash: Option<String>,
    record: Option<AttachmentRecord>,
}

/// Bring referenced attachments of one page up to date with the remote.
///
/// Returns whether the page references any attachment.
pub(crate) async fn pull_page<R: Tally>(
    ctx: &SyncContext,
    state: &mut StateStore,
    page_id: &str,
    page_path: &str,
    body: &str,
    dry_run: bool,
    report: &mut R,
) -> Result<bool> {
    let refs = referenced(page_path, body);
    if refs.is_empty() {
        return Ok(false);
    }
    let dir = attachment_dir(page_path);
    let root = ctx.root();

    let listed = match ctx.remote().list_attachments(page_id).await {
        Ok(listed) => listed,
        Err(e) => {
            report.error(Some(page_id), Some(page_path), e);
            return Ok(true);
        }
    };

    let mut pending = Vec::new();
    for name in &refs {
        let Some(remote) = listed.iter().find(|a| a.filename == *name) else {
            tracing::debug!(page = page_id, file = %name, "Referenced attachment not on remote");
            continue;
        };
        let local = read_opt(&root.join(&join_relative(&dir, name)))?;
        let local_hash = local.as_deref().map(hash_bytes);
        let record = state.attachment(page_id, &remote.id).cloned();

        let remote_moved = record.as_ref().is_none_or(|r| r.version != remote.version);
        if !remote_moved {
            if let (Some(hash), Some(mut current)) = (local_hash.clone(), record.clone()) {
                current.sync_state = if hash == current.base_hash {
                    SyncState::Synced
                } else {
                    SyncState::LocalModified
                };
                current.local_hash = hash;
                state.upsert_attachment(page_id, &remote.id, current);
                report.attachments_mut().unchanged += 1;
                continue;
            }
        }
        pending.push(Download {
            remote: remote.clone(),
            local_hash,
            record,
        });
    }

    if dry_run {
        for item in &pending {
            report.plan(format!(
                "Would download {}",
                join_relative(&dir, &item.remote.filename)
            ));
        }
        return Ok(true);
    }

    let remote = ctx.remote();
    let downloads = join_all(
        pending
            .iter()
            .map(|item| remote.download_attachment(page_id, &item.remote.id)),
    )
    .await;

    for (item, result) in pending.into_iter().zip(downloads) {
        let target = join_relative(&dir, &item.remote.filename);
        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                report.error(Some(page_id), Some(&target), e);
                continue;
            }
        };
        let remote_hash = hash_bytes(&bytes);
        let local_changed = match (&item.local_hash, &item.record) {
            (Some(local), Some(record)) => *local != record.base_hash,
            (Some(local), None) => *local != remote_hash,
            (None, _) => false,
        };

        if item.local_hash.as_deref() == Some(remote_hash.as_str()) || !local_changed {
            if item.local_hash.as_deref() != Some(remote_hash.as_str()) {
                io::write_atomic(&root.join(&target), &bytes)?;
                report.attachments_mut().downloaded += 1;
                tracing::info!(page = page_id, file = %target, "Downloaded attachment");
            }
            state.upsert_attachment(
                page_id,
                &item.remote.id,
                AttachmentRecord::synced(
                    &item.remote.filename,
                    &item.remote.media_type,
                    item.remote.file_size,
                    item.remote.version,
                    &remote_hash,
                ),
            );
            continue;
        }

        let copy = join_relative(
            &dir,
            &conflict_file_name(&item.remote.filename, item.remote.version),
        );
        io::write_atomic(&root.join(&copy), &bytes)?;

        // Never synced: no base, version 0
        let mut record = item.record.unwrap_or_else(|| AttachmentRecord {
            last_synced_at: None,
            ..AttachmentRecord::synced(
                &item.remote.filename,
                &item.remote.media_type,
                item.remote.file_size,
                0,
                "",
            )
        });
        record.local_hash = item.local_hash.unwrap_or_default();
        record.remote_hash = remote_hash;
        record.sync_state = SyncState::Conflict;
        state.upsert_attachment(page_id, &item.remote.id, record);
        report.conflict(page_id, &target, Some(&item.remote.filename));
    }

    Ok(true)
}

enum Upload {
    Create(NewAttachment),
    Replace { id: String, content: NewAttachment },
}

struct PendingUpload {
    op: Upload,
    hash: String,
}

/// Upload new or changed referenced attachments of one page and delete
/// recorded remote attachments that are gone locally.
///
/// Returns whether the page references any attachment.
pub(crate) async fn push_page<R: Tally>(
    ctx: &SyncContext,
    state: &mut StateStore,
    page_id: &str,
    page_path: &str,
    body: &str,
    dry_run: bool,
    report: &mut R,
) -> Result<bool> {
    let refs = referenced(page_path, body);
    let has_records = state.attachments(page_id).next().is_some();
    if refs.is_empty() && !has_records {
        return Ok(false);
    }
    let dir = attachment_dir(page_path);
    let root = ctx.root();

    let listed = match ctx.remote().list_attachments(page_id).await {
        Ok(listed) => listed,
        Err(e) => {
            report.error(Some(page_id), Some(page_path), e);
            return Ok(!refs.is_empty());
        }
    };

    let mut uploads = Vec::new();
    for name in &refs {
        let path = root.join(&join_relative(&dir, name));
        let Some(data) = read_opt(&path)? else {
            tracing::warn!(page = page_id, file = %name, "Referenced attachment missing locally");
            continue;
        };
        let hash = hash_bytes(&data);
        let content = NewAttachment {
            filename: name.clone(),
            media_type: media_type(name),
            data,
        };

        match listed.iter().find(|a| a.filename == *name) {
            None => uploads.push(PendingUpload {
                op: Upload::Create(content),
                hash,
            }),
            Some(remote) => {
                let unchanged = state
                    .attachment(page_id, &remote.id)
                    .is_some_and(|r| r.base_hash == hash);
                if unchanged {
                    report.attachments_mut().unchanged += 1;
                    continue;
                }
                uploads.push(PendingUpload {
                    op: Upload::Replace {
                        id: remote.id.clone(),
                        content,
                    },
                    hash,
                });
            }
        }
    }

    // Only attachments this workspace recorded may be deleted remotely
    let deletions: Vec<&RemoteAttachment> = listed
        .iter()
        .filter(|a| !refs.contains(&a.filename))
        .filter(|a| state.attachment(page_id, &a.id).is_some())
        .filter(|a| !root.join(&join_relative(&dir, &a.filename)).exists())
        .collect();

    let vanished: Vec<String> = state
        .attachments(page_id)
        .filter(|(id, record)| {
            !listed.iter().any(|a| a.id == *id) && !refs.contains(&record.filename)
        })
        .map(|(id, _)| id.to_string())
        .collect();
    for id in vanished {
        if !dry_run {
            state.remove_attachment(page_id, &id);
        }
    }

    if dry_run {
        for upload in &uploads {
            let name = match &upload.op {
                Upload::Create(content) | Upload::Replace { content, .. } => &content.filename,
            };
            report.plan(format!("Would upload {}", join_relative(&dir, name)));
        }
        for attachment in &deletions {
            report.plan(format!("Would delete remote attachment {}", attachment.filename));
        }
        return Ok(!refs.is_empty());
    }

    let remote = ctx.remote();
    let results = join_all(uploads.iter().map(|upload| async move {
        match &upload.op {
            Upload::Create(content) => remote.upload_attachment(page_id, content.clone()).await,
            Upload::Replace { id, content } => {
                remote.update_attachment(page_id, id, content.clone()).await
            }
        }
    }))
    .await;

    for (upload, result) in uploads.iter().zip(results) {
        match result {
            Ok(attachment) => {
                tracing::info!(page = page_id, file = %attachment.filename, "Uploaded attachment");
                state.upsert_attachment(
                    page_id,
                    &attachment.id,
                    AttachmentRecord::synced(
                        &attachment.filename,
                        &attachment.media_type,
                        attachment.file_size,
                        attachment.version,
                        &upload.hash,
                    ),
                );
                report.attachments_mut().uploaded += 1;
            }
            Err(e) => report.error(Some(page_id), Some(page_path), e),
        }
    }

    for attachment in deletions {
        match remote.delete_attachment(page_id, &attachment.id).await {
            Ok(()) => {
                tracing::info!(page = page_id, file = %attachment.filename, "Deleted remote attachment");
                state.remove_attachment(page_id, &attachment.id);
                report.attachments_mut().deleted += 1;
            }
            Err(e) => report.error(Some(page_id), Some(page_path), e),
        }
    }

    Ok(!refs.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("diagram.png", 3, "diagram.conflict-v3.png")]
    #[case("archive.tar.gz", 2, "archive.tar.conflict-v2.gz")]
    #[case("README", 5, "README.conflict-v5")]
    #[case(".hidden", 1, ".hidden.conflict-v1")]
    fn conflict_names(#[case] name: &str, #[case] version: u64, #[case] expected: &str) {
        assert_eq!(conflict_file_name(name, version), expected);
    }

    #[rstest]
    #[case("guide/setup.md", "guide/setup.attachments")]
    #[case("index.md", "index.attachments")]
    fn attachment_dirs(#[case] page: &str, #[case] expected: &str) {
        assert_eq!(attachment_dir(page), expected);
    }

    #[test]
    fn media_types_are_guessed() {
        assert_eq!(media_type("a.png"), "image/png");
        assert_eq!(media_type("blob.unknownext"), "application/octet-stream");
    }
}
