//! Push: upload local edits
//!
//! Only files whose body differs from the recorded base are uploaded. The
//! directory a file sits in implies its parent node; a mismatch with the
//! recorded parent re-parents the node remotely before its body is sent.

use serde::Serialize;

use wiki_content::has_markers;
use wiki_fs::{hash_text, io, join_relative, normalize};

use super::attachments;
use super::files::LocalFile;
use super::report::{AttachmentCounts, Overwritten, PushReport, SkipReason, Tally};
use crate::config::SyncContext;
use crate::mapper::parent_entry_dir;
use crate::remote::{ContentType, NewNode, NodeUpdate, RemoteError};
use crate::state::{BlobStore, PageRecord, StateStore, SyncState};
use crate::{Error, Result};

const INDEX_FILE: &str = "index.md";

#[derive(Debug, Clone, Copy, Default)]
pub struct PushOptions {
    /// Upload every tracked file, changed or not, and push files in conflict
    pub force: bool,
    pub dry_run: bool,
}

/// Result of creating a remote node for an untracked file
#[derive(Debug, Clone, Serialize)]
pub struct CreateOutcome {
    pub id: String,
    pub path: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub attachments: AttachmentCounts,
}

/// One push run over a loaded state
pub struct Pusher<'a> {
    ctx: &'a SyncContext,
    state: &'a mut StateStore,
    options: PushOptions,
    base: BlobStore,
    report: PushReport,
}

impl<'a> Pusher<'a> {
    pub fn new(ctx: &'a SyncContext, state: &'a mut StateStore, options: PushOptions) -> Self {
        Self {
            base: BlobStore::base(ctx.root()),
            ctx,
            state,
            options,
            report: PushReport::default(),
        }
    }

    /// Push the given workspace-relative files.
    pub async fn run(mut self, paths: &[String]) -> Result<PushReport> {
        // Renames first, so directory-implied parents see final paths
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            match LocalFile::read(self.ctx.root(), path, self.state) {
                Ok(file) => {
                    self.note_rename(&file);
                    files.push(file);
                }
                Err(Error::Content(e)) => {
                    self.report
                        .skip(None, Some(path), SkipReason::Malformed(e.to_string()));
                }
                Err(e) => self.report.error(None, Some(path), e),
            }
        }

        for file in files {
            if let Err(e) = self.push_file(&file).await {
                self.report.error(file.id(), Some(&file.path), e);
            }
        }

        tracing::info!(
            pushed = self.report.pushed,
            moved = self.report.moved,
            unchanged = self.report.unchanged,
            skipped = self.report.skipped.len(),
            "Push finished"
        );
        Ok(self.report)
    }

    /// A tracked id found at a path other than its recorded one.
    fn note_rename(&mut self, file: &LocalFile) {
        let Some(id) = file.id() else {
            return;
        };
        let Some(record) = self.state.page(id) else {
            return;
        };
        if record.path == file.path {
            return;
        }
        let from = record.path.clone();
        if self.options.dry_run {
            self.report
                .plan(format!("Would record local rename {} -> {}", from, file.path));
        } else {
            tracing::info!(id, from = %from, to = %file.path, "Recorded local rename");
            self.state.set_path(id, &file.path);
        }
    }

    async fn push_file(&mut self, file: &LocalFile) -> Result<()> {
        let path = file.path.as_str();
        let Some(id) = file.id().map(str::to_string) else {
            self.report.skip(None, Some(path), SkipReason::Untracked);
            return Ok(());
        };
        let Some(record) = self.state.page(&id).cloned() else {
            self.report.skip(Some(&id), Some(path), SkipReason::NotRecorded);
            return Ok(());
        };

        let body = normalize(&file.document.body);
        if !self.options.force
            && (record.sync_state == SyncState::Conflict || has_markers(&body))
        {
            self.report
                .skip(Some(&id), Some(path), SkipReason::UnresolvedConflict);
            return Ok(());
        }

        self.align_parent(&id, &record, path).await;
        let record = self.state.page(&id).cloned().unwrap_or(record);

        if record.is_folder() {
            self.report.unchanged += 1;
            return Ok(());
        }

        let local_hash = hash_text(&body);
        let title = file
            .tracking
            .title()
            .unwrap_or(record.title.as_str())
            .to_string();

        if !self.options.force && local_hash == record.base_hash && title == record.title {
            self.report.unchanged += 1;
            let has_attachments = attachments::push_page(
                self.ctx,
                self.state,
                &id,
                path,
                &body,
                self.options.dry_run,
                &mut self.report,
            )
            .await?;
            if !self.options.dry_run {
                if let Some(current) = self.state.page_mut(&id) {
                    current.local_hash = local_hash;
                    current.has_attachments = has_attachments;
                }
            }
            return Ok(());
        }

        if self.options.dry_run {
            self.report.plan(format!("Would push {path}"));
            self.report.pushed += 1;
            return Ok(());
        }

        let remote = self.ctx.remote();
        let current = match remote.get_node(&id).await {
            Ok(node) => node,
            Err(e) => {
                self.report.error(Some(&id), Some(path), e);
                return Ok(());
            }
        };
        let replaced = (current.version != record.version).then(|| Overwritten {
            id: id.clone(),
            path: path.to_string(),
            recorded_version: record.version,
            replaced_version: current.version,
        });

        let update = NodeUpdate {
            title: title.clone(),
            body: self.ctx.converter().to_storage(&body),
            version: current.version + 1,
        };
        let updated = match remote.update_node(&id, update).await {
            Ok(node) => node,
            Err(RemoteError::VersionConflict { .. }) => {
                if let Some(current) = self.state.page_mut(&id) {
                    current.local_hash = local_hash;
                    current.sync_state = SyncState::RemoteModified;
                }
                self.report.conflict(&id, path, None);
                return Ok(());
            }
            Err(e) => {
                self.report.error(Some(&id), Some(path), e);
                return Ok(());
            }
        };

        // Attachments land before the page is recorded as synced
        let has_attachments = attachments::push_page(
            self.ctx,
            self.state,
            &id,
            path,
            &body,
            false,
            &mut self.report,
        )
        .await?;

        self.base.write(&id, &body)?;
        if let Some(current) = self.state.page_mut(&id) {
            current.title = updated.title;
            current.version = updated.version;
            current.has_attachments = has_attachments;
            current.mark_synced(&local_hash);
        }
        if let Some(replaced) = replaced {
            tracing::warn!(
                id = %replaced.id,
                recorded = replaced.recorded_version,
                replaced = replaced.replaced_version,
                "Pushed over a remote edit that was never pulled"
            );
            self.report.overwritten.push(replaced);
        }
        self.report.pushed += 1;
        tracing::info!(id = %id, path, version = updated.version, "Pushed page");
        Ok(())
    }

    /// Re-parent the node remotely when its directory implies another parent.
    async fn align_parent(&mut self, id: &str, record: &PageRecord, path: &str) {
        let Some(parent) = self.implied_parent(path, id) else {
            return;
        };
        if record.parent_id.as_deref() == Some(parent.as_str()) {
            return;
        }
        if self.options.dry_run {
            self.report
                .plan(format!("Would move node {id} under {parent}"));
            self.report.moved += 1;
            return;
        }

        match self.ctx.remote().move_node(id, &parent).await {
            Ok(moved) => {
                tracing::info!(id, parent = %parent, "Moved node to match local directory");
                if let Some(current) = self.state.page_mut(id) {
                    current.parent_id = moved.parent_id;
                    current.ancestors = moved.ancestors;
                    current.version = moved.version;
                }
                self.report.moved += 1;
            }
            Err(e) => self.report.error(Some(id), Some(path), e),
        }
    }

    /// The node whose `index.md` owns the directory `path` sits in.
    fn implied_parent(&self, path: &str, own_id: &str) -> Option<String> {
        let index = join_relative(parent_entry_dir(path), INDEX_FILE);
        self.state
            .id_for_path(&index)
            .filter(|parent| *parent != own_id)
            .map(str::to_string)
    }

    /// Create a remote page for an untracked file and start tracking it.
    ///
    /// Without an explicit `parent`, the directory-implied parent is used.
    pub async fn create(mut self, path: &str, parent: Option<&str>) -> Result<CreateOutcome> {
        let mut file = LocalFile::read(self.ctx.root(), path, self.state)?;
        if let Some(id) = file.id() {
            return Err(Error::AlreadyTracked {
                path: path.to_string(),
                id: id.to_string(),
            });
        }

        let title = file
            .document
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| title_from_path(path));
        let parent_id = parent
            .map(str::to_string)
            .or_else(|| self.implied_parent(path, ""));
        let body = normalize(&file.document.body);

        let node = self
            .ctx
            .remote()
            .create_node(NewNode {
                space_key: self.ctx.config().space.clone(),
                title: title.clone(),
                body: self.ctx.converter().to_storage(&body),
                parent_id: parent_id.clone(),
                content_type: ContentType::Page,
            })
            .await?;
        tracing::info!(id = %node.id, path, "Created remote page");

        let mut frontmatter = file.document.frontmatter.take().unwrap_or_default();
        frontmatter.id = Some(node.id.clone());
        frontmatter.title = Some(node.title.clone());
        file.document.frontmatter = Some(frontmatter);
        file.document.body = body.clone();
        io::write_text(&self.ctx.root().join(path), &file.document.render()?)?;

        let hash = hash_text(&body);
        let mut record = PageRecord {
            path: path.to_string(),
            title: node.title.clone(),
            space_key: node.space_key.clone(),
            version: node.version,
            parent_id: node.parent_id.clone(),
            ancestors: node.ancestors.clone(),
            content_type: node.content_type,
            local_hash: String::new(),
            remote_hash: String::new(),
            base_hash: String::new(),
            sync_state: SyncState::Synced,
            last_synced_at: None,
            has_attachments: false,
        };
        record.mark_synced(&hash);
        self.state.upsert_page(&node.id, record);
        self.base.write(&node.id, &body)?;

        let has_attachments = attachments::push_page(
            self.ctx,
            self.state,
            &node.id,
            path,
            &body,
            false,
            &mut self.report,
        )
        .await?;
        if let Some(current) = self.state.page_mut(&node.id) {
            current.has_attachments = has_attachments;
        }

        Ok(CreateOutcome {
            id: node.id,
            path: path.to_string(),
            title: node.title,
            parent_id: node.parent_id,
            attachments: self.report.attachments,
        })
    }
}

/// `guide/getting-started.md` -> `getting started`; `guide/index.md` -> `guide`.
fn title_from_path(path: &str) -> String {
    let file = path.rsplit('/').next().unwrap_or(path);
    let stem = if file == INDEX_FILE {
        wiki_fs::parent_dir(path)
            .rsplit('/')
            .next()
            .unwrap_or_default()
    } else {
        file.strip_suffix(".md").unwrap_or(file)
    };
    let title = stem.replace(['-', '_'], " ");
    if title.trim().is_empty() {
        "Untitled".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("guide/getting-started.md", "getting started")]
    #[case("guide/index.md", "guide")]
    #[case("notes_2024.md", "notes 2024")]
    #[case("index.md", "Untitled")]
    fn titles_from_paths(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(title_from_path(path), expected);
    }
}
