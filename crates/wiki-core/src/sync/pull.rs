//! Pull: bring remote changes into the working tree
//!
//! Nodes are fetched concurrently, mapped to paths, then applied one at a
//! time, parents before children. A working file is only overwritten when
//! its hash still equals the recorded base, so local edits are never lost;
//! edits on both sides become a recorded conflict.

use std::collections::{HashMap, HashSet};

use wiki_content::{Document, has_markers, inject_markers};
use wiki_fs::{hash_text, io, join_relative, normalize, parent_dir};

use super::attachments::{self, attachment_dir};
use super::report::{PullReport, SkipReason, Tally};
use super::scope::{self, ScopeListing};
use crate::config::SyncContext;
use crate::mapper::{self, MapNode, Mapping, PathChange, children_dir, compare_ids, is_index};
use crate::remote::{ContentType, RemoteError, RemoteNode};
use crate::state::{BlobStore, PageRecord, StateStore, SyncState};
use crate::Result;

const ROOT_INDEX: &str = "index.md";

#[derive(Debug, Clone, Copy, Default)]
pub struct PullOptions {
    /// Overwrite local edits and occupied paths
    pub force: bool,
    /// Report what would happen without touching files or state
    pub dry_run: bool,
    /// Write inline conflict markers into the working file on conflict
    pub write_conflict_markers: bool,
}

/// Which nodes a pull applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullTarget {
    /// Every node in scope
    All,
    /// Nodes whose working file is, or will be, under this directory
    Under(String),
    /// A single tracked node
    Node(String),
}

/// One pull run over a loaded state
pub struct Puller<'a> {
    ctx: &'a SyncContext,
    state: &'a mut StateStore,
    options: PullOptions,
    base: BlobStore,
    conflicts: BlobStore,
    report: PullReport,
}

impl<'a> Puller<'a> {
    pub fn new(ctx: &'a SyncContext, state: &'a mut StateStore, options: PullOptions) -> Self {
        Self {
            base: BlobStore::base(ctx.root()),
            conflicts: BlobStore::conflicts(ctx.root()),
            ctx,
            state,
            options,
            report: PullReport::default(),
        }
    }

    /// Run the pull. Only failure to enumerate the scope is an error;
    /// everything per node lands in the report.
    pub async fn run(mut self, target: PullTarget) -> Result<PullReport> {
        let mut unavailable = HashSet::new();
        let mut stand_ins = Vec::new();

        let nodes = match &target {
            PullTarget::Node(id) => match self.ctx.remote().get_node(id).await {
                Ok(node) => {
                    // Other records anchor the node's parent directory
                    stand_ins = self
                        .state
                        .pages()
                        .filter(|(other, _)| *other != id.as_str())
                        .map(|(other, record)| MapNode::from_record(other, record))
                        .collect();
                    vec![node]
                }
                Err(RemoteError::NotFound { .. }) => {
                    tracing::warn!(id = %id, "Node no longer exists remotely");
                    self.report.remote_deleted.push(id.clone());
                    return Ok(self.report);
                }
                Err(e) => {
                    self.report.error(Some(id), None, e);
                    return Ok(self.report);
                }
            },
            PullTarget::All | PullTarget::Under(_) => {
                let listing = scope::list(self.ctx).await?;
                let (nodes, failed) = scope::fetch(self.ctx, &listing.ids).await;
                let mut gone = HashSet::new();
                for (id, error) in failed {
                    if matches!(error, RemoteError::NotFound { .. }) {
                        gone.insert(id);
                        continue;
                    }
                    self.report.error(Some(&id), None, &error);
                    match self.state.page(&id) {
                        Some(record) => stand_ins.push(MapNode::from_record(&id, record)),
                        None => {
                            unavailable.insert(id);
                        }
                    }
                }
                self.note_remote_deleted(&listing, &gone, &target);
                nodes
            }
        };

        let mut map_nodes: Vec<MapNode> = nodes.iter().map(MapNode::from).collect();
        map_nodes.extend(stand_ins);
        let plan = mapper::map_paths(
            &map_nodes,
            &mapper::placements(self.state),
            self.ctx.config().scope.kind,
            &unavailable,
        );

        let mut by_id: HashMap<String, RemoteNode> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();
        for failure in &plan.failures {
            if by_id.remove(&failure.id).is_some() {
                self.report.skip(
                    Some(&failure.id),
                    None,
                    SkipReason::Unmappable(failure.reason.clone()),
                );
            }
        }

        // (old, new) child directories of owners that stayed where they were
        let mut held: Vec<(String, String)> = Vec::new();
        for id in &plan.order {
            let (Some(node), Some(planned)) = (by_id.remove(id), plan.get(id)) else {
                continue;
            };
            let mapping = self.pinned(id, planned, &held).unwrap_or_else(|| planned.clone());
            // Nodes outside the target stay put, and so do their subtrees
            let placed = if !self.in_target(&target, id, &mapping.path) {
                false
            } else {
                match self.apply(node, &mapping).await {
                    Ok(placed) => placed,
                    Err(e) => {
                        self.report.error(Some(id), Some(&mapping.path), e);
                        false
                    }
                }
            };
            if !placed {
                if let PathChange::Moved { from } = &mapping.change {
                    let (old, new) = (children_dir(from), children_dir(&mapping.path));
                    if is_index(from) && !old.is_empty() && !new.is_empty() && old != new {
                        held.push((old, new));
                    }
                }
            }
        }

        tracing::info!(
            pulled = self.report.pulled,
            moved = self.report.moved,
            unchanged = self.report.unchanged,
            skipped = self.report.skipped.len(),
            conflicts = self.report.conflicts.len(),
            "Pull finished"
        );
        Ok(self.report)
    }

    /// Descendants of a directory owner whose move did not happen stay
    /// under its old directory, so the subtree keeps its `index.md`.
    fn pinned(&self, id: &str, mapping: &Mapping, held: &[(String, String)]) -> Option<Mapping> {
        let (old, new) = held.iter().find(|(_, new)| is_under(&mapping.path, new))?;
        let rest = mapping.path[new.len()..].trim_start_matches('/');
        let path = join_relative(old, rest);
        let change = match self.state.page(id) {
            None => PathChange::New,
            Some(record) if record.path == path => PathChange::Unchanged,
            Some(record) => PathChange::Moved {
                from: record.path.clone(),
            },
        };
        tracing::debug!(id, planned = %mapping.path, kept = %path, "Parent directory did not move");
        Some(Mapping { path, change })
    }

    fn in_target(&self, target: &PullTarget, id: &str, path: &str) -> bool {
        match target {
            PullTarget::All | PullTarget::Node(_) => true,
            PullTarget::Under(dir) => {
                is_under(path, dir) || self.state.page(id).is_some_and(|r| is_under(&r.path, dir))
            }
        }
    }

    /// Records in scope the remote no longer returns. Files are kept.
    fn note_remote_deleted(&mut self, listing: &ScopeListing, gone: &HashSet<String>, target: &PullTarget) {
        let listed: HashSet<&str> = listing.ids.iter().map(String::as_str).collect();
        let mut deleted: Vec<String> = self
            .state
            .pages()
            .filter(|(id, record)| {
                gone.contains(*id)
                    || (!listed.contains(id)
                        && !record.ancestors.iter().any(|a| listing.incomplete.contains(a)))
            })
            .filter(|(id, record)| self.in_target(target, id, &record.path))
            .map(|(id, _)| id.to_string())
            .collect();
        deleted.sort_by(|a, b| compare_ids(a, b));

        for id in &deleted {
            tracing::warn!(id = %id, "Node deleted remotely; local file left in place");
        }
        self.report.remote_deleted = deleted;
    }

    /// Returns whether the node now lives at the mapped path.
    async fn apply(&mut self, node: RemoteNode, mapping: &Mapping) -> Result<bool> {
        let markdown = match node.content_type {
            ContentType::Folder => String::new(),
            ContentType::Page => normalize(&self.ctx.converter().to_markdown(&node.body)),
        };
        let remote_hash = hash_text(&markdown);

        let Some(record) = self.state.page(&node.id).cloned() else {
            return self.apply_new(node, mapping, markdown, remote_hash).await;
        };
        let id = node.id.clone();

        let local = match self.read_document(&record.path)? {
            Ok(local) => local,
            Err(reason) => {
                self.report.skip(Some(&id), Some(&record.path), SkipReason::Malformed(reason));
                return Ok(false);
            }
        };
        let local_hash = local.as_ref().map(|d| hash_text(&d.body));
        let in_step = local_hash.as_deref() == Some(remote_hash.as_str());
        let local_changed = local_hash.as_ref().is_some_and(|h| *h != record.base_hash);

        if local_changed && !in_step && !self.options.force {
            if record.remote_diverged(&remote_hash) {
                self.record_conflict(&id, &record, local, &markdown, &remote_hash)?;
                return Ok(false);
            }
            if !self.options.dry_run {
                if let Some(current) = self.state.page_mut(&id) {
                    current.local_hash = local_hash.unwrap_or_default();
                    current.sync_state = SyncState::LocalModified;
                }
            }
            self.report.skip(Some(&id), Some(&record.path), SkipReason::LocalChanges);
            return Ok(false);
        }

        let moving = mapping.path != record.path;
        let body_changed = !in_step;
        let needs_write = body_changed
            || node.title != record.title
            || node.content_type != record.content_type
            || local.as_ref().is_some_and(|d| d.id() != Some(id.as_str()));

        if self.options.dry_run {
            if moving {
                self.report.plan(format!("Would move {} -> {}", record.path, mapping.path));
                self.report.moved += 1;
            }
            if body_changed {
                self.report.plan(format!("Would write {}", mapping.path));
                self.report.pulled += 1;
            } else if !moving {
                self.report.unchanged += 1;
            }
            self.finish(&node, &mapping.path, &markdown, &remote_hash).await?;
            return Ok(true);
        }

        if moving {
            if !self.relocate(&id, &record.path, &mapping.path, local.is_some())? {
                return Ok(false);
            }
            self.report.moved += 1;
        }

        if needs_write {
            let document = render(&node, local.as_ref(), &markdown);
            io::write_text(&self.ctx.root().join(&mapping.path), &document.render()?)?;
            tracing::debug!(id = %id, path = %mapping.path, "Wrote working file");
        }
        if body_changed {
            self.report.pulled += 1;
        } else if !moving {
            self.report.unchanged += 1;
        }

        self.finish(&node, &mapping.path, &markdown, &remote_hash).await?;
        Ok(true)
    }

    /// A node without a record: create its file, or adopt an identical one.
    async fn apply_new(
        &mut self,
        node: RemoteNode,
        mapping: &Mapping,
        markdown: String,
        remote_hash: String,
    ) -> Result<bool> {
        let path = mapping.path.as_str();
        let occupant = match self.read_document(path)? {
            Ok(doc) => doc.map(Some),
            // Unparseable file still occupies the path
            Err(_) => Some(None),
        };
        let adopt = matches!(
            &occupant,
            Some(Some(doc)) if hash_text(&doc.body) == remote_hash
                && doc.id().is_none_or(|existing| existing == node.id)
        );

        if occupant.is_some() && !adopt && !self.options.force {
            self.report.skip(Some(&node.id), Some(path), SkipReason::PathOccupied);
            return Ok(false);
        }

        if self.options.dry_run {
            self.report.plan(format!("Would create {path}"));
        } else {
            let existing = occupant.flatten();
            let document = render(&node, existing.as_ref(), &markdown);
            io::write_text(&self.ctx.root().join(path), &document.render()?)?;
            if adopt {
                tracing::info!(id = %node.id, path, "Adopted existing file with identical content");
            } else {
                tracing::info!(id = %node.id, path, "Created working file");
            }
        }
        self.report.pulled += 1;
        self.finish(&node, path, &markdown, &remote_hash).await?;
        Ok(true)
    }

    /// Sync the page's attachments, then store the new base and the
    /// synced record. A failed attachment leaves the record as it was.
    async fn finish(&mut self, node: &RemoteNode, path: &str, markdown: &str, hash: &str) -> Result<()> {
        let dry_run = self.options.dry_run;
        let has_attachments = match node.content_type {
            ContentType::Page => {
                attachments::pull_page(
                    self.ctx,
                    self.state,
                    &node.id,
                    path,
                    markdown,
                    dry_run,
                    &mut self.report,
                )
                .await?
            }
            ContentType::Folder => false,
        };
        if dry_run {
            return Ok(());
        }

        self.base.write(&node.id, markdown)?;
        self.conflicts.remove(&node.id)?;

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
            has_attachments,
        };
        record.mark_synced(hash);
        self.state.upsert_page(&node.id, record);
        Ok(())
    }

    /// Both sides changed: capture the remote body and mark the record.
    fn record_conflict(
        &mut self,
        id: &str,
        record: &PageRecord,
        local: Option<Document>,
        markdown: &str,
        remote_hash: &str,
    ) -> Result<()> {
        self.report.conflict(id, &record.path, None);
        if self.options.dry_run {
            self.report.plan(format!("Would record conflict on {}", record.path));
            return Ok(());
        }

        self.conflicts.write(id, markdown)?;
        let local_hash = local.as_ref().map(|d| hash_text(&d.body)).unwrap_or_default();

        let mut wrote_markers = false;
        if let Some(mut document) = local.filter(|_| self.options.write_conflict_markers) {
            if !has_markers(&document.body) {
                document.body = inject_markers(&normalize(&document.body), markdown);
                io::write_text(&self.ctx.root().join(&record.path), &document.render()?)?;
                wrote_markers = true;
            }
        }

        if let Some(current) = self.state.page_mut(id) {
            current.local_hash = local_hash;
            current.remote_hash = remote_hash.to_string();
            current.sync_state = SyncState::Conflict;
        }
        if !wrote_markers {
            self.report.skip(Some(id), Some(&record.path), SkipReason::LocalChanges);
        }
        Ok(())
    }

    /// Move a working file (or an `index.md` node's whole directory).
    ///
    /// Returns false when the destination is occupied and the move skipped.
    fn relocate(&mut self, id: &str, from: &str, to: &str, local_exists: bool) -> Result<bool> {
        let root = self.ctx.root().clone();
        if !local_exists {
            self.state.set_path(id, to);
            return Ok(true);
        }

        let dir_move = is_index(from) && is_index(to) && from != ROOT_INDEX && to != ROOT_INDEX;
        if dir_move {
            let (src, dst) = (parent_dir(from), parent_dir(to));
            if !root.join(dst).exists() {
                io::move_path(&root.join(src), &root.join(dst))?;
                let moved = self.state.rebase_prefix(src, dst);
                io::prune_empty_dirs(&root.join(parent_dir(src)), &root);
                tracing::info!(id, from = src, to = dst, nodes = moved.len(), "Moved directory");
                return Ok(true);
            }
        }

        let destination = root.join(to);
        if destination.exists() {
            if !self.options.force {
                self.report.skip(Some(id), Some(to), SkipReason::PathOccupied);
                return Ok(false);
            }
            io::remove_file(&destination)?;
        }
        io::move_path(&root.join(from), &destination)?;

        let (old_attachments, new_attachments) = (attachment_dir(from), attachment_dir(to));
        if root.join(&old_attachments).is_dir() && !root.join(&new_attachments).exists() {
            io::move_path(&root.join(&old_attachments), &root.join(&new_attachments))?;
        }

        self.state.set_path(id, to);
        io::prune_empty_dirs(&root.join(parent_dir(from)), &root);
        tracing::info!(id, from, to, "Moved file");
        Ok(true)
    }

    /// Parsed working file at `path`; the inner error carries a parse
    /// failure message.
    fn read_document(&self, path: &str) -> Result<std::result::Result<Option<Document>, String>> {
        let Some(text) = io::read_text_opt(&self.ctx.root().join(path))? else {
            return Ok(Ok(None));
        };
        Ok(Document::parse(&text).map(Some).map_err(|e| e.to_string()))
    }
}

/// Working file for a node, keeping unknown frontmatter keys of `existing`.
fn render(node: &RemoteNode, existing: Option<&Document>, markdown: &str) -> Document {
    let mut frontmatter = existing
        .and_then(|d| d.frontmatter.clone())
        .unwrap_or_default();
    frontmatter.id = Some(node.id.clone());
    frontmatter.title = Some(node.title.clone());
    frontmatter.folder = node.content_type == ContentType::Folder;
    Document {
        frontmatter: Some(frontmatter),
        body: markdown.to_string(),
    }
}

fn is_under(path: &str, dir: &str) -> bool {
    dir.is_empty() || path == dir || path.starts_with(&format!("{dir}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_matches_directory_prefix_only() {
        assert!(is_under("guide/a.md", "guide"));
        assert!(is_under("guide/a.md", ""));
        assert!(!is_under("guidebook.md", "guide"));
    }

    #[test]
    fn render_keeps_extra_keys_and_sets_identity() {
        let existing = Document::parse("---\nid: '1'\ntitle: Old\nowner: me\n---\n\nold\n").unwrap();
        let node = RemoteNode {
            id: "1".into(),
            title: "New".into(),
            body: "new\n".into(),
            version: 2,
            parent_id: None,
            ancestors: vec![],
            content_type: ContentType::Page,
            space_key: "DOCS".into(),
        };
        let text = render(&node, Some(&existing), "new\n").render().unwrap();
        assert!(text.contains("title: New"));
        assert!(text.contains("owner: me"));
        assert!(text.ends_with("\nnew\n"));
    }
}
