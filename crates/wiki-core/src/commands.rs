//! Command entry points
//!
//! Each command takes a workspace-relative target given as a filesystem
//! path, loads the state, runs, and saves the state unless nothing may be
//! written. Results are structured reports for any front end to render.

use std::path::Path;

use wiki_content::Document;
use wiki_fs::io;

use crate::config::{SyncContext, Workspace, WorkspaceConfig};
use crate::ignore::IgnoreFilter;
use crate::resolve::{self, Resolution, ResolveOutcome};
use crate::state::StateStore;
use crate::status::{self, DiffReport, StatusReport};
use crate::sync::{
    CreateOutcome, PullOptions, PullReport, PullTarget, Puller, PushOptions, PushReport, Pusher,
    markdown_files,
};
use crate::tracking::Tracking;
use crate::{Error, Result};

/// Initialize a workspace at `dir` with an empty state.
pub fn init(dir: &Path, config: WorkspaceConfig) -> Result<Workspace> {
    let workspace = Workspace::create(dir, config)?;
    let mut state = StateStore::load(workspace.root())?;
    state.save()?;
    tracing::info!(root = %workspace.root(), space = %workspace.config().space, "Initialized workspace");
    Ok(workspace)
}

/// Pull the whole scope, a directory, or one tracked file.
pub async fn pull(ctx: &SyncContext, target: &Path, options: PullOptions) -> Result<PullReport> {
    let relative = ctx.workspace().relative(target)?;
    let mut state = StateStore::load(ctx.root())?;

    let target = if relative.is_empty() {
        PullTarget::All
    } else if ctx.root().join(&relative).is_file() {
        PullTarget::Node(tracked_id(ctx.workspace(), &state, &relative)?)
    } else {
        PullTarget::Under(relative)
    };

    let report = Puller::new(ctx, &mut state, options).run(target).await?;
    if !options.dry_run {
        state.save()?;
    }
    Ok(report)
}

/// Push files at or under `target`.
pub async fn push(ctx: &SyncContext, target: &Path, options: PushOptions) -> Result<PushReport> {
    let relative = ctx.workspace().relative(target)?;
    let filter = IgnoreFilter::load(ctx.root())?;
    let files = markdown_files(ctx.root(), &relative, &filter)?;
    let mut state = StateStore::load(ctx.root())?;

    let report = Pusher::new(ctx, &mut state, options).run(&files).await?;
    if !options.dry_run {
        state.save()?;
    }
    Ok(report)
}

/// Classify files at or under `target`. Writes nothing.
pub async fn status(ctx: &SyncContext, target: &Path, check_remote: bool) -> Result<StatusReport> {
    let relative = ctx.workspace().relative(target)?;
    let filter = IgnoreFilter::load(ctx.root())?;
    let files = markdown_files(ctx.root(), &relative, &filter)?;
    let state = StateStore::load(ctx.root())?;
    status::status(ctx, &state, &files, &relative, check_remote).await
}

/// Diff files at or under `target` against the remote, or against the
/// recorded base when `use_remote` is false. Writes nothing.
pub async fn diff(ctx: &SyncContext, target: &Path, use_remote: bool) -> Result<DiffReport> {
    let relative = ctx.workspace().relative(target)?;
    let filter = IgnoreFilter::load(ctx.root())?;
    let files = markdown_files(ctx.root(), &relative, &filter)?;
    let state = StateStore::load(ctx.root())?;
    status::diff(ctx, &state, &files, use_remote).await
}

/// Settle the conflict on one file. Needs no remote access.
pub fn resolve(workspace: &Workspace, file: &Path, resolution: Resolution) -> Result<ResolveOutcome> {
    let relative = workspace.relative(file)?;
    let mut state = StateStore::load(workspace.root())?;
    let outcome = resolve::resolve(workspace.root(), &mut state, &relative, resolution)?;
    state.save()?;
    Ok(outcome)
}

/// Create a remote page for an untracked file.
pub async fn create(ctx: &SyncContext, file: &Path, parent: Option<&str>) -> Result<CreateOutcome> {
    let relative = ctx.workspace().relative(file)?;
    let mut state = StateStore::load(ctx.root())?;
    let outcome = Pusher::new(ctx, &mut state, PushOptions::default())
        .create(&relative, parent)
        .await?;
    state.save()?;
    Ok(outcome)
}

fn tracked_id(workspace: &Workspace, state: &StateStore, relative: &str) -> Result<String> {
    let document = Document::parse(&io::read_text(&workspace.path_of(relative))?)?;
    Tracking::resolve(&document, relative, state)
        .id()
        .filter(|id| state.page(id).is_some())
        .map(str::to_string)
        .ok_or_else(|| Error::NotTracked {
            path: relative.to_string(),
        })
}
