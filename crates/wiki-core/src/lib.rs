//! Sync engine between a remote wiki and a local Markdown tree
//!
//! This crate implements bidirectional synchronization on top of the Layer 0
//! crates:
//!
//! - **State store**: per-workspace TOML record of every tracked page and attachment
//! - **Hierarchy mapper**: remote parent/child structure to local paths, stable across pulls
//! - **Pull / push**: three-way comparison of local, base and remote content hashes
//! - **Attachments**: binary files stored next to their page
//! - **Conflicts**: recorded, never silently overwritten; settled with [`resolve`]
//! - **Status / diff**: read-only reporting
//!
//! # Architecture
//!
//! ```text
//!                 front end (CLI, editor plugin)
//!                         |
//!                     wiki-core ---- RemoteApi (HTTP client, test fake)
//!                         |
//!              +----------+----------+
//!              |                     |
//!           wiki-fs             wiki-content
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wiki_core::{commands, PullOptions, SyncContext, Workspace};
//!
//! async fn example(remote: Arc<dyn wiki_core::RemoteApi>) -> wiki_core::Result<()> {
//!     let workspace = Workspace::discover(std::path::Path::new("."))?;
//!     let ctx = SyncContext::new(workspace, remote);
//!     let report = commands::pull(&ctx, ctx.root().as_ref(), PullOptions::default()).await?;
//!     println!("{} pulled", report.pulled);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod convert;
pub mod error;
pub mod ignore;
pub mod mapper;
pub mod remote;
pub mod resolve;
pub mod state;
pub mod status;
pub mod sync;
pub mod tracking;

pub use config::{Scope, ScopeKind, SyncContext, Workspace, WorkspaceConfig};
pub use convert::{ContentConverter, PassthroughConverter};
pub use error::{Error, Result};
pub use ignore::IgnoreFilter;
pub use mapper::{MappingPlan, map_paths, slugify};
pub use remote::{
    ContentType, NewAttachment, NewNode, NodeSummary, NodeUpdate, RemoteApi, RemoteAttachment,
    RemoteError, RemoteNode, RemoteResult, ScopeQuery,
};
pub use resolve::{Resolution, ResolveOutcome};
pub use state::{AttachmentRecord, PageRecord, StateStore, SyncState};
pub use status::{DiffReport, FileDiff, StatusEntry, StatusReport, classify};
pub use sync::{
    AttachmentCounts, ConflictItem, CreateOutcome, NodeError, Overwritten, PullOptions,
    PullReport, PullTarget, PushOptions, PushReport, SkipReason, Skipped,
};
pub use tracking::Tracking;
