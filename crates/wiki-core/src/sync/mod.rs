//! Page and attachment synchronization
//!
//! - **pull**: remote to local, with path mapping, moves and conflict capture
//! - **push**: local to remote, with directory-implied re-parenting
//! - **attachments**: the same discipline for binary files
//! - **files**: working-file discovery under ignore rules

mod attachments;
mod files;
mod pull;
mod push;
mod report;
mod scope;

pub use attachments::{attachment_dir, conflict_file_name};
pub use files::{LocalFile, markdown_files};
pub use pull::{PullOptions, PullTarget, Puller};
pub use push::{CreateOutcome, PushOptions, Pusher};
pub use report::{
    AttachmentCounts, ConflictItem, NodeError, Overwritten, PullReport, PushReport, SkipReason, Skipped,
};
