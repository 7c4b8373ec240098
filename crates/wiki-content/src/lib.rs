//! Content handling for wikisync working files
//!
//! Provides the pieces of a local Markdown file that sync logic needs to
//! understand:
//!
//! - **frontmatter**: the `id`/`title`/`type` header binding a file to a node
//! - **markers**: hunk-level conflict markers, injected and stripped
//! - **diff**: line diffs and unified diff rendering
//! - **links**: attachment references found in a page body

pub mod diff;
pub mod error;
pub mod frontmatter;
pub mod links;
pub mod markers;

pub use diff::{ContentDiff, LineChange, unified_diff};
pub use error::{Error, Result};
pub use frontmatter::{Document, Frontmatter};
pub use links::{attachment_dir_name, attachment_refs};
pub use markers::{Side, has_markers, inject_markers, strip_markers};
