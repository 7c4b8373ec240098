//! Filesystem primitives for wikisync
//!
//! Provides normalized paths, atomic I/O, the content hasher used for every
//! sync comparison, and format-agnostic config loading.

pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod io;
pub mod path;

pub use config::{ConfigStore, Format};
pub use constants::WorkspacePath;
pub use error::{Error, Result};
pub use hash::{hash_bytes, hash_text, normalize};
pub use path::{NormalizedPath, join_relative, parent_dir};
