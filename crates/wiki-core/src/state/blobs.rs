//! Per-node text blobs kept under the marker directory

use wiki_fs::{NormalizedPath, WorkspacePath, io};

use crate::Result;

/// Directory of `<id>.md` files: base bodies or captured conflict bodies.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: NormalizedPath,
}

impl BlobStore {
    /// Normalized base bodies, the content every `base_hash` was taken from.
    pub fn base(root: &NormalizedPath) -> Self {
        Self {
            dir: root.join(WorkspacePath::BaseDir.as_str()),
        }
    }

    /// Remote bodies captured when a conflict was recorded.
    pub fn conflicts(root: &NormalizedPath) -> Self {
        Self {
            dir: root.join(WorkspacePath::ConflictDir.as_str()),
        }
    }

    fn path(&self, id: &str) -> NormalizedPath {
        self.dir.join(&format!("{id}.md"))
    }

    pub fn read(&self, id: &str) -> Result<Option<String>> {
        Ok(io::read_text_opt(&self.path(id))?)
    }

    pub fn write(&self, id: &str, text: &str) -> Result<()> {
        Ok(io::write_text(&self.path(id), text)?)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        Ok(io::remove_file(&self.path(id))?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.path(id).is_file()
    }
}
