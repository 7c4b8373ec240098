//! Persistent sync state
//!
//! One TOML file per workspace holds a record per tracked page and
//! attachment plus a path index (workspace-relative path to page id). A
//! `revision` counter turns every save into an optimistic compare-and-swap:
//! a save fails with [`Error::StaleState`] if another process saved since
//! this store was loaded.

mod blobs;
mod record;

pub use blobs::BlobStore;
pub use record::{AttachmentRecord, PageRecord, SyncState};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use wiki_fs::{NormalizedPath, WorkspacePath, io};

use crate::{Error, Result};

const FORMAT_VERSION: &str = "1";
const LOCK_FILE: &str = "state.lock";

/// On-disk layout. Scalars precede tables so TOML can serialize it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateFile {
    version: String,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    paths: BTreeMap<String, String>,
    #[serde(default)]
    pages: BTreeMap<String, PageRecord>,
    #[serde(default)]
    attachments: BTreeMap<String, BTreeMap<String, AttachmentRecord>>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            revision: 0,
            paths: BTreeMap::new(),
            pages: BTreeMap::new(),
            attachments: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize)]
struct RevisionOnly {
    #[serde(default)]
    revision: u64,
}

/// Loaded sync state of a workspace
#[derive(Debug, Clone)]
pub struct StateStore {
    file: NormalizedPath,
    lock: NormalizedPath,
    loaded_revision: u64,
    data: StateFile,
}

impl StateStore {
    /// Load the state of the workspace at `root`, with a shared lock.
    ///
    /// A missing state file yields an empty store at revision 0.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let file = root.join(WorkspacePath::State.as_str());
        let lock = root
            .join(WorkspacePath::MarkerDir.as_str())
            .join(LOCK_FILE);

        let data = if file.is_file() {
            let handle = File::open(file.to_native())?;
            handle.lock_shared()?;
            let mut content = String::new();
            (&handle).read_to_string(&mut content)?;
            toml::from_str::<StateFile>(&content)?
        } else {
            tracing::debug!(path = %file, "No sync state yet, starting empty");
            StateFile::default()
        };

        let mut store = Self {
            file,
            lock,
            loaded_revision: data.revision,
            data,
        };
        store.verify_index();
        Ok(store)
    }

    /// Persist the state if nobody else saved since it was loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleState`] when the on-disk revision moved.
    pub fn save(&mut self) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent.to_native())?;
        }
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock.to_native())?;
        lock_file.lock_exclusive()?;

        let found = self.disk_revision()?;
        if found != self.loaded_revision {
            return Err(Error::StaleState {
                expected: self.loaded_revision,
                found,
            });
        }

        let previous = self.data.revision;
        self.data.revision = found + 1;
        let written = toml::to_string_pretty(&self.data)
            .map_err(Error::from)
            .and_then(|content| Ok(io::write_atomic(&self.file, content.as_bytes())?));
        if let Err(e) = written {
            self.data.revision = previous;
            return Err(e);
        }

        self.loaded_revision = self.data.revision;
        tracing::debug!(revision = self.data.revision, "Saved sync state");
        // Lock released when lock_file is dropped
        Ok(())
    }

    fn disk_revision(&self) -> Result<u64> {
        match io::read_text_opt(&self.file)? {
            Some(content) => Ok(toml::from_str::<RevisionOnly>(&content)?.revision),
            None => Ok(0),
        }
    }

    /// Rebuild the path index from the records if they disagree.
    fn verify_index(&mut self) {
        let expected: BTreeMap<String, String> = self
            .data
            .pages
            .iter()
            .map(|(id, record)| (record.path.clone(), id.clone()))
            .collect();
        if expected != self.data.paths {
            tracing::warn!("Path index out of step with page records, rebuilding");
            self.data.paths = expected;
        }
    }

    pub fn revision(&self) -> u64 {
        self.data.revision
    }

    // --- pages ---

    pub fn page(&self, id: &str) -> Option<&PageRecord> {
        self.data.pages.get(id)
    }

    /// Mutable record access. Path changes must go through [`Self::set_path`]
    /// so the index stays in step.
    pub fn page_mut(&mut self, id: &str) -> Option<&mut PageRecord> {
        self.data.pages.get_mut(id)
    }

    pub fn pages(&self) -> impl Iterator<Item = (&str, &PageRecord)> {
        self.data
            .pages
            .iter()
            .map(|(id, record)| (id.as_str(), record))
    }

    pub fn page_count(&self) -> usize {
        self.data.pages.len()
    }

    /// Insert or replace a record, indexing its path.
    pub fn upsert_page(&mut self, id: &str, record: PageRecord) {
        let path = record.path.clone();
        if let Some(old) = self.data.pages.insert(id.to_string(), record) {
            self.unindex(&old.path, id);
        }
        self.index(path, id);
    }

    pub fn remove_page(&mut self, id: &str) -> Option<PageRecord> {
        let record = self.data.pages.remove(id)?;
        self.unindex(&record.path, id);
        self.data.attachments.remove(id);
        Some(record)
    }

    /// Id of the page whose working file is at `path`.
    pub fn id_for_path(&self, path: &str) -> Option<&str> {
        self.data.paths.get(path).map(String::as_str)
    }

    /// Point a record at a new path.
    pub fn set_path(&mut self, id: &str, path: &str) {
        let Some(record) = self.data.pages.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut record.path, path.to_string());
        self.unindex(&old, id);
        self.index(path.to_string(), id);
    }

    /// Move every record under directory `from` to directory `to`.
    ///
    /// Returns the ids whose path changed.
    pub fn rebase_prefix(&mut self, from: &str, to: &str) -> Vec<String> {
        let prefix = format!("{}/", from.trim_end_matches('/'));
        let moved: Vec<(String, String)> = self
            .data
            .pages
            .iter()
            .filter_map(|(id, record)| {
                let rest = record.path.strip_prefix(&prefix)?;
                Some((id.clone(), wiki_fs::join_relative(to, rest)))
            })
            .collect();

        for (id, path) in &moved {
            self.set_path(id, path);
        }
        moved.into_iter().map(|(id, _)| id).collect()
    }

    fn index(&mut self, path: String, id: &str) {
        match self.data.paths.insert(path.clone(), id.to_string()) {
            Some(previous) if previous != id => {
                tracing::warn!(%path, id, %previous, "Path reassigned between nodes");
            }
            _ => {}
        }
    }

    fn unindex(&mut self, path: &str, id: &str) {
        if self.data.paths.get(path).is_some_and(|owner| owner == id) {
            self.data.paths.remove(path);
        }
    }

    // --- attachments ---

    pub fn attachment(&self, page_id: &str, attachment_id: &str) -> Option<&AttachmentRecord> {
        self.data.attachments.get(page_id)?.get(attachment_id)
    }

    /// Attachment records of one page, keyed by attachment id.
    pub fn attachments(&self, page_id: &str) -> impl Iterator<Item = (&str, &AttachmentRecord)> {
        self.data
            .attachments
            .get(page_id)
            .into_iter()
            .flat_map(|records| records.iter().map(|(id, r)| (id.as_str(), r)))
    }

    pub fn upsert_attachment(&mut self, page_id: &str, attachment_id: &str, record: AttachmentRecord) {
        self.data
            .attachments
            .entry(page_id.to_string())
            .or_default()
            .insert(attachment_id.to_string(), record);
    }

    pub fn remove_attachment(&mut self, page_id: &str, attachment_id: &str) -> Option<AttachmentRecord> {
        let records = self.data.attachments.get_mut(page_id)?;
        let removed = records.remove(attachment_id);
        if records.is_empty() {
            self.data.attachments.remove(page_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ContentType;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(path: &str) -> PageRecord {
        PageRecord {
            path: path.to_string(),
            title: "T".into(),
            space_key: "DOCS".into(),
            version: 1,
            parent_id: None,
            ancestors: vec![],
            content_type: ContentType::Page,
            local_hash: "sha256:a".into(),
            remote_hash: "sha256:a".into(),
            base_hash: "sha256:a".into(),
            sync_state: SyncState::Synced,
            last_synced_at: None,
            has_attachments: false,
        }
    }

    fn root(temp: &TempDir) -> NormalizedPath {
        NormalizedPath::new(temp.path())
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.upsert_page("1", record("docs/index.md"));
        store.upsert_attachment(
            "1",
            "att-1",
            AttachmentRecord::synced("a.png", "image/png", 3, 1, "sha256:b"),
        );
        store.save().unwrap();

        let loaded = StateStore::load(&root(&temp)).unwrap();
        assert_eq!(loaded.revision(), 1);
        assert_eq!(loaded.page("1"), store.page("1"));
        assert_eq!(loaded.id_for_path("docs/index.md"), Some("1"));
        assert_eq!(loaded.attachment("1", "att-1").unwrap().filename, "a.png");
    }

    #[test]
    fn concurrent_save_is_stale() {
        let temp = TempDir::new().unwrap();
        let mut first = StateStore::load(&root(&temp)).unwrap();
        let mut second = StateStore::load(&root(&temp)).unwrap();

        first.upsert_page("1", record("a.md"));
        first.save().unwrap();

        second.upsert_page("2", record("b.md"));
        let result = second.save();
        assert!(matches!(
            result,
            Err(Error::StaleState {
                expected: 0,
                found: 1
            })
        ));
    }

    #[test]
    fn repeated_saves_from_one_store_succeed() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.save().unwrap();
        store.save().unwrap();
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn set_path_moves_index_entry() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.upsert_page("1", record("old.md"));
        store.set_path("1", "new.md");

        assert_eq!(store.id_for_path("old.md"), None);
        assert_eq!(store.id_for_path("new.md"), Some("1"));
        assert_eq!(store.page("1").unwrap().path, "new.md");
    }

    #[test]
    fn rebase_prefix_moves_descendants_only() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.upsert_page("1", record("guide/index.md"));
        store.upsert_page("2", record("guide/setup.md"));
        store.upsert_page("3", record("guidebook.md"));

        let mut moved = store.rebase_prefix("guide", "manual/guide");
        moved.sort();

        assert_eq!(moved, vec!["1".to_string(), "2".to_string()]);
        assert_eq!(store.page("2").unwrap().path, "manual/guide/setup.md");
        assert_eq!(store.id_for_path("guidebook.md"), Some("3"));
    }

    #[test]
    fn remove_page_drops_attachments() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.upsert_page("1", record("a.md"));
        store.upsert_attachment(
            "1",
            "x",
            AttachmentRecord::synced("f.bin", "application/octet-stream", 1, 1, "sha256:c"),
        );
        store.remove_page("1");
        assert_eq!(store.attachments("1").count(), 0);
        assert_eq!(store.id_for_path("a.md"), None);
    }

    #[test]
    fn state_file_is_readable_toml() {
        let temp = TempDir::new().unwrap();
        let mut store = StateStore::load(&root(&temp)).unwrap();
        store.upsert_page("42", record("docs/a b.md"));
        store.save().unwrap();

        let text = std::fs::read_to_string(temp.path().join(".wikisync/state.toml")).unwrap();
        assert!(text.contains("version = \"1\""));
        assert!(text.contains("sync_state = \"synced\""));
        assert!(text.contains("\"docs/a b.md\" = \"42\""));
    }
}
