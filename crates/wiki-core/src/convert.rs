//! Markdown <-> storage format boundary

/// Pure conversion between local Markdown and the wiki's storage format.
///
/// Implementations must be deterministic; the sync engine hashes converted
/// output to detect remote changes.
pub trait ContentConverter: Send + Sync {
    fn to_markdown(&self, storage: &str) -> String;
    fn to_storage(&self, markdown: &str) -> String;
}

/// Identity converter for wikis that store Markdown directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughConverter;

impl ContentConverter for PassthroughConverter {
    fn to_markdown(&self, storage: &str) -> String {
        storage.to_string()
    }

    fn to_storage(&self, markdown: &str) -> String {
        markdown.to_string()
    }
}
