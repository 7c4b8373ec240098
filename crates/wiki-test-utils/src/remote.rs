//! [`InMemoryRemote`]: a fake wiki behind `RemoteApi`.
//!
//! Bodies are stored as given, so it pairs with `PassthroughConverter`.
//! Versions, optimistic locking and re-parenting behave like a real wiki;
//! `fail_on` injects transport failures for one node.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use wiki_core::{
    ContentType, NewAttachment, NewNode, NodeSummary, NodeUpdate, RemoteApi, RemoteAttachment,
    RemoteError, RemoteNode, RemoteResult, ScopeQuery,
};

use crate::workspace::SPACE;

#[derive(Debug, Clone)]
struct Node {
    title: String,
    body: String,
    version: u64,
    parent_id: Option<String>,
    content_type: ContentType,
    space_key: String,
}

#[derive(Debug, Clone)]
struct Attachment {
    id: String,
    filename: String,
    media_type: String,
    data: Vec<u8>,
    version: u64,
}

impl Attachment {
    fn meta(&self) -> RemoteAttachment {
        RemoteAttachment {
            id: self.id.clone(),
            filename: self.filename.clone(),
            media_type: self.media_type.clone(),
            file_size: self.data.len() as u64,
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: BTreeMap<String, Node>,
    attachments: BTreeMap<String, Vec<Attachment>>,
    failing: HashSet<String>,
    next_id: u64,
    updates: usize,
}

impl Inner {
    fn node(&self, id: &str) -> RemoteResult<&Node> {
        self.check(id)?;
        self.nodes
            .get(id)
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })
    }

    fn node_mut(&mut self, id: &str) -> RemoteResult<&mut Node> {
        self.check(id)?;
        self.nodes
            .get_mut(id)
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })
    }

    fn check(&self, id: &str) -> RemoteResult<()> {
        if self.failing.contains(id) {
            tracing::debug!(id, "Injected remote failure");
            return Err(RemoteError::Transport(format!("injected failure for {id}")));
        }
        Ok(())
    }

    /// Root-first parent chain. Stops at a missing node or a cycle.
    fn ancestors(&self, id: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited = HashSet::from([id.to_string()]);
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.clone());
        while let Some(parent) = current {
            if !visited.insert(parent.clone()) {
                break;
            }
            current = self.nodes.get(&parent).and_then(|n| n.parent_id.clone());
            chain.push(parent);
        }
        chain.reverse();
        chain
    }

    fn remote_node(&self, id: &str, node: &Node) -> RemoteNode {
        RemoteNode {
            id: id.to_string(),
            title: node.title.clone(),
            body: node.body.clone(),
            version: node.version,
            parent_id: node.parent_id.clone(),
            ancestors: self.ancestors(id),
            content_type: node.content_type,
            space_key: node.space_key.clone(),
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", 9000 + self.next_id)
    }

    fn attachments_mut(&mut self, page_id: &str) -> RemoteResult<&mut Vec<Attachment>> {
        self.node(page_id)?;
        Ok(self.attachments.entry(page_id.to_string()).or_default())
    }
}

/// In-memory wiki for tests.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    inner: Mutex<Inner>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    fn insert(&self, id: &str, parent: Option<&str>, title: &str, body: &str, kind: ContentType) {
        self.lock().nodes.insert(
            id.to_string(),
            Node {
                title: title.to_string(),
                body: body.to_string(),
                version: 1,
                parent_id: parent.map(str::to_string),
                content_type: kind,
                space_key: SPACE.to_string(),
            },
        );
    }

    /// Add a page at version 1.
    pub fn add_page(&self, id: &str, parent: Option<&str>, title: &str, body: &str) {
        self.insert(id, parent, title, body, ContentType::Page);
    }

    /// Add a folder node at version 1.
    pub fn add_folder(&self, id: &str, parent: Option<&str>, title: &str) {
        self.insert(id, parent, title, "", ContentType::Folder);
    }

    /// Edit a body as another user would, bumping the version.
    pub fn set_body(&self, id: &str, body: &str) {
        let mut inner = self.lock();
        let node = inner.nodes.get_mut(id).unwrap();
        node.body = body.to_string();
        node.version += 1;
    }

    pub fn rename(&self, id: &str, title: &str) {
        let mut inner = self.lock();
        let node = inner.nodes.get_mut(id).unwrap();
        node.title = title.to_string();
        node.version += 1;
    }

    pub fn reparent(&self, id: &str, parent: &str) {
        let mut inner = self.lock();
        let node = inner.nodes.get_mut(id).unwrap();
        node.parent_id = Some(parent.to_string());
        node.version += 1;
    }

    pub fn remove(&self, id: &str) {
        let mut inner = self.lock();
        inner.nodes.remove(id);
        inner.attachments.remove(id);
    }

    /// Attach a file at version 1, returning the attachment id.
    pub fn add_attachment(&self, page_id: &str, filename: &str, data: &[u8]) -> String {
        let mut inner = self.lock();
        let id = inner.next_id("att");
        inner
            .attachments
            .entry(page_id.to_string())
            .or_default()
            .push(Attachment {
                id: id.clone(),
                filename: filename.to_string(),
                media_type: "application/octet-stream".to_string(),
                data: data.to_vec(),
                version: 1,
            });
        id
    }

    /// Replace an attachment's content as another user would.
    pub fn set_attachment(&self, page_id: &str, filename: &str, data: &[u8]) {
        let mut inner = self.lock();
        let attachment = inner
            .attachments
            .get_mut(page_id)
            .and_then(|list| list.iter_mut().find(|a| a.filename == filename))
            .unwrap();
        attachment.data = data.to_vec();
        attachment.version += 1;
    }

    /// Current state of a node, bypassing injected failures.
    pub fn node(&self, id: &str) -> Option<RemoteNode> {
        let inner = self.lock();
        inner.nodes.get(id).map(|node| inner.remote_node(id, node))
    }

    pub fn attachment_bytes(&self, page_id: &str, filename: &str) -> Option<Vec<u8>> {
        self.lock()
            .attachments
            .get(page_id)?
            .iter()
            .find(|a| a.filename == filename)
            .map(|a| a.data.clone())
    }

    pub fn attachment_version(&self, page_id: &str, filename: &str) -> Option<u64> {
        self.lock()
            .attachments
            .get(page_id)?
            .iter()
            .find(|a| a.filename == filename)
            .map(|a| a.version)
    }

    /// Make every call touching `id` fail with a transport error.
    pub fn fail_on(&self, id: &str) {
        self.lock().failing.insert(id.to_string());
    }

    pub fn heal(&self, id: &str) {
        self.lock().failing.remove(id);
    }

    /// Number of successful `update_node` calls.
    pub fn update_count(&self) -> usize {
        self.lock().updates
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemote {
    async fn get_node(&self, id: &str) -> RemoteResult<RemoteNode> {
        let inner = self.lock();
        let node = inner.node(id)?;
        Ok(inner.remote_node(id, node))
    }

    async fn list_children(&self, id: &str) -> RemoteResult<Vec<NodeSummary>> {
        let inner = self.lock();
        inner.node(id)?;
        Ok(inner
            .nodes
            .iter()
            .filter(|(_, node)| node.parent_id.as_deref() == Some(id))
            .map(|(child, node)| inner.remote_node(child, node).summary())
            .collect())
    }

    async fn search_by_scope(&self, query: &ScopeQuery) -> RemoteResult<Vec<NodeSummary>> {
        let inner = self.lock();
        if let Some(root) = &query.root_id {
            inner.node(root)?;
        }
        Ok(inner
            .nodes
            .iter()
            .filter(|(_, node)| node.space_key == query.space)
            .filter(|(id, _)| match &query.root_id {
                None => true,
                Some(root) => *id == root || inner.ancestors(id).contains(root),
            })
            .map(|(id, node)| inner.remote_node(id, node).summary())
            .collect())
    }

    async fn create_node(&self, node: NewNode) -> RemoteResult<RemoteNode> {
        let mut inner = self.lock();
        if let Some(parent) = &node.parent_id {
            inner.node(parent)?;
        }
        let id = inner.next_id("");
        let created = Node {
            title: node.title,
            body: node.body,
            version: 1,
            parent_id: node.parent_id,
            content_type: node.content_type,
            space_key: node.space_key,
        };
        let result = inner.remote_node(&id, &created);
        inner.nodes.insert(id.clone(), created);
        Ok(RemoteNode {
            ancestors: inner.ancestors(&id),
            ..result
        })
    }

    async fn update_node(&self, id: &str, update: NodeUpdate) -> RemoteResult<RemoteNode> {
        let mut inner = self.lock();
        let node = inner.node_mut(id)?;
        if update.version != node.version + 1 {
            return Err(RemoteError::VersionConflict {
                id: id.to_string(),
                expected: node.version + 1,
                actual: update.version,
            });
        }
        node.title = update.title;
        node.body = update.body;
        node.version = update.version;
        let node = node.clone();
        inner.updates += 1;
        Ok(inner.remote_node(id, &node))
    }

    async fn move_node(&self, id: &str, new_parent_id: &str) -> RemoteResult<RemoteNode> {
        let mut inner = self.lock();
        inner.node(new_parent_id)?;
        if inner.ancestors(new_parent_id).iter().any(|a| a == id) || new_parent_id == id {
            return Err(RemoteError::Rejected(format!(
                "cannot move {id} under its own descendant {new_parent_id}"
            )));
        }
        let node = inner.node_mut(id)?;
        node.parent_id = Some(new_parent_id.to_string());
        node.version += 1;
        let node = node.clone();
        Ok(inner.remote_node(id, &node))
    }

    async fn delete_node(&self, id: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        inner.node(id)?;
        inner.nodes.remove(id);
        inner.attachments.remove(id);
        Ok(())
    }

    async fn list_attachments(&self, page_id: &str) -> RemoteResult<Vec<RemoteAttachment>> {
        let inner = self.lock();
        inner.node(page_id)?;
        Ok(inner
            .attachments
            .get(page_id)
            .map(|list| list.iter().map(Attachment::meta).collect())
            .unwrap_or_default())
    }

    async fn download_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
    ) -> RemoteResult<Vec<u8>> {
        let inner = self.lock();
        inner.node(page_id)?;
        inner
            .attachments
            .get(page_id)
            .and_then(|list| list.iter().find(|a| a.id == attachment_id))
            .map(|a| a.data.clone())
            .ok_or_else(|| RemoteError::NotFound {
                id: attachment_id.to_string(),
            })
    }

    async fn upload_attachment(
        &self,
        page_id: &str,
        attachment: NewAttachment,
    ) -> RemoteResult<RemoteAttachment> {
        let mut inner = self.lock();
        let id = inner.next_id("att");
        let list = inner.attachments_mut(page_id)?;
        if list.iter().any(|a| a.filename == attachment.filename) {
            return Err(RemoteError::Rejected(format!(
                "attachment {} already exists",
                attachment.filename
            )));
        }
        let created = Attachment {
            id,
            filename: attachment.filename,
            media_type: attachment.media_type,
            data: attachment.data,
            version: 1,
        };
        let meta = created.meta();
        list.push(created);
        Ok(meta)
    }

    async fn update_attachment(
        &self,
        page_id: &str,
        attachment_id: &str,
        attachment: NewAttachment,
    ) -> RemoteResult<RemoteAttachment> {
        let mut inner = self.lock();
        let existing = inner
            .attachments_mut(page_id)?
            .iter_mut()
            .find(|a| a.id == attachment_id)
            .ok_or_else(|| RemoteError::NotFound {
                id: attachment_id.to_string(),
            })?;
        existing.data = attachment.data;
        existing.media_type = attachment.media_type;
        existing.version += 1;
        Ok(existing.meta())
    }

    async fn delete_attachment(&self, page_id: &str, attachment_id: &str) -> RemoteResult<()> {
        let mut inner = self.lock();
        let list = inner.attachments_mut(page_id)?;
        let before = list.len();
        list.retain(|a| a.id != attachment_id);
        if list.len() == before {
            return Err(RemoteError::NotFound {
                id: attachment_id.to_string(),
            });
        }
        Ok(())
    }
}
