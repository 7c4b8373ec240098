//! Enumerating and fetching the nodes of the configured scope

use std::collections::HashSet;

use futures::stream::{self, StreamExt};

use crate::config::{ScopeKind, SyncContext};
use crate::remote::{RemoteError, RemoteNode, ScopeQuery};
use crate::{Error, Result};

/// Ids in scope, plus nodes whose children could not be listed
#[derive(Debug, Default)]
pub(crate) struct ScopeListing {
    pub ids: Vec<String>,
    pub incomplete: HashSet<String>,
}

/// List every node id in the workspace scope.
///
/// Failing to list the scope root is fatal; failing to list a deeper node
/// only marks its subtree incomplete.
pub(crate) async fn list(ctx: &SyncContext) -> Result<ScopeListing> {
    let scope = &ctx.config().scope;
    let root_id = || {
        scope
            .page_id
            .clone()
            .ok_or_else(|| Error::ambiguous_scope("scope has no page_id"))
    };

    match scope.kind {
        ScopeKind::Page => Ok(ScopeListing {
            ids: vec![root_id()?],
            incomplete: HashSet::new(),
        }),
        ScopeKind::Space => {
            let query = ScopeQuery {
                space: ctx.config().space.clone(),
                root_id: None,
            };
            let found = ctx.remote().search_by_scope(&query).await?;
            Ok(ScopeListing {
                ids: found.into_iter().map(|n| n.id).collect(),
                incomplete: HashSet::new(),
            })
        }
        ScopeKind::Tree => list_tree(ctx, root_id()?).await,
    }
}

/// Breadth-first walk, one level at a time with bounded parallelism.
async fn list_tree(ctx: &SyncContext, root: String) -> Result<ScopeListing> {
    let remote = ctx.remote();
    let mut listing = ScopeListing::default();
    let mut seen: HashSet<String> = HashSet::from([root.clone()]);

    // Root listing failure means the scope cannot be enumerated at all
    let first = remote.list_children(&root).await?;
    listing.ids.push(root);
    let mut frontier = Vec::new();
    for child in first {
        if seen.insert(child.id.clone()) {
            frontier.push(child.id);
        }
    }

    while !frontier.is_empty() {
        listing.ids.extend(frontier.iter().cloned());
        let results: Vec<_> = stream::iter(frontier)
            .map(|id| async move {
                let children = remote.list_children(&id).await;
                (id, children)
            })
            .buffer_unordered(ctx.config().concurrency())
            .collect()
            .await;

        let mut next = Vec::new();
        for (id, children) in results {
            match children {
                Ok(children) => {
                    for child in children {
                        if seen.insert(child.id.clone()) {
                            next.push(child.id);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "Could not list children, subtree skipped");
                    listing.incomplete.insert(id);
                }
            }
        }
        frontier = next;
    }

    tracing::debug!(count = listing.ids.len(), "Listed tree scope");
    Ok(listing)
}

/// Fetch full nodes concurrently. Results come back in completion order.
pub(crate) async fn fetch(
    ctx: &SyncContext,
    ids: &[String],
) -> (Vec<RemoteNode>, Vec<(String, RemoteError)>) {
    let remote = ctx.remote();
    let results: Vec<_> = stream::iter(ids.iter().cloned())
        .map(|id| async move {
            let node = remote.get_node(&id).await;
            (id, node)
        })
        .buffer_unordered(ctx.config().concurrency())
        .collect()
        .await;

    let mut nodes = Vec::with_capacity(results.len());
    let mut failed = Vec::new();
    for (id, result) in results {
        match result {
            Ok(node) => nodes.push(node),
            Err(e) => failed.push((id, e)),
        }
    }
    (nodes, failed)
}
