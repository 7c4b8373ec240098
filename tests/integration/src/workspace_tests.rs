//! Workspace lifecycle: init, discovery, preconditions and state locking

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wiki_core::{
    Error, PullOptions, Scope, ScopeKind, StateStore, Workspace, WorkspaceConfig, commands,
};
use wiki_test_utils::workspace::{BASE_URL, SPACE};
use wiki_test_utils::{InMemoryRemote, TestWorkspace, init_tracing};

#[test]
fn test_init_writes_marker_directory() {
    let mut ws = TestWorkspace::new();
    ws.init(Scope::tree("100"));

    assert!(ws.exists(".wikisync/config.toml"));
    assert!(ws.exists(".wikisync/state.toml"));
    ws.assert_file_contains(".wikisync/config.toml", "DOCS");
    assert_eq!(ws.workspace().config().scope, Scope::tree("100"));
}

#[test]
fn test_init_twice_is_refused() {
    let mut ws = TestWorkspace::new();
    ws.init(Scope::space());

    let again = commands::init(ws.root(), WorkspaceConfig::new(BASE_URL, SPACE, Scope::space()));

    assert!(matches!(again, Err(Error::AlreadyInitialized { .. })));
}

#[test]
fn test_ambiguous_scope_writes_nothing() {
    let ws = TestWorkspace::new();
    let target = ws.path("project");
    let scope = Scope {
        kind: ScopeKind::Space,
        page_id: Some("1".into()),
    };
    let config = WorkspaceConfig::new(BASE_URL, SPACE, scope);

    let result = commands::init(&target, config);

    assert!(matches!(result, Err(Error::AmbiguousScope { .. })));
    assert!(!target.exists());
}

#[test]
fn test_discover_from_nested_directory() {
    let mut ws = TestWorkspace::new();
    ws.init(Scope::space());
    ws.write("guide/deep/page.md", "x\n");

    let found = Workspace::discover(&ws.path("guide/deep")).unwrap();

    assert_eq!(found.root(), ws.workspace().root());
}

#[test]
fn test_discover_outside_workspace_fails() {
    let ws = TestWorkspace::new();

    let result = Workspace::discover(ws.root());

    assert!(matches!(result, Err(Error::NotInitialized { .. })));
}

#[tokio::test]
async fn test_concurrent_state_write_is_detected() {
    init_tracing();
    let remote = Arc::new(InMemoryRemote::new());
    remote.add_page("1", None, "Alpha", "a\n");
    let mut ws = TestWorkspace::new();
    ws.init(Scope::space());
    let ctx = ws.context(remote.clone());

    let mut stale = StateStore::load(ws.workspace().root()).unwrap();
    commands::pull(&ctx, ws.root(), PullOptions::default())
        .await
        .unwrap();

    let result = stale.save();

    assert!(matches!(result, Err(Error::StaleState { .. })));
    assert_eq!(StateStore::load(ws.workspace().root()).unwrap().page_count(), 1);
}

#[tokio::test]
async fn test_command_outside_workspace_is_rejected() {
    let remote = Arc::new(InMemoryRemote::new());
    let mut ws = TestWorkspace::new();
    ws.init(Scope::space());
    let ctx = ws.context(remote);
    let elsewhere = tempfile::TempDir::new().unwrap();

    let result = commands::pull(&ctx, elsewhere.path(), PullOptions::default()).await;

    assert!(matches!(result, Err(Error::OutsideWorkspace { .. })));
}
