//! End-to-end sync scenarios
//!
//! Each test drives the public commands against an in-memory wiki and
//! checks files, state records and remote versions together.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use wiki_content::Document;
use wiki_core::{
    PullOptions, PushOptions, Resolution, Scope, StateStore, SyncContext, SyncState, commands,
};
use wiki_fs::hash_text;
use wiki_test_utils::{InMemoryRemote, TestWorkspace, init_tracing};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Three top-level pages in the space, no nesting
fn flat_space() -> Arc<InMemoryRemote> {
    let remote = Arc::new(InMemoryRemote::new());
    remote.add_page("1", None, "Alpha", "Alpha body\n");
    remote.add_page("2", None, "Beta", "Beta body\n");
    remote.add_page("3", None, "Gamma", "Gamma body\n");
    remote
}

fn workspace(remote: &Arc<InMemoryRemote>, scope: Scope) -> (TestWorkspace, SyncContext) {
    init_tracing();
    let mut ws = TestWorkspace::new();
    ws.init(scope);
    let ctx = ws.context(remote.clone());
    (ws, ctx)
}

async fn pull(ws: &TestWorkspace, ctx: &SyncContext) -> wiki_core::PullReport {
    commands::pull(ctx, ws.root(), PullOptions::default())
        .await
        .expect("pull should succeed")
}

async fn push(ws: &TestWorkspace, ctx: &SyncContext) -> wiki_core::PushReport {
    commands::push(ctx, ws.root(), PushOptions::default())
        .await
        .expect("push should succeed")
}

fn body_of(ws: &TestWorkspace, path: &str) -> String {
    Document::parse(&ws.read(path)).unwrap().body
}

fn state(ws: &TestWorkspace) -> StateStore {
    StateStore::load(ws.workspace().root()).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_init_and_pull_flat_space() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());

    let report = pull(&ws, &ctx).await;

    assert_eq!(report.pulled, 3);
    let state = state(&ws);
    for (id, path, body) in [
        ("1", "alpha.md", "Alpha body\n"),
        ("2", "beta.md", "Beta body\n"),
        ("3", "gamma.md", "Gamma body\n"),
    ] {
        let record = state.page(id).unwrap();
        assert_eq!(record.path, path);
        assert_eq!(hash_text(&body_of(&ws, path)), hash_text(body));
        assert_eq!(record.local_hash, record.remote_hash);
        assert_eq!(record.remote_hash, record.base_hash);
        assert_eq!(record.sync_state, SyncState::Synced);
    }

    let again = pull(&ws, &ctx).await;
    assert_eq!(again.pulled, 0);
    assert_eq!(again.moved, 0);
}

#[tokio::test]
async fn test_edit_then_push_bumps_one_version() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());
    pull(&ws, &ctx).await;
    let text = ws.read("beta.md").replace("Beta body", "Beta revised");
    ws.write("beta.md", &text);

    let report = push(&ws, &ctx).await;

    assert_eq!(report.pushed, 1);
    assert_eq!(remote.node("2").unwrap().version, 2);
    assert_eq!(remote.node("1").unwrap().version, 1);
    assert_eq!(remote.node("3").unwrap().version, 1);

    let record = state(&ws).page("2").cloned().unwrap();
    assert_eq!(record.sync_state, SyncState::Synced);
    assert_eq!(record.base_hash, hash_text("Beta revised\n"));
}

#[tokio::test]
async fn test_remote_title_change_is_a_pure_move() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());
    pull(&ws, &ctx).await;
    let hash_before = state(&ws).page("3").unwrap().local_hash.clone();

    remote.rename("3", "Delta");
    let report = pull(&ws, &ctx).await;

    assert_eq!(report.moved, 1);
    assert_eq!(report.pulled, 0);
    assert!(report.conflicts.is_empty());
    assert!(!ws.exists("gamma.md"));
    assert_eq!(hash_text(&body_of(&ws, "delta.md")), hash_before);
    assert_eq!(state(&ws).page("3").unwrap().local_hash, hash_before);
}

#[tokio::test]
async fn test_space_home_page_becomes_root_index() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.add_page("10", None, "Home", "Welcome\n");
    remote.add_page("11", Some("10"), "Team", "People\n");
    remote.add_page("12", Some("11"), "Onboarding", "Day one\n");
    let (ws, ctx) = workspace(&remote, Scope::space());

    let report = pull(&ws, &ctx).await;

    assert_eq!(report.pulled, 3);
    ws.assert_file_contains("index.md", "Welcome");
    ws.assert_file_contains("team/index.md", "People");
    ws.assert_file_contains("team/onboarding.md", "Day one");
}

#[tokio::test]
async fn test_page_titled_index_under_home_gets_its_own_file() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.add_page("10", None, "Home", "Welcome\n");
    remote.add_page("11", Some("10"), "Index", "A to Z\n");
    let (ws, ctx) = workspace(&remote, Scope::space());

    let report = pull(&ws, &ctx).await;

    assert_eq!(report.pulled, 2);
    assert!(report.skipped.is_empty(), "skipped: {:?}", report.skipped);
    assert_eq!(body_of(&ws, "index.md"), "Welcome\n");
    assert_eq!(body_of(&ws, "index-2.md"), "A to Z\n");
    assert_eq!(state(&ws).page("11").unwrap().path, "index-2.md");
}

#[tokio::test]
async fn test_folder_nodes_have_header_only() {
    let remote = Arc::new(InMemoryRemote::new());
    remote.add_page("10", None, "Docs", "Top\n");
    remote.add_folder("20", Some("10"), "Archive");
    remote.add_page("21", Some("20"), "Old Plan", "Past\n");
    let (ws, ctx) = workspace(&remote, Scope::tree("10"));

    pull(&ws, &ctx).await;

    let folder = Document::parse(&ws.read("docs/archive/index.md")).unwrap();
    assert!(folder.is_folder());
    assert_eq!(folder.body, "");
    ws.assert_file_contains("docs/archive/old-plan.md", "Past");

    let report = push(&ws, &ctx).await;
    assert_eq!(report.pushed, 0);
    assert_eq!(remote.update_count(), 0);
}

#[tokio::test]
async fn test_page_scope_syncs_one_page() {
    let remote = flat_space();
    remote.add_page("4", Some("2"), "Beta Child", "Child\n");
    let (ws, ctx) = workspace(&remote, Scope::page("2"));

    let report = pull(&ws, &ctx).await;

    assert_eq!(report.pulled, 1);
    ws.assert_file_contains("beta.md", "Beta body");
    assert!(!ws.exists("alpha.md"));
    assert_eq!(state(&ws).page_count(), 1);
}

#[tokio::test]
async fn test_failed_node_recovers_on_next_pull() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());
    remote.fail_on("2");

    let first = pull(&ws, &ctx).await;
    assert_eq!(first.pulled, 2);
    assert_eq!(first.errors.len(), 1);
    assert!(!ws.exists("beta.md"));

    remote.heal("2");
    let second = pull(&ws, &ctx).await;
    assert_eq!(second.pulled, 1);
    assert_eq!(second.unchanged, 2);
    assert!(second.is_clean());
}

#[tokio::test]
async fn test_conflict_resolve_push_round() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());
    pull(&ws, &ctx).await;
    let text = ws.read("alpha.md").replace("Alpha body", "Alpha local");
    ws.write("alpha.md", &text);
    remote.set_body("1", "Alpha remote\n");

    let report = pull(&ws, &ctx).await;
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(ws.read("alpha.md"), text);

    commands::resolve(ws.workspace(), &ws.path("alpha.md"), Resolution::Local).unwrap();
    let status = commands::status(&ctx, ws.root(), true).await.unwrap();
    assert_eq!(status.state_of("alpha.md"), Some(SyncState::LocalModified));

    let pushed = push(&ws, &ctx).await;
    assert_eq!(pushed.pushed, 1);
    assert_eq!(remote.node("1").unwrap().body, "Alpha local\n");

    let settled = commands::status(&ctx, ws.root(), true).await.unwrap();
    assert_eq!(settled.count(SyncState::Synced), 3);
}

#[tokio::test]
async fn test_ignored_files_are_invisible() {
    let remote = flat_space();
    let (ws, ctx) = workspace(&remote, Scope::space());
    pull(&ws, &ctx).await;
    ws.write(".gitignore", "*.draft.md\n");
    ws.write("notes.draft.md", "scratch\n");
    ws.write("notes.md", "kept\n");

    let status = commands::status(&ctx, ws.root(), false).await.unwrap();

    assert_eq!(status.untracked, vec!["notes.md".to_string()]);
}
