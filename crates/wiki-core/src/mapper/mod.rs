//! Remote hierarchy to local paths
//!
//! Pages with children (and folders) become `<slug>/index.md` so their
//! children can live in `<slug>/`; leaf pages become `<slug>.md`. Existing
//! paths are kept whenever a node's title and ancestry did not change, so a
//! pull never renames files without a reason on the remote side.

mod slug;

pub use slug::{compare_ids, slugify};

use std::collections::{HashMap, HashSet, VecDeque};
use wiki_fs::{join_relative, parent_dir};

use crate::config::ScopeKind;
use crate::remote::{ContentType, RemoteNode};
use crate::state::{PageRecord, StateStore};

const INDEX_FILE: &str = "index.md";
/// A leaf named `index.md` would sit on its parent's own file
const RESERVED_STEM: &str = "index";

/// Hierarchy facts the mapper needs about one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapNode {
    pub id: String,
    pub title: String,
    pub ancestors: Vec<String>,
    pub content_type: ContentType,
}

impl From<&RemoteNode> for MapNode {
    fn from(node: &RemoteNode) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            ancestors: node.ancestors.clone(),
            content_type: node.content_type,
        }
    }
}

impl MapNode {
    /// Stand-in built from what the state last recorded.
    pub fn from_record(id: &str, record: &PageRecord) -> Self {
        Self {
            id: id.to_string(),
            title: record.title.clone(),
            ancestors: record.ancestors.clone(),
            content_type: record.content_type,
        }
    }
}

/// Where a node was placed by the previous sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub path: String,
    pub title: String,
    pub ancestors: Vec<String>,
}

/// Placements of every recorded page.
pub fn placements(state: &StateStore) -> HashMap<String, Placement> {
    state
        .pages()
        .map(|(id, record)| {
            (
                id.to_string(),
                Placement {
                    path: record.path.clone(),
                    title: record.title.clone(),
                    ancestors: record.ancestors.clone(),
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathChange {
    New,
    Unchanged,
    Moved { from: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub path: String,
    pub change: PathChange,
}

/// A node that could not be given a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct MappingPlan {
    pub mappings: HashMap<String, Mapping>,
    /// Mapped ids, parents before children
    pub order: Vec<String>,
    pub failures: Vec<MapFailure>,
}

impl MappingPlan {
    pub fn get(&self, id: &str) -> Option<&Mapping> {
        self.mappings.get(id)
    }
}

/// Assign a unique relative path to every node.
///
/// `unavailable` names in-scope nodes whose details are unknown; their
/// subtrees are reported as failures rather than re-parented.
pub fn map_paths(
    nodes: &[MapNode],
    previous: &HashMap<String, Placement>,
    scope: ScopeKind,
    unavailable: &HashSet<String>,
) -> MappingPlan {
    Mapper::new(nodes, previous, unavailable).run(scope)
}

struct Mapper<'a> {
    nodes: HashMap<&'a str, &'a MapNode>,
    previous: &'a HashMap<String, Placement>,
    children: HashMap<&'a str, Vec<&'a str>>,
    roots: Vec<&'a str>,
    claimed: HashSet<String>,
    plan: MappingPlan,
}

impl<'a> Mapper<'a> {
    fn new(
        nodes: &'a [MapNode],
        previous: &'a HashMap<String, Placement>,
        unavailable: &HashSet<String>,
    ) -> Self {
        let by_id: HashMap<&str, &MapNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let mut plan = MappingPlan::default();
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut roots = Vec::new();

        for node in nodes {
            if node.ancestors.iter().any(|a| *a == node.id) {
                plan.failures.push(failure(&node.id, "node lists itself as an ancestor"));
                continue;
            }
            let parent = node
                .ancestors
                .iter()
                .rev()
                .find(|a| by_id.contains_key(a.as_str()) || unavailable.contains(*a));
            match parent {
                Some(p) if unavailable.contains(p) => {
                    plan.failures
                        .push(failure(&node.id, &format!("parent {p} is unavailable")));
                }
                Some(p) => children.entry(p.as_str()).or_default().push(node.id.as_str()),
                None => roots.push(node.id.as_str()),
            }
        }

        for list in children.values_mut() {
            list.sort_by(|a, b| compare_ids(a, b));
        }
        roots.sort_by(|a, b| compare_ids(a, b));

        // Files of recorded nodes outside this plan still occupy their names
        let claimed = previous
            .iter()
            .filter(|(id, _)| !by_id.contains_key(id.as_str()))
            .map(|(_, placement)| entry_key(&placement.path))
            .collect();

        Self {
            nodes: by_id,
            previous,
            children,
            roots,
            claimed,
            plan,
        }
    }

    fn run(mut self, scope: ScopeKind) -> MappingPlan {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&str, String, bool)> = VecDeque::new();

        let home = match (scope, self.roots.as_slice()) {
            (ScopeKind::Space, [only]) => Some(*only),
            _ => None,
        };

        if let Some(home) = home {
            visited.insert(home);
            let stable = self.record(home, INDEX_FILE.to_string());
            queue.push_back((home, String::new(), stable));
        } else {
            let roots = self.roots.clone();
            for (id, path) in self.assign_group(&roots, "", true) {
                if visited.insert(id) {
                    let stable = self.record(id, path.clone());
                    queue.push_back((id, children_dir(&path), stable));
                }
            }
        }

        while let Some((id, dir, stable)) = queue.pop_front() {
            let kids: Vec<&str> = self
                .children
                .get(id)
                .map(|list| list.iter().copied().filter(|k| !visited.contains(k)).collect())
                .unwrap_or_default();
            for (child, path) in self.assign_group(&kids, &dir, stable) {
                if visited.insert(child) {
                    let child_stable = self.record(child, path.clone());
                    queue.push_back((child, children_dir(&path), child_stable));
                }
            }
        }

        let failed: HashSet<String> = self.plan.failures.iter().map(|f| f.id.clone()).collect();
        let mut unreachable: Vec<&str> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !visited.contains(id) && !failed.contains(*id))
            .collect();
        unreachable.sort_by(|a, b| compare_ids(a, b));
        for id in unreachable {
            self.plan
                .failures
                .push(failure(id, "ancestor chain does not reach the scope root"));
        }

        for f in &self.plan.failures {
            tracing::warn!(id = %f.id, reason = %f.reason, "Node cannot be mapped to a path");
        }
        self.plan
    }

    /// Store a mapping; returns whether the node's child directory is
    /// unchanged since the previous sync.
    fn record(&mut self, id: &str, path: String) -> bool {
        let previous = self.previous.get(id);
        let change = match previous {
            None => PathChange::New,
            Some(p) if p.path == path => PathChange::Unchanged,
            Some(p) => PathChange::Moved {
                from: p.path.clone(),
            },
        };
        let stable = previous.is_some_and(|p| children_dir(&p.path) == children_dir(&path));
        self.claimed.insert(entry_key(&path));
        self.plan.order.push(id.to_string());
        self.plan
            .mappings
            .insert(id.to_string(), Mapping { path, change });
        stable
    }

    /// Paths for one sibling group. Preserved names are claimed first, then
    /// fresh slugs in id order.
    fn assign_group(&mut self, ids: &[&'a str], dir: &str, parent_stable: bool) -> Vec<(&'a str, String)> {
        let mut assigned = Vec::with_capacity(ids.len());
        let mut fresh = Vec::new();

        for &id in ids {
            let node = self.nodes[id];
            let needs_dir = self.needs_dir(node);
            let preserved = self.previous.get(id).and_then(|prev| {
                if prev.title != node.title {
                    return None;
                }
                if parent_stable
                    && prev.ancestors == node.ancestors
                    && shape_of(&prev.path) == Some(needs_dir)
                {
                    return Some(prev.path.clone());
                }
                // Same direct parent whose directory moved: keep the name
                if prev.ancestors.last() != node.ancestors.last() {
                    return None;
                }
                let stem = stem_of(&prev.path)?;
                Some(build_path(dir, stem, needs_dir))
            });

            match preserved {
                Some(path)
                    if (needs_dir || !is_index(&path))
                        && !self.claimed.contains(&entry_key(&path)) =>
                {
                    self.claimed.insert(entry_key(&path));
                    assigned.push((id, path));
                }
                _ => fresh.push(id),
            }
        }

        for id in fresh {
            let node = self.nodes[id];
            let needs_dir = self.needs_dir(node);
            let base = slugify(&node.title);
            let mut stem = base.clone();
            let mut n = 2;
            while (!needs_dir && stem == RESERVED_STEM)
                || self.claimed.contains(&join_relative(dir, &stem))
            {
                stem = format!("{base}-{n}");
                n += 1;
            }
            let path = build_path(dir, &stem, needs_dir);
            self.claimed.insert(entry_key(&path));
            assigned.push((id, path));
        }

        assigned.sort_by(|a, b| compare_ids(a.0, b.0));
        assigned
    }

    fn needs_dir(&self, node: &MapNode) -> bool {
        node.content_type == ContentType::Folder
            || self.children.get(node.id.as_str()).is_some_and(|c| !c.is_empty())
    }
}

fn failure(id: &str, reason: &str) -> MapFailure {
    MapFailure {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

fn build_path(dir: &str, stem: &str, needs_dir: bool) -> String {
    if needs_dir {
        join_relative(&join_relative(dir, stem), INDEX_FILE)
    } else {
        join_relative(dir, &format!("{stem}.md"))
    }
}

/// Directory entry a path occupies: `a/b.md` and `a/b/index.md` both occupy `a/b`.
fn entry_key(path: &str) -> String {
    if path == INDEX_FILE {
        return String::new();
    }
    match path.strip_suffix(&format!("/{INDEX_FILE}")) {
        Some(dir) => dir.to_string(),
        None => path.strip_suffix(".md").unwrap_or(path).to_string(),
    }
}

fn stem_of(path: &str) -> Option<&str> {
    if path == INDEX_FILE {
        return None;
    }
    let entry = path
        .strip_suffix(&format!("/{INDEX_FILE}"))
        .or_else(|| path.strip_suffix(".md"))?;
    Some(entry.rsplit('/').next().unwrap_or(entry))
}

/// `Some(true)` for `index.md` layouts, `Some(false)` for leaf files.
fn shape_of(path: &str) -> Option<bool> {
    if path == INDEX_FILE || path.ends_with(&format!("/{INDEX_FILE}")) {
        Some(true)
    } else if path.ends_with(".md") {
        Some(false)
    } else {
        None
    }
}

/// Directory that holds the children of the node at `path`.
pub fn children_dir(path: &str) -> String {
    if path == INDEX_FILE {
        String::new()
    } else if let Some(dir) = path.strip_suffix(&format!("/{INDEX_FILE}")) {
        dir.to_string()
    } else {
        path.strip_suffix(".md").unwrap_or(path).to_string()
    }
}

/// Whether `path` is an `index.md` file.
pub fn is_index(path: &str) -> bool {
    shape_of(path) == Some(true)
}

/// Directory whose `index.md` record is the implied parent of `path`.
pub fn parent_entry_dir(path: &str) -> &str {
    let dir = parent_dir(path);
    if is_index(path) { parent_dir(dir) } else { dir }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(id: &str, title: &str, ancestors: &[&str]) -> MapNode {
        MapNode {
            id: id.into(),
            title: title.into(),
            ancestors: ancestors.iter().map(|a| a.to_string()).collect(),
            content_type: ContentType::Page,
        }
    }

    fn placed(path: &str, title: &str, ancestors: &[&str]) -> Placement {
        Placement {
            path: path.into(),
            title: title.into(),
            ancestors: ancestors.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn map(nodes: &[MapNode], previous: &HashMap<String, Placement>, scope: ScopeKind) -> MappingPlan {
        map_paths(nodes, previous, scope, &HashSet::new())
    }

    fn path<'p>(plan: &'p MappingPlan, id: &str) -> &'p str {
        &plan.get(id).unwrap().path
    }

    #[test]
    fn tree_root_with_children_uses_index() {
        let nodes = vec![
            page("1", "Guide", &["0"]),
            page("2", "Install", &["0", "1"]),
            page("3", "Usage", &["0", "1"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);

        assert_eq!(path(&plan, "1"), "guide/index.md");
        assert_eq!(path(&plan, "2"), "guide/install.md");
        assert_eq!(path(&plan, "3"), "guide/usage.md");
        assert_eq!(plan.order[0], "1");
        assert!(plan.failures.is_empty());
    }

    #[test]
    fn space_home_flattens_children_to_root() {
        let nodes = vec![
            page("1", "Home", &[]),
            page("2", "Intro", &["1"]),
            page("3", "Team", &["1"]),
            page("4", "Alice", &["1", "3"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Space);

        assert_eq!(path(&plan, "1"), "index.md");
        assert_eq!(path(&plan, "2"), "intro.md");
        assert_eq!(path(&plan, "3"), "team/index.md");
        assert_eq!(path(&plan, "4"), "team/alice.md");
    }

    #[test]
    fn several_space_roots_are_not_flattened() {
        let nodes = vec![page("1", "A", &[]), page("2", "B", &[])];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Space);
        assert_eq!(path(&plan, "1"), "a.md");
        assert_eq!(path(&plan, "2"), "b.md");
    }

    #[test]
    fn sibling_collision_lower_id_keeps_bare_slug() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("12", "Notes", &["1"]),
            page("5", "notes!", &["1"]),
            page("30", "NOTES", &["1"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "5"), "root/notes.md");
        assert_eq!(path(&plan, "12"), "root/notes-2.md");
        assert_eq!(path(&plan, "30"), "root/notes-3.md");
    }

    #[test]
    fn preserved_path_is_claimed_before_fresh_slugs() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("2", "Notes", &["1"]),
            page("9", "Notes", &["1"]),
        ];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("9".to_string(), placed("root/notes.md", "Notes", &["1"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "9"), "root/notes.md");
        assert_eq!(plan.get("9").unwrap().change, PathChange::Unchanged);
        assert_eq!(path(&plan, "2"), "root/notes-2.md");
        assert_eq!(plan.get("2").unwrap().change, PathChange::New);
    }

    #[test]
    fn custom_file_name_survives_when_nothing_changed() {
        let nodes = vec![page("1", "Root", &[]), page("2", "Setup Guide", &["1"])];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("2".to_string(), placed("root/my-setup.md", "Setup Guide", &["1"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "2"), "root/my-setup.md");
    }

    #[test]
    fn title_change_moves_file() {
        let nodes = vec![page("1", "Root", &[]), page("2", "Renamed", &["1"])];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("2".to_string(), placed("root/old.md", "Old", &["1"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(
            plan.get("2").unwrap(),
            &Mapping {
                path: "root/renamed.md".into(),
                change: PathChange::Moved {
                    from: "root/old.md".into()
                },
            }
        );
    }

    #[test]
    fn parent_rename_rebases_descendants() {
        let nodes = vec![
            page("1", "Manual", &[]),
            page("2", "Setup", &["1"]),
            page("3", "Linux", &["1", "2"]),
        ];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("guide/index.md", "Guide", &[]));
        previous.insert("2".to_string(), placed("guide/setup/index.md", "Setup", &["1"]));
        previous.insert("3".to_string(), placed("guide/setup/my-linux.md", "Linux", &["1", "2"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "1"), "manual/index.md");
        assert_eq!(path(&plan, "2"), "manual/setup/index.md");
        assert_eq!(path(&plan, "3"), "manual/setup/my-linux.md");
    }

    #[test]
    fn reparented_subtree_keeps_descendant_names() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("2", "A", &["1"]),
            page("3", "B", &["1"]),
            page("4", "Topic", &["1", "3"]),
            page("5", "Deep", &["1", "3", "4"]),
        ];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("2".to_string(), placed("root/a/index.md", "A", &["1"]));
        previous.insert("3".to_string(), placed("root/b.md", "B", &["1"]));
        previous.insert("4".to_string(), placed("root/a/topic/index.md", "Topic", &["1", "2"]));
        previous.insert("5".to_string(), placed("root/a/topic/my-deep.md", "Deep", &["1", "2", "4"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "3"), "root/b/index.md");
        assert_eq!(path(&plan, "4"), "root/b/topic/index.md");
        assert_eq!(path(&plan, "5"), "root/b/topic/my-deep.md");
        assert_eq!(path(&plan, "2"), "root/a.md");
    }

    #[test]
    fn leaf_gaining_children_becomes_index() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("2", "Topic", &["1"]),
            page("3", "Sub", &["1", "2"]),
        ];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("2".to_string(), placed("root/topic.md", "Topic", &["1"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "2"), "root/topic/index.md");
        assert_eq!(path(&plan, "3"), "root/topic/sub.md");
    }

    #[test]
    fn out_of_scope_ancestors_are_skipped() {
        let nodes = vec![page("5", "Root", &["1", "2"]), page("6", "Child", &["1", "2", "5"])];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "5"), "root/index.md");
        assert_eq!(path(&plan, "6"), "root/child.md");
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("2", "A", &["3"]),
            page("3", "B", &["2"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "1"), "root.md");
        let mut failed: Vec<&str> = plan.failures.iter().map(|f| f.id.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["2", "3"]);
    }

    #[test]
    fn unavailable_parent_fails_subtree() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("3", "Child", &["1", "2"]),
            page("4", "Grandchild", &["1", "2", "3"]),
        ];
        let unavailable = HashSet::from(["2".to_string()]);
        let plan = map_paths(&nodes, &HashMap::new(), ScopeKind::Tree, &unavailable);

        assert!(plan.get("3").is_none());
        assert!(plan.get("4").is_none());
        assert_eq!(plan.failures.len(), 2);
    }

    #[test]
    fn folder_maps_to_index_without_children() {
        let mut folder = page("2", "Archive", &["1"]);
        folder.content_type = ContentType::Folder;
        let nodes = vec![page("1", "Root", &[]), folder];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "2"), "root/archive/index.md");
    }

    #[test]
    fn lingering_file_of_unknown_node_is_not_reused() {
        let nodes = vec![page("1", "Root", &[]), page("3", "Notes", &["1"])];
        let mut previous = HashMap::new();
        previous.insert("1".to_string(), placed("root/index.md", "Root", &[]));
        previous.insert("2".to_string(), placed("root/notes.md", "Notes", &["1"]));

        let plan = map(&nodes, &previous, ScopeKind::Tree);
        assert_eq!(path(&plan, "3"), "root/notes-2.md");
    }

    #[test]
    fn paths_are_unique() {
        let nodes: Vec<MapNode> = std::iter::once(page("1", "Root", &[]))
            .chain((2..40).map(|i| page(&i.to_string(), "Same", &["1"])))
            .collect();
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        let unique: HashSet<&str> = plan.mappings.values().map(|m| m.path.as_str()).collect();
        assert_eq!(unique.len(), nodes.len());
    }

    #[test]
    fn leaf_titled_index_never_takes_parent_file() {
        let nodes = vec![
            page("100", "Root", &[]),
            page("101", "Index", &["100"]),
            page("102", "Other", &["100"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "100"), "root/index.md");
        assert_eq!(path(&plan, "101"), "root/index-2.md");
        assert_eq!(path(&plan, "102"), "root/other.md");
    }

    #[test]
    fn leaf_titled_index_under_space_home() {
        let nodes = vec![page("1", "Home", &[]), page("2", "index!", &["1"])];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Space);
        assert_eq!(path(&plan, "1"), "index.md");
        assert_eq!(path(&plan, "2"), "index-2.md");
    }

    #[test]
    fn section_titled_index_keeps_its_directory() {
        let nodes = vec![
            page("1", "Root", &[]),
            page("2", "Index", &["1"]),
            page("3", "Entry", &["1", "2"]),
        ];
        let plan = map(&nodes, &HashMap::new(), ScopeKind::Tree);
        assert_eq!(path(&plan, "2"), "root/index/index.md");
        assert_eq!(path(&plan, "3"), "root/index/entry.md");
    }

    #[test]
    fn helper_paths() {
        assert_eq!(children_dir("index.md"), "");
        assert_eq!(children_dir("a/b/index.md"), "a/b");
        assert_eq!(parent_entry_dir("a/b/index.md"), "a");
        assert_eq!(parent_entry_dir("a/b/c.md"), "a/b");
        assert_eq!(parent_entry_dir("c.md"), "");
        assert_eq!(stem_of("a/b/index.md"), Some("b"));
        assert_eq!(stem_of("a/c.md"), Some("c"));
    }
}
