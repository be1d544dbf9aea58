//! In-memory retrospective hierarchy.
//!
//! Retrospectives form a forest through their `parent_id` pointers. This
//! module holds the pure operations over that forest:
//!
//! - [`split_parents_and_children`] partitions a flat list into roots and
//!   per-parent child groups
//! - [`walk_breadcrumb`] builds a root-to-leaf trail from any parent lookup,
//!   guarding against cycles, dangling parents and runaway depth
//! - [`RetroArena`] is an id-keyed node map whose writes reject cycles
//!
//! The store-backed equivalents live in [`super::hierarchy`].

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::error::{Result, RetroError};
use crate::model::Retrospective;

/// Upper bound on parent hops followed when building a breadcrumb.
pub const MAX_BREADCRUMB_HOPS: usize = 64;

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: String,
    pub title: String,
}

/// Roots and child groups of a flat retrospective list.
#[derive(Debug, Default, PartialEq)]
pub struct Split<'a> {
    /// Retrospectives without a parent, in input order.
    pub parents: Vec<&'a Retrospective>,
    /// Children keyed by parent id, each group in input order. Parents that
    /// are absent from the input still get a group.
    pub children_by_parent: BTreeMap<String, Vec<&'a Retrospective>>,
}

impl Split<'_> {
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> &[&Retrospective] {
        self.children_by_parent
            .get(parent_id)
            .map_or(&[], Vec::as_slice)
    }
}

/// Partition `retros` into roots and children grouped by parent id.
#[must_use]
pub fn split_parents_and_children(retros: &[Retrospective]) -> Split<'_> {
    let mut split = Split::default();
    for retro in retros {
        match &retro.parent_id {
            None => split.parents.push(retro),
            Some(parent_id) => split
                .children_by_parent
                .entry(parent_id.clone())
                .or_default()
                .push(retro),
        }
    }
    split
}

/// Build a root-to-leaf breadcrumb for `leaf_id`.
///
/// `lookup` returns the crumb for an id plus that node's parent id, or
/// `None` when the id does not resolve. The walk stops at a root, at a
/// revisited id, after `max_hops` parent hops, or at an unresolvable parent;
/// the trail is returned as far as it got. An unresolvable leaf yields an
/// empty trail.
///
/// # Errors
///
/// Propagates errors from `lookup`.
pub fn walk_breadcrumb<F, E>(leaf_id: &str, max_hops: usize, mut lookup: F) -> Result<Vec<Crumb>, E>
where
    F: FnMut(&str) -> Result<Option<(Crumb, Option<String>)>, E>,
{
    let mut trail = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut next = Some(leaf_id.to_string());
    let mut hops = 0usize;

    while let Some(id) = next.take() {
        if !visited.insert(id.clone()) {
            tracing::warn!(
                retro = %leaf_id,
                at = %id,
                "cycle in parent chain, breadcrumb truncated"
            );
            break;
        }
        let Some((crumb, parent_id)) = lookup(&id)? else {
            if !trail.is_empty() {
                tracing::warn!(
                    retro = %leaf_id,
                    missing = %id,
                    "dangling parent, breadcrumb truncated"
                );
            }
            break;
        };
        trail.push(crumb);

        if parent_id.is_some() {
            if hops >= max_hops {
                tracing::warn!(retro = %leaf_id, max_hops, "breadcrumb hop limit reached");
                break;
            }
            hops += 1;
        }
        next = parent_id;
    }

    trail.reverse();
    Ok(trail)
}

#[derive(Debug, Clone)]
struct ArenaNode {
    title: String,
    parent_id: Option<String>,
}

/// Id-keyed retrospective forest with validated parent assignment.
///
/// [`RetroArena::set_parent`] refuses any write that would make a node its
/// own ancestor, so a tree built only through it is always acyclic. Trees
/// loaded with [`RetroArena::from_retros`] are taken as-is and every read
/// is still cycle-guarded.
#[derive(Debug, Clone, Default)]
pub struct RetroArena {
    nodes: HashMap<String, ArenaNode>,
    order: Vec<String>,
}

impl RetroArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load existing retrospectives without validating their parent links.
    #[must_use]
    pub fn from_retros<'a, I>(retros: I) -> Self
    where
        I: IntoIterator<Item = &'a Retrospective>,
    {
        let mut arena = Self::new();
        for retro in retros {
            arena.put(&retro.id, &retro.title, retro.parent_id.clone());
        }
        arena
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|node| node.parent_id.as_deref())
    }

    #[must_use]
    pub fn title(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|node| node.title.as_str())
    }

    /// Add a node under `parent_id` (or as a root). Re-inserting an existing
    /// id updates its title and goes through [`Self::set_parent`].
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::NotFound`] for an unknown parent, or
    /// [`RetroError::CycleDetected`] when re-parenting an existing node
    /// under its own subtree.
    pub fn insert(&mut self, id: &str, title: &str, parent_id: Option<&str>) -> Result<()> {
        if let Some(node) = self.nodes.get_mut(id) {
            node.title = title.to_string();
            return self.set_parent(id, parent_id);
        }
        if let Some(parent) = parent_id {
            if !self.contains(parent) {
                return Err(RetroError::not_found("retrospective", parent));
            }
        }
        self.put(id, title, parent_id.map(str::to_string));
        Ok(())
    }

    /// Point `id` at `parent_id`, or detach it to a root with `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::NotFound`] if either node is unknown, or
    /// [`RetroError::CycleDetected`] if `id` is `parent_id` or one of its
    /// ancestors.
    pub fn set_parent(&mut self, id: &str, parent_id: Option<&str>) -> Result<()> {
        if !self.contains(id) {
            return Err(RetroError::not_found("retrospective", id));
        }
        if let Some(parent) = parent_id {
            if !self.contains(parent) {
                return Err(RetroError::not_found("retrospective", parent));
            }
            if parent == id || self.ancestors(parent).iter().any(|ancestor| ancestor == id) {
                return Err(RetroError::CycleDetected {
                    retro_id: id.to_string(),
                    proposed_parent: parent.to_string(),
                });
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = parent_id.map(str::to_string);
        }
        Ok(())
    }

    /// Ancestor ids, nearest first. Stops at a root, a revisit or an unknown
    /// parent.
    #[must_use]
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(id);
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if !visited.insert(parent) || !self.contains(parent) {
                break;
            }
            out.push(parent.to_string());
            current = self.parent_of(parent);
        }
        out
    }

    /// Root-to-leaf trail for `id`, see [`walk_breadcrumb`].
    #[must_use]
    pub fn breadcrumb(&self, id: &str) -> Vec<Crumb> {
        self.breadcrumb_with_limit(id, MAX_BREADCRUMB_HOPS)
    }

    #[must_use]
    pub fn breadcrumb_with_limit(&self, id: &str, max_hops: usize) -> Vec<Crumb> {
        let walked: Result<Vec<Crumb>, std::convert::Infallible> =
            walk_breadcrumb(id, max_hops, |current| {
                Ok(self.nodes.get(current).map(|node| {
                    (
                        Crumb {
                            id: current.to_string(),
                            title: node.title.clone(),
                        },
                        node.parent_id.clone(),
                    )
                }))
            });
        walked.unwrap_or_default()
    }

    /// Direct children of `id` in insertion order.
    #[must_use]
    pub fn children_of(&self, id: &str) -> Vec<&str> {
        self.order
            .iter()
            .filter(|candidate| self.parent_of(candidate) == Some(id))
            .map(String::as_str)
            .collect()
    }

    /// `root` and all its descendants in BFS order, root first.
    #[must_use]
    pub fn subtree_ids(&self, root: &str) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        let mut result = Vec::new();
        if !self.contains(root) {
            return result;
        }
        queue.push_back(root.to_string());

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for child in self.children_of(&current) {
                if !visited.contains(child) {
                    queue.push_back(child.to_string());
                }
            }
            result.push(current);
        }
        result
    }

    fn put(&mut self, id: &str, title: &str, parent_id: Option<String>) {
        let node = ArenaNode {
            title: title.to_string(),
            parent_id,
        };
        if self.nodes.insert(id.to_string(), node).is_none() {
            self.order.push(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn retro(id: &str, parent: Option<&str>) -> Retrospective {
        let date = NaiveDate::from_ymd_opt(2024, 8, 1).expect("valid date");
        let mut r = Retrospective::new(id, "ana", format!("T{id}"), date);
        r.parent_id = parent.map(str::to_string);
        r
    }

    fn ids(crumbs: &[Crumb]) -> Vec<&str> {
        crumbs.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn split_groups_children_in_input_order() {
        let retros = vec![
            retro("a", None),
            retro("b1", Some("a")),
            retro("z", None),
            retro("b2", Some("a")),
            retro("orphan", Some("gone")),
        ];
        let split = split_parents_and_children(&retros);

        let parents: Vec<&str> = split.parents.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(parents, vec!["a", "z"]);
        let kids: Vec<&str> = split.children_of("a").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(kids, vec!["b1", "b2"]);
        assert_eq!(split.children_of("gone").len(), 1);
        assert!(split.children_of("z").is_empty());
    }

    #[test]
    fn breadcrumb_is_root_to_leaf() {
        let arena = RetroArena::from_retros(&[
            retro("root", None),
            retro("mid", Some("root")),
            retro("leaf", Some("mid")),
        ]);
        assert_eq!(ids(&arena.breadcrumb("leaf")), vec!["root", "mid", "leaf"]);
        assert_eq!(arena.breadcrumb("leaf")[0].title, "Troot");
        assert_eq!(ids(&arena.breadcrumb("root")), vec!["root"]);
    }

    #[test]
    fn breadcrumb_of_unknown_id_is_empty() {
        let arena = RetroArena::new();
        assert!(arena.breadcrumb("nope").is_empty());
    }

    #[test]
    fn breadcrumb_truncates_at_dangling_parent() {
        let arena = RetroArena::from_retros(&[retro("kid", Some("deleted"))]);
        assert_eq!(ids(&arena.breadcrumb("kid")), vec!["kid"]);
    }

    #[test]
    fn breadcrumb_terminates_on_loaded_cycle() {
        let arena = RetroArena::from_retros(&[retro("a", Some("b")), retro("b", Some("a"))]);
        let trail = arena.breadcrumb("a");
        assert_eq!(ids(&trail), vec!["b", "a"]);
    }

    #[test]
    fn breadcrumb_respects_hop_limit() {
        let mut retros = vec![retro("n0", None)];
        for i in 1..10 {
            retros.push(retro(&format!("n{i}"), Some(&format!("n{}", i - 1))));
        }
        let arena = RetroArena::from_retros(&retros);
        let trail = arena.breadcrumb_with_limit("n9", 3);
        assert_eq!(ids(&trail), vec!["n6", "n7", "n8", "n9"]);
    }

    #[test]
    fn set_parent_rejects_self_and_descendants() {
        let mut arena = RetroArena::new();
        arena.insert("a", "A", None).expect("a");
        arena.insert("b", "B", Some("a")).expect("b");
        arena.insert("c", "C", Some("b")).expect("c");

        assert!(matches!(
            arena.set_parent("a", Some("a")),
            Err(RetroError::CycleDetected { .. })
        ));
        assert!(matches!(
            arena.set_parent("a", Some("c")),
            Err(RetroError::CycleDetected { .. })
        ));
        assert_eq!(arena.parent_of("a"), None, "rejected write leaves tree untouched");
    }

    #[test]
    fn set_parent_moves_and_detaches() {
        let mut arena = RetroArena::new();
        arena.insert("a", "A", None).expect("a");
        arena.insert("b", "B", None).expect("b");
        arena.insert("c", "C", Some("a")).expect("c");

        arena.set_parent("c", Some("b")).expect("move");
        assert_eq!(arena.parent_of("c"), Some("b"));
        arena.set_parent("c", None).expect("detach");
        assert_eq!(arena.parent_of("c"), None);
    }

    #[test]
    fn insert_requires_known_parent() {
        let mut arena = RetroArena::new();
        assert!(matches!(
            arena.insert("a", "A", Some("ghost")),
            Err(RetroError::NotFound { .. })
        ));
        assert!(arena.is_empty());
    }

    #[test]
    fn subtree_is_bfs_root_first() {
        let mut arena = RetroArena::new();
        arena.insert("r", "R", None).expect("r");
        arena.insert("a", "A", Some("r")).expect("a");
        arena.insert("b", "B", Some("r")).expect("b");
        arena.insert("a1", "A1", Some("a")).expect("a1");
        arena.insert("other", "O", None).expect("other");

        assert_eq!(arena.subtree_ids("r"), vec!["r", "a", "b", "a1"]);
        assert_eq!(arena.ancestors("a1"), vec!["a", "r"]);
        assert!(arena.subtree_ids("missing").is_empty());
    }
}
