//! Store-backed hierarchy queries.
//!
//! - What is the breadcrumb trail of a retrospective?
//! - What are its ancestors?
//! - Which retrospectives sit in its subtree?
//! - Is a reparenting operation valid?
//!
//! # Cycle prevention
//!
//! `validate_reparent` checks that the proposed parent is neither the
//! retrospective itself nor one of its descendants. Reads are cycle-guarded
//! regardless, so rows written before validation existed still terminate.

use anyhow::Context as AnyhowContext;
use rusqlite::Connection;
use std::collections::{HashSet, VecDeque};

use super::arena::{Crumb, walk_breadcrumb};
use crate::db::access::load_access;
use crate::db::query::{self, RetroLink};
use crate::error::{Result, RetroError};

/// Root-to-leaf breadcrumb for `retro_id`, following at most `max_hops`
/// parent links. A missing retrospective yields an empty trail.
///
/// The trail starts below the nearest ancestor `viewer` cannot see, so a
/// private parent's title never shows up under a public child.
///
/// # Errors
///
/// Returns [`RetroError::Db`] for database failures.
pub fn get_retro_breadcrumb(
    conn: &Connection,
    retro_id: &str,
    viewer: Option<&str>,
    max_hops: usize,
) -> Result<Vec<Crumb>> {
    let mut trail = walk_breadcrumb(retro_id, max_hops, |id| {
        let link = query::get_retro_link(conn, id)?;
        Ok::<_, RetroError>(
            link.map(|RetroLink { id, title, parent_id }| (Crumb { id, title }, parent_id)),
        )
    })?;

    let mut hidden_at = None;
    for (depth, crumb) in trail.iter().enumerate().rev() {
        if !load_access(conn, &crumb.id)?.is_visible_to(viewer) {
            hidden_at = Some(depth);
            break;
        }
    }
    if let Some(depth) = hidden_at {
        tracing::debug!(
            retro = %retro_id,
            hidden = %trail[depth].id,
            "breadcrumb cut at hidden ancestor"
        );
        trail.drain(..=depth);
    }

    tracing::debug!(retro = %retro_id, depth = trail.len(), "built breadcrumb");
    Ok(trail)
}

/// Ancestor links of `retro_id`, immediate parent first.
///
/// Cycles and dangling parents end the chain early.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if `retro_id` does not exist, or
/// [`RetroError::Db`] for database failures.
pub fn get_ancestors(conn: &Connection, retro_id: &str) -> Result<Vec<RetroLink>> {
    let start = query::get_retro_link(conn, retro_id)
        .with_context(|| format!("get_retro_link '{retro_id}'"))?
        .ok_or_else(|| RetroError::not_found("retrospective", retro_id))?;

    let mut ancestors = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.id);
    let mut current_parent_id = start.parent_id;

    while let Some(parent_id) = current_parent_id {
        if !visited.insert(parent_id.clone()) {
            tracing::warn!(retro = %retro_id, at = %parent_id, "cycle in stored parent chain");
            break;
        }
        let Some(parent) = query::get_retro_link(conn, &parent_id)
            .with_context(|| format!("get_retro_link '{parent_id}'"))?
        else {
            break;
        };
        current_parent_id = parent.parent_id.clone();
        ancestors.push(parent);
    }

    Ok(ancestors)
}

/// All retrospective ids in the subtree rooted at `root_id`, including
/// `root_id` itself, in BFS order.
///
/// # Errors
///
/// Returns [`RetroError::Db`] for database failures.
pub fn get_subtree_ids(conn: &Connection, root_id: &str) -> Result<Vec<String>> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut result = Vec::new();

    queue.push_back(root_id.to_string());

    while let Some(current_id) = queue.pop_front() {
        if !visited.insert(current_id.clone()) {
            continue;
        }
        let children = query::get_child_ids(conn, &current_id)
            .with_context(|| format!("get_child_ids for '{current_id}'"))?;
        result.push(current_id);
        for child in children {
            if !visited.contains(&child) {
                queue.push_back(child);
            }
        }
    }

    Ok(result)
}

/// Check that `retro_id` may be placed under `new_parent_id`.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if either retrospective does not exist,
/// or [`RetroError::CycleDetected`] if the move would create a cycle.
pub fn validate_reparent(conn: &Connection, retro_id: &str, new_parent_id: &str) -> Result<()> {
    for id in [retro_id, new_parent_id] {
        if !query::retro_exists(conn, id).with_context(|| format!("retro_exists '{id}'"))? {
            return Err(RetroError::not_found("retrospective", id));
        }
    }

    let subtree = get_subtree_ids(conn, retro_id)?;
    if subtree.iter().any(|id| id == new_parent_id) {
        return Err(RetroError::CycleDetected {
            retro_id: retro_id.to_string(),
            proposed_parent: new_parent_id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use rusqlite::params;

    fn insert(conn: &Connection, id: &str, parent: Option<&str>) {
        conn.execute(
            "INSERT INTO retrospectives \
             (retro_id, owner, title, event_date, parent_id, created_at_us, updated_at_us) \
             VALUES (?1, 'ana', ?2, '2024-01-01', ?3, ?4, ?4)",
            params![id, format!("Title {id}"), parent, conn.last_insert_rowid() + 1],
        )
        .expect("insert retro");
    }

    fn chain(conn: &Connection) {
        insert(conn, "root", None);
        insert(conn, "mid", Some("root"));
        insert(conn, "leaf", Some("mid"));
    }

    #[test]
    fn breadcrumb_walks_to_root() {
        let conn = open_in_memory().expect("db");
        chain(&conn);
        let trail = get_retro_breadcrumb(&conn, "leaf", None, 64).expect("trail");
        let ids: Vec<&str> = trail.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "mid", "leaf"]);
        assert_eq!(trail[1].title, "Title mid");
    }

    #[test]
    fn breadcrumb_of_missing_retro_is_empty() {
        let conn = open_in_memory().expect("db");
        assert!(get_retro_breadcrumb(&conn, "ghost", None, 64).expect("trail").is_empty());
    }

    #[test]
    fn breadcrumb_stops_below_hidden_ancestor() {
        let conn = open_in_memory().expect("db");
        chain(&conn);
        conn.execute("UPDATE retrospectives SET is_private = 1 WHERE retro_id = 'mid'", [])
            .expect("hide mid");

        let ids = |viewer: Option<&str>| -> Vec<String> {
            get_retro_breadcrumb(&conn, "leaf", viewer, 64)
                .expect("trail")
                .into_iter()
                .map(|c| c.id)
                .collect()
        };
        assert_eq!(ids(Some("bob")), vec!["leaf"]);
        assert_eq!(ids(None), vec!["leaf"]);
        assert_eq!(ids(Some("ana")), vec!["root", "mid", "leaf"]);
    }

    #[test]
    fn breadcrumb_survives_stored_cycle() {
        let conn = open_in_memory().expect("db");
        insert(&conn, "a", None);
        insert(&conn, "b", Some("a"));
        // Bypass validation to simulate legacy data.
        conn.execute("UPDATE retrospectives SET parent_id = 'b' WHERE retro_id = 'a'", [])
            .expect("force cycle");
        let trail = get_retro_breadcrumb(&conn, "a", None, 64).expect("trail");
        assert_eq!(trail.len(), 2);
        assert_eq!(get_ancestors(&conn, "a").expect("ancestors").len(), 1);
        assert_eq!(get_subtree_ids(&conn, "a").expect("subtree").len(), 2);
    }

    #[test]
    fn ancestors_nearest_first() {
        let conn = open_in_memory().expect("db");
        chain(&conn);
        let ids: Vec<String> = get_ancestors(&conn, "leaf")
            .expect("ancestors")
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, vec!["mid", "root"]);
        assert!(get_ancestors(&conn, "root").expect("ancestors").is_empty());
        assert!(matches!(
            get_ancestors(&conn, "ghost"),
            Err(RetroError::NotFound { .. })
        ));
    }

    #[test]
    fn subtree_bfs_root_first() {
        let conn = open_in_memory().expect("db");
        chain(&conn);
        insert(&conn, "sib", Some("root"));
        assert_eq!(
            get_subtree_ids(&conn, "root").expect("subtree"),
            vec!["root", "mid", "sib", "leaf"]
        );
    }

    #[test]
    fn validate_reparent_rules() {
        let conn = open_in_memory().expect("db");
        chain(&conn);
        insert(&conn, "other", None);

        assert!(validate_reparent(&conn, "leaf", "other").is_ok());
        assert!(validate_reparent(&conn, "mid", "other").is_ok());
        assert!(matches!(
            validate_reparent(&conn, "root", "leaf"),
            Err(RetroError::CycleDetected { .. })
        ));
        assert!(matches!(
            validate_reparent(&conn, "root", "root"),
            Err(RetroError::CycleDetected { .. })
        ));
        assert!(matches!(
            validate_reparent(&conn, "root", "ghost"),
            Err(RetroError::NotFound { .. })
        ));
    }
}
