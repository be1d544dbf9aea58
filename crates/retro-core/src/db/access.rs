//! Visibility and permission checks for retrospectives.
//!
//! - a retrospective is visible when it is public, or the viewer is its
//!   owner or one of its attendees
//! - metadata edits, deletion, reparenting and attendee management are
//!   owner-only
//! - owners and attendees may append items, tags, comments and photos
//!
//! A private retrospective the caller cannot see is reported as missing
//! rather than forbidden, so its existence does not leak.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::{Result, RetroError};
use crate::model::Attendee;

/// Ownership, privacy and attendees of one retrospective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetroAccess {
    pub retro_id: String,
    pub owner: String,
    pub is_private: bool,
    pub attendees: Vec<Attendee>,
}

impl RetroAccess {
    #[must_use]
    pub fn is_owner(&self, user: &str) -> bool {
        self.owner == user
    }

    #[must_use]
    pub fn is_attendee(&self, user: &str) -> bool {
        self.attendees.iter().any(|attendee| attendee.is(user))
    }

    #[must_use]
    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        !self.is_private || viewer.is_some_and(|user| self.is_owner(user) || self.is_attendee(user))
    }

    #[must_use]
    pub fn can_contribute(&self, user: &str) -> bool {
        self.is_owner(user) || self.is_attendee(user)
    }
}

/// Load the access facts for `retro_id`.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if the retrospective does not exist.
pub fn load_access(conn: &Connection, retro_id: &str) -> Result<RetroAccess> {
    let head: Option<(String, i64)> = conn
        .query_row(
            "SELECT owner, is_private FROM retrospectives WHERE retro_id = ?1",
            params![retro_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .with_context(|| format!("load access for '{retro_id}'"))?;
    let Some((owner, is_private)) = head else {
        return Err(RetroError::not_found("retrospective", retro_id));
    };

    let mut stmt = conn
        .prepare("SELECT name, user_ref FROM retro_attendees WHERE retro_id = ?1")
        .context("prepare attendee access query")?;
    let rows = stmt
        .query_map(params![retro_id], |row| {
            Ok(Attendee {
                name: row.get(0)?,
                user: row.get(1)?,
            })
        })
        .context("execute attendee access query")?;
    let mut attendees = Vec::new();
    for row in rows {
        attendees.push(row.context("read attendee access row")?);
    }

    Ok(RetroAccess {
        retro_id: retro_id.to_string(),
        owner,
        is_private: is_private != 0,
        attendees,
    })
}

/// Load access facts and fail unless `viewer` can see the retrospective.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] when missing or hidden from `viewer`.
pub fn require_visible(
    conn: &Connection,
    retro_id: &str,
    viewer: Option<&str>,
) -> Result<RetroAccess> {
    let access = load_access(conn, retro_id)?;
    if access.is_visible_to(viewer) {
        Ok(access)
    } else {
        Err(RetroError::not_found("retrospective", retro_id))
    }
}

/// Fail unless `user` owns the retrospective.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] when hidden, [`RetroError::Forbidden`]
/// when visible but owned by someone else.
pub fn require_owner(
    conn: &Connection,
    retro_id: &str,
    user: &str,
    action: &'static str,
) -> Result<RetroAccess> {
    let access = require_visible(conn, retro_id, Some(user))?;
    if access.is_owner(user) {
        Ok(access)
    } else {
        tracing::debug!(user, retro_id, action, "owner check failed");
        Err(RetroError::forbidden(user, action, retro_id))
    }
}

/// Fail unless `user` is the owner or an attendee.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] when hidden, [`RetroError::Forbidden`]
/// when visible but `user` did not take part.
pub fn require_contributor(
    conn: &Connection,
    retro_id: &str,
    user: &str,
    action: &'static str,
) -> Result<RetroAccess> {
    let access = require_visible(conn, retro_id, Some(user))?;
    if access.can_contribute(user) {
        Ok(access)
    } else {
        tracing::debug!(user, retro_id, action, "contributor check failed");
        Err(RetroError::forbidden(user, action, retro_id))
    }
}

/// Whether `user` is tagged on the retrospective, by linked identity or name.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if the retrospective does not exist.
pub fn is_retro_attendee(conn: &Connection, retro_id: &str, user: &str) -> Result<bool> {
    Ok(load_access(conn, retro_id)?.is_attendee(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn seed(conn: &Connection, private: bool) {
        conn.execute(
            "INSERT INTO retrospectives (retro_id, owner, title, event_date, is_private, \
             created_at_us, updated_at_us) VALUES ('r1', 'ana', 'Trip', '2024-01-01', ?1, 1, 1)",
            params![i64::from(private)],
        )
        .expect("insert retro");
        conn.execute(
            "INSERT INTO retro_attendees (retro_id, name, user_ref, created_at_us) \
             VALUES ('r1', 'Benjamin', 'ben', 1)",
            [],
        )
        .expect("insert attendee");
    }

    #[test]
    fn owner_passes_every_check() {
        let conn = open_in_memory().expect("db");
        seed(&conn, true);
        assert!(require_owner(&conn, "r1", "ana", "edit").is_ok());
        assert!(require_contributor(&conn, "r1", "ana", "add items to").is_ok());
    }

    #[test]
    fn attendee_contributes_but_does_not_own() {
        let conn = open_in_memory().expect("db");
        seed(&conn, true);
        assert!(require_contributor(&conn, "r1", "ben", "add items to").is_ok());
        assert!(matches!(
            require_owner(&conn, "r1", "ben", "edit"),
            Err(RetroError::Forbidden { .. })
        ));
        assert!(is_retro_attendee(&conn, "r1", "BENJAMIN").expect("check"));
    }

    #[test]
    fn strangers_cannot_see_private_rows() {
        let conn = open_in_memory().expect("db");
        seed(&conn, true);
        assert!(matches!(
            require_visible(&conn, "r1", Some("eve")),
            Err(RetroError::NotFound { .. })
        ));
        assert!(matches!(
            require_visible(&conn, "r1", None),
            Err(RetroError::NotFound { .. })
        ));
    }

    #[test]
    fn strangers_see_public_rows_but_cannot_write() {
        let conn = open_in_memory().expect("db");
        seed(&conn, false);
        assert!(require_visible(&conn, "r1", None).is_ok());
        assert!(matches!(
            require_contributor(&conn, "r1", "eve", "comment on"),
            Err(RetroError::Forbidden { .. })
        ));
    }

    #[test]
    fn missing_retro_is_not_found() {
        let conn = open_in_memory().expect("db");
        assert!(matches!(
            load_access(&conn, "nope"),
            Err(RetroError::NotFound { .. })
        ));
    }
}
