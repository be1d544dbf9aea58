//! Write operations on retrospectives and everything hanging off them.
//!
//! Every function takes the acting user, checks it against
//! [`super::access`], then performs a single statement or a single
//! transaction. Multi-valued parts (attendees, items, tags, comments,
//! photos, reactions) are rows of their own, so concurrent appends from
//! different users never overwrite each other; metadata edits are
//! last-write-wins.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::info;

use super::access::{require_contributor, require_owner, require_visible};
use super::notification::insert_notification;
use super::{new_id, now_us, query};
use crate::error::{Result, RetroError};
use crate::graph::hierarchy::validate_reparent;
use crate::model::draft::{RetroDraft, RetroMetadata, normalize_tag, validate_text};
use crate::model::notification::NotificationKind;
use crate::model::{Category, Comment, Photo, RbtItem, Retrospective};

// ---------------------------------------------------------------------------
// Retrospectives
// ---------------------------------------------------------------------------

/// Create a retrospective with its attendees in one transaction.
///
/// The parent, when given, must be one the owner can contribute to. Tagged
/// attendees other than the owner are notified.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] for a bad draft,
/// [`RetroError::NotFound`] for an unknown parent or feedback space,
/// [`RetroError::Forbidden`] when the parent belongs to someone else, or
/// [`RetroError::Db`] on store failure.
pub fn create_retro(
    conn: &mut Connection,
    owner: &str,
    draft: &RetroDraft,
) -> Result<Retrospective> {
    draft.validate()?;
    if let Some(parent_id) = &draft.parent_id {
        require_contributor(conn, parent_id, owner, "add a child to")?;
    }
    if let Some(space_id) = &draft.feedback_space_id {
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM feedback_spaces WHERE space_id = ?1)",
                params![space_id],
                |row| row.get(0),
            )
            .context("check feedback space")?;
        if !exists {
            return Err(RetroError::not_found("feedback space", space_id));
        }
    }

    let retro_id = new_id();
    let tx = conn.transaction().context("begin create_retro")?;
    insert_retro_row(&tx, &retro_id, owner, draft)?;
    for name in &draft.attendees {
        insert_attendee(&tx, owner, &retro_id, &draft.metadata.title, name, None)?;
    }
    tx.commit().context("commit create_retro")?;

    info!(retro = %retro_id, owner, attendees = draft.attendees.len(), "created retrospective");
    query::get_retro(conn, &retro_id)?
        .ok_or_else(|| RetroError::not_found("retrospective", &retro_id))
}

fn insert_retro_row(
    tx: &Transaction<'_>,
    retro_id: &str,
    owner: &str,
    draft: &RetroDraft,
) -> Result<()> {
    let meta = &draft.metadata;
    let location = meta.location.clone().unwrap_or_default();
    let now = now_us();
    tx.execute(
        "INSERT INTO retrospectives (
            retro_id, owner, title, event_type, event_date, primary_photo_url,
            location_name, city, state, country, lat, lng,
            parent_id, feedback_space_id, is_private, created_at_us, updated_at_us
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)",
        params![
            retro_id,
            owner,
            meta.title.trim(),
            meta.event_type.trim(),
            meta.date.to_string(),
            meta.primary_photo_url,
            location.name,
            location.city,
            location.state,
            location.country,
            location.lat,
            location.lng,
            draft.parent_id,
            draft.feedback_space_id,
            i64::from(meta.is_private),
            now,
        ],
    )
    .with_context(|| format!("insert retrospective '{retro_id}'"))?;
    Ok(())
}

/// Insert an attendee row; duplicates (case-insensitive) are ignored.
/// Returns whether a row was added.
fn insert_attendee(
    conn: &Connection,
    actor: &str,
    retro_id: &str,
    retro_title: &str,
    name: &str,
    user_ref: Option<&str>,
) -> Result<bool> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RetroError::validation("attendee", "must not be empty"));
    }
    let added = conn
        .execute(
            "INSERT OR IGNORE INTO retro_attendees (retro_id, name, user_ref, created_at_us) \
             VALUES (?1, ?2, ?3, ?4)",
            params![retro_id, name, user_ref, now_us()],
        )
        .with_context(|| format!("insert attendee '{name}'"))?
        > 0;
    if added {
        let recipient = user_ref.unwrap_or(name);
        insert_notification(
            conn,
            actor,
            recipient,
            NotificationKind::AttendeeAdded,
            Some(retro_id),
            &format!("{actor} tagged you in \"{retro_title}\""),
        )?;
    }
    Ok(added)
}

/// Overwrite title, event type, date, location, privacy and primary photo.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] unless `user` owns the retrospective,
/// [`RetroError::Validation`] for bad metadata.
pub fn update_retro_metadata(
    conn: &Connection,
    user: &str,
    retro_id: &str,
    metadata: &RetroMetadata,
) -> Result<()> {
    require_owner(conn, retro_id, user, "edit")?;
    metadata.validate()?;
    let location = metadata.location.clone().unwrap_or_default();
    conn.execute(
        "UPDATE retrospectives SET
            title = ?1, event_type = ?2, event_date = ?3, primary_photo_url = ?4,
            location_name = ?5, city = ?6, state = ?7, country = ?8, lat = ?9, lng = ?10,
            is_private = ?11, updated_at_us = ?12
         WHERE retro_id = ?13",
        params![
            metadata.title.trim(),
            metadata.event_type.trim(),
            metadata.date.to_string(),
            metadata.primary_photo_url,
            location.name,
            location.city,
            location.state,
            location.country,
            location.lat,
            location.lng,
            i64::from(metadata.is_private),
            now_us(),
            retro_id,
        ],
    )
    .with_context(|| format!("update metadata for '{retro_id}'"))?;
    info!(retro = %retro_id, user, "updated retrospective metadata");
    Ok(())
}

/// Delete a retrospective. Its children become roots; items, photos,
/// attendees and notifications go with it. Catalogue snapshots survive.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] unless `user` owns the retrospective.
pub fn delete_retro(conn: &Connection, user: &str, retro_id: &str) -> Result<()> {
    require_owner(conn, retro_id, user, "delete")?;
    conn.execute(
        "DELETE FROM retrospectives WHERE retro_id = ?1",
        params![retro_id],
    )
    .with_context(|| format!("delete retrospective '{retro_id}'"))?;
    info!(retro = %retro_id, user, "deleted retrospective");
    Ok(())
}

/// Move a retrospective under `parent_id`, or make it a root with `None`.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] unless `user` owns the retrospective and
/// may contribute to the new parent, [`RetroError::CycleDetected`] if the
/// move would loop, or [`RetroError::NotFound`] for unknown ids.
pub fn set_parent(
    conn: &Connection,
    user: &str,
    retro_id: &str,
    parent_id: Option<&str>,
) -> Result<()> {
    require_owner(conn, retro_id, user, "move")?;
    if let Some(parent) = parent_id {
        validate_reparent(conn, retro_id, parent)?;
        require_contributor(conn, parent, user, "add a child to")?;
    }
    conn.execute(
        "UPDATE retrospectives SET parent_id = ?1, updated_at_us = ?2 WHERE retro_id = ?3",
        params![parent_id, now_us(), retro_id],
    )
    .with_context(|| format!("set parent of '{retro_id}'"))?;
    info!(retro = %retro_id, parent = ?parent_id, "reparented retrospective");
    Ok(())
}

fn touch(conn: &Connection, retro_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE retrospectives SET updated_at_us = ?1 WHERE retro_id = ?2",
        params![now_us(), retro_id],
    )
    .with_context(|| format!("touch '{retro_id}'"))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Attendees
// ---------------------------------------------------------------------------

/// Tag `name` as an attendee. Returns `false` when already present.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] unless `actor` owns the retrospective.
pub fn add_attendee(
    conn: &Connection,
    actor: &str,
    retro_id: &str,
    name: &str,
    user_ref: Option<&str>,
) -> Result<bool> {
    require_owner(conn, retro_id, actor, "tag attendees on")?;
    let title: String = conn
        .query_row(
            "SELECT title FROM retrospectives WHERE retro_id = ?1",
            params![retro_id],
            |row| row.get(0),
        )
        .context("load retrospective title")?;
    let added = insert_attendee(conn, actor, retro_id, &title, name, user_ref)?;
    if added {
        touch(conn, retro_id)?;
        info!(retro = %retro_id, attendee = name.trim(), "added attendee");
    }
    Ok(added)
}

/// Untag `name`. The owner may remove anyone; an attendee may remove
/// themself. Returns `false` when no such attendee existed.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] for anyone else.
pub fn remove_attendee(conn: &Connection, actor: &str, retro_id: &str, name: &str) -> Result<bool> {
    let access = require_visible(conn, retro_id, Some(actor))?;
    let target = access
        .attendees
        .iter()
        .find(|attendee| attendee.name.eq_ignore_ascii_case(name.trim()));
    let Some(target) = target else {
        return Ok(false);
    };
    if !access.is_owner(actor) && !target.is(actor) {
        return Err(RetroError::forbidden(actor, "untag attendees on", retro_id));
    }
    conn.execute(
        "DELETE FROM retro_attendees WHERE retro_id = ?1 AND name = ?2",
        params![retro_id, target.name],
    )
    .with_context(|| format!("remove attendee '{name}'"))?;
    touch(conn, retro_id)?;
    info!(retro = %retro_id, attendee = %target.name, "removed attendee");
    Ok(true)
}

// ---------------------------------------------------------------------------
// RBT items
// ---------------------------------------------------------------------------

/// Append an item to the end of `category` with optional initial tags.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] unless `user` is the owner or an
/// attendee, [`RetroError::Validation`] for blank text or tags.
pub fn add_rbt_item(
    conn: &mut Connection,
    user: &str,
    retro_id: &str,
    category: Category,
    text: &str,
    tags: &[String],
) -> Result<RbtItem> {
    require_contributor(conn, retro_id, user, "add items to")?;
    validate_text("text", text)?;
    let tags = tags
        .iter()
        .map(|tag| normalize_tag(tag))
        .collect::<Result<Vec<_>>>()?;

    let item_id = new_id();
    let now = now_us();
    let tx = conn.transaction().context("begin add_rbt_item")?;
    tx.execute(
        "INSERT INTO rbt_items
             (item_id, retro_id, category, position, body, owner_name, created_at_us)
         VALUES (?1, ?2, ?3,
                 (SELECT COALESCE(MAX(position), -1) + 1 FROM rbt_items
                  WHERE retro_id = ?2 AND category = ?3),
                 ?4, ?5, ?6)",
        params![item_id, retro_id, category.as_str(), text.trim(), user, now],
    )
    .with_context(|| format!("insert {category} into '{retro_id}'"))?;
    for tag in &tags {
        tx.execute(
            "INSERT OR IGNORE INTO rbt_item_tags (item_id, tag, created_at_us) VALUES (?1, ?2, ?3)",
            params![item_id, tag, now],
        )
        .with_context(|| format!("insert tag '{tag}'"))?;
    }
    tx.execute(
        "UPDATE retrospectives SET updated_at_us = ?1 WHERE retro_id = ?2",
        params![now, retro_id],
    )
    .context("touch retrospective")?;
    tx.commit().context("commit add_rbt_item")?;

    info!(retro = %retro_id, item = %item_id, %category, "added RBT item");
    let mut dedup = Vec::new();
    for tag in tags {
        if !dedup.contains(&tag) {
            dedup.push(tag);
        }
    }
    Ok(RbtItem::new(item_id, text.trim(), user).with_tags(dedup))
}

fn require_item_contributor(
    conn: &Connection,
    user: &str,
    item_id: &str,
    action: &'static str,
) -> Result<query::ItemRef> {
    let found =
        query::find_item(conn, item_id)?.ok_or_else(|| RetroError::not_found("item", item_id))?;
    require_contributor(conn, &found.retro_id, user, action)?;
    Ok(found)
}

/// Tag an item. Returns `false` when the tag was already there.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for an unknown item,
/// [`RetroError::Forbidden`] for non-contributors.
pub fn add_item_tag(conn: &Connection, user: &str, item_id: &str, tag: &str) -> Result<bool> {
    let found = require_item_contributor(conn, user, item_id, "tag items on")?;
    let tag = normalize_tag(tag)?;
    let added = conn
        .execute(
            "INSERT OR IGNORE INTO rbt_item_tags (item_id, tag, created_at_us) VALUES (?1, ?2, ?3)",
            params![item_id, tag, now_us()],
        )
        .with_context(|| format!("tag item '{item_id}'"))?
        > 0;
    if added {
        touch(conn, &found.retro_id)?;
    }
    Ok(added)
}

/// Append a comment to an item and notify the item's author.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for an unknown item,
/// [`RetroError::Forbidden`] for non-contributors,
/// [`RetroError::Validation`] for blank text.
pub fn add_item_comment(
    conn: &Connection,
    user: &str,
    item_id: &str,
    text: &str,
) -> Result<Comment> {
    let found = require_item_contributor(conn, user, item_id, "comment on")?;
    validate_text("comment", text)?;
    let comment = insert_comment(conn, "rbt_comments", "item_id", item_id, user, text)?;

    let preview: String = found.item.text.chars().take(40).collect();
    insert_notification(
        conn,
        user,
        &found.item.owner_name,
        NotificationKind::CommentAdded,
        Some(&found.retro_id),
        &format!("{user} commented on your {}: \"{preview}\"", found.category),
    )?;
    touch(conn, &found.retro_id)?;
    info!(item = %item_id, user, "commented on item");
    Ok(comment)
}

fn insert_comment(
    conn: &Connection,
    table: &'static str,
    parent_column: &'static str,
    parent_id: &str,
    author: &str,
    text: &str,
) -> Result<Comment> {
    let comment_id = new_id();
    let now = now_us();
    let sql = format!(
        "INSERT INTO {table} (comment_id, {parent_column}, author, body, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5)"
    );
    conn.execute(&sql, params![comment_id, parent_id, author, text.trim(), now])
        .with_context(|| format!("insert comment into {table}"))?;
    Ok(Comment {
        id: comment_id,
        text: text.trim().to_string(),
        author_name: author.to_string(),
        created_at: super::from_us(now),
    })
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

/// Attach a photo URL to a retrospective, or to one of its items.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] for non-contributors,
/// [`RetroError::NotFound`] if `item_id` is not an item of `retro_id`,
/// [`RetroError::Validation`] for a blank URL.
pub fn add_photo(
    conn: &Connection,
    user: &str,
    retro_id: &str,
    url: &str,
    caption: Option<&str>,
    item_id: Option<&str>,
) -> Result<Photo> {
    require_contributor(conn, retro_id, user, "add photos to")?;
    let url = url.trim();
    if url.is_empty() {
        return Err(RetroError::validation("url", "must not be empty"));
    }
    if let Some(item_id) = item_id {
        let owner_retro: Option<String> = conn
            .query_row(
                "SELECT retro_id FROM rbt_items WHERE item_id = ?1",
                params![item_id],
                |row| row.get(0),
            )
            .optional()
            .context("check photo item")?;
        if owner_retro.as_deref() != Some(retro_id) {
            return Err(RetroError::not_found("item", item_id));
        }
    }

    let caption = caption.map(str::trim).filter(|c| !c.is_empty());
    let photo_id = new_id();
    conn.execute(
        "INSERT INTO photos (photo_id, retro_id, item_id, url, caption, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![photo_id, retro_id, item_id, url, caption, now_us()],
    )
    .with_context(|| format!("insert photo into '{retro_id}'"))?;
    touch(conn, retro_id)?;
    info!(retro = %retro_id, photo = %photo_id, "added photo");

    Ok(Photo {
        id: photo_id,
        url: url.to_string(),
        caption: caption.map(str::to_string),
        reactions: Vec::new(),
        comments: Vec::new(),
    })
}

fn photo_retro(conn: &Connection, photo_id: &str) -> Result<String> {
    query::photo_retro_id(conn, photo_id)?.ok_or_else(|| RetroError::not_found("photo", photo_id))
}

/// Set `user`'s reaction on a photo, replacing any earlier one.
///
/// Anyone who can see the retrospective may react.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for unknown or hidden photos,
/// [`RetroError::Validation`] for a blank emoji.
pub fn react_to_photo(conn: &Connection, user: &str, photo_id: &str, emoji: &str) -> Result<()> {
    let retro_id = photo_retro(conn, photo_id)?;
    require_visible(conn, &retro_id, Some(user))?;
    let emoji = emoji.trim();
    if emoji.is_empty() {
        return Err(RetroError::validation("emoji", "must not be empty"));
    }
    conn.execute(
        "INSERT INTO photo_reactions (photo_id, user_name, emoji, created_at_us) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (photo_id, user_name) DO UPDATE SET \
            emoji = excluded.emoji, created_at_us = excluded.created_at_us",
        params![photo_id, user, emoji, now_us()],
    )
    .with_context(|| format!("react to photo '{photo_id}'"))?;
    tracing::debug!(photo = %photo_id, user, emoji, "reacted to photo");
    Ok(())
}

/// Append a comment to a photo.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for unknown photos,
/// [`RetroError::Forbidden`] for non-contributors.
pub fn comment_on_photo(
    conn: &Connection,
    user: &str,
    photo_id: &str,
    text: &str,
) -> Result<Comment> {
    let retro_id = photo_retro(conn, photo_id)?;
    require_contributor(conn, &retro_id, user, "comment on")?;
    validate_text("comment", text)?;
    let comment = insert_comment(conn, "photo_comments", "photo_id", photo_id, user, text)?;
    touch(conn, &retro_id)?;
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::notification::list_notifications;
    use crate::db::open_in_memory;
    use crate::model::Location;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 20).expect("valid date")
    }

    fn draft(title: &str) -> RetroDraft {
        RetroDraft::new(title, day())
    }

    #[test]
    fn create_retro_persists_attendees_and_notifies() {
        let mut conn = open_in_memory().expect("db");
        let mut d = draft("Lisbon");
        d.attendees = vec!["ben".into(), "BEN".into(), "ana".into()];
        d.metadata.location = Some(Location {
            city: Some("Lisbon".into()),
            ..Location::default()
        });

        let retro = create_retro(&mut conn, "ana", &d).expect("create");
        assert_eq!(retro.owner, "ana");
        assert_eq!(retro.attendees.len(), 2, "case-insensitive duplicate dropped");
        assert_eq!(
            retro.location.and_then(|l| l.city).as_deref(),
            Some("Lisbon")
        );

        assert_eq!(list_notifications(&conn, "ben", false).expect("list").len(), 1);
        assert!(list_notifications(&conn, "ana", false).expect("list").is_empty());
    }

    #[test]
    fn create_retro_rejects_unknown_parent_and_blank_title() {
        let mut conn = open_in_memory().expect("db");
        let mut d = draft("Day 1");
        d.parent_id = Some("ghost".into());
        assert!(matches!(
            create_retro(&mut conn, "ana", &d),
            Err(RetroError::NotFound { .. })
        ));
        assert!(matches!(
            create_retro(&mut conn, "ana", &draft("  ")),
            Err(RetroError::Validation { .. })
        ));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM retrospectives", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn only_owner_edits_and_deletes() {
        let mut conn = open_in_memory().expect("db");
        let retro = create_retro(&mut conn, "ana", &draft("Hike")).expect("create");

        let mut meta = RetroMetadata::new("Hike 2", day());
        meta.is_private = true;
        assert!(matches!(
            update_retro_metadata(&conn, "eve", &retro.id, &meta),
            Err(RetroError::Forbidden { .. })
        ));
        update_retro_metadata(&conn, "ana", &retro.id, &meta).expect("owner edit");
        let loaded = query::get_retro(&conn, &retro.id).expect("get").expect("found");
        assert_eq!(loaded.title, "Hike 2");
        assert!(loaded.is_private);

        assert!(matches!(
            delete_retro(&conn, "eve", &retro.id),
            Err(RetroError::NotFound { .. })
        ), "private retro is hidden from strangers");
        delete_retro(&conn, "ana", &retro.id).expect("delete");
        assert!(query::get_retro(&conn, &retro.id).expect("get").is_none());
    }

    #[test]
    fn deleting_parent_detaches_children() {
        let mut conn = open_in_memory().expect("db");
        let parent = create_retro(&mut conn, "ana", &draft("Trip")).expect("parent");
        let mut d = draft("Day 1");
        d.parent_id = Some(parent.id.clone());
        let child = create_retro(&mut conn, "ana", &d).expect("child");

        delete_retro(&conn, "ana", &parent.id).expect("delete");
        let child = query::get_retro(&conn, &child.id).expect("get").expect("found");
        assert!(child.is_root());
    }

    #[test]
    fn set_parent_validates_cycles() {
        let mut conn = open_in_memory().expect("db");
        let a = create_retro(&mut conn, "ana", &draft("A")).expect("a");
        let mut d = draft("B");
        d.parent_id = Some(a.id.clone());
        let b = create_retro(&mut conn, "ana", &d).expect("b");

        assert!(matches!(
            set_parent(&conn, "ana", &a.id, Some(&b.id)),
            Err(RetroError::CycleDetected { .. })
        ));
        set_parent(&conn, "ana", &b.id, None).expect("detach");
        set_parent(&conn, "ana", &a.id, Some(&b.id)).expect("now legal");
        let a = query::get_retro(&conn, &a.id).expect("get").expect("found");
        assert_eq!(a.parent_id.as_deref(), Some(b.id.as_str()));
    }

    #[test]
    fn attendees_contribute_strangers_do_not() {
        let mut conn = open_in_memory().expect("db");
        let retro = create_retro(&mut conn, "ana", &draft("Beach")).expect("create");
        assert!(add_attendee(&conn, "ana", &retro.id, "Ben", Some("ben")).expect("add"));
        assert!(!add_attendee(&conn, "ana", &retro.id, "ben", None).expect("dup"));

        let item = add_rbt_item(&mut conn, "ben", &retro.id, Category::Rose, "Sunset", &[])
            .expect("attendee adds");
        assert_eq!(item.owner_name, "ben");
        assert!(matches!(
            add_rbt_item(&mut conn, "eve", &retro.id, Category::Thorn, "Sand", &[]),
            Err(RetroError::Forbidden { .. })
        ));
        assert!(matches!(
            add_attendee(&conn, "ben", &retro.id, "Cy", None),
            Err(RetroError::Forbidden { .. })
        ));
    }

    #[test]
    fn attendee_may_remove_only_themself() {
        let mut conn = open_in_memory().expect("db");
        let mut d = draft("Party");
        d.attendees = vec!["ben".into(), "cy".into()];
        let retro = create_retro(&mut conn, "ana", &d).expect("create");

        assert!(matches!(
            remove_attendee(&conn, "ben", &retro.id, "cy"),
            Err(RetroError::Forbidden { .. })
        ));
        assert!(remove_attendee(&conn, "ben", &retro.id, "BEN").expect("self"));
        assert!(remove_attendee(&conn, "ana", &retro.id, "cy").expect("owner"));
        assert!(!remove_attendee(&conn, "ana", &retro.id, "nobody").expect("absent"));
    }

    #[test]
    fn items_append_in_position_order() {
        let mut conn = open_in_memory().expect("db");
        let retro = create_retro(&mut conn, "ana", &draft("Camp")).expect("create");
        for text in ["one", "two", "three"] {
            add_rbt_item(&mut conn, "ana", &retro.id, Category::Bud, text, &[]).expect("add");
        }
        let tags = vec!["food".to_string(), " food ".to_string()];
        let item = add_rbt_item(&mut conn, "ana", &retro.id, Category::Rose, "s'mores", &tags)
            .expect("add");
        assert_eq!(item.tags, vec!["food"]);

        let loaded = query::get_retro(&conn, &retro.id).expect("get").expect("found");
        let buds: Vec<&str> = loaded.buds.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(buds, vec!["one", "two", "three"]);
        assert_eq!(loaded.roses[0].tags, vec!["food"]);
    }

    #[test]
    fn comments_notify_item_author() {
        let mut conn = open_in_memory().expect("db");
        let mut d = draft("Ski");
        d.attendees = vec!["ben".into()];
        let retro = create_retro(&mut conn, "ana", &d).expect("create");
        let item = add_rbt_item(&mut conn, "ana", &retro.id, Category::Thorn, "Cold", &[])
            .expect("item");

        add_item_comment(&conn, "ben", &item.id, "so cold").expect("comment");
        add_item_comment(&conn, "ana", &item.id, "agreed").expect("own comment");
        assert!(add_item_tag(&conn, "ben", &item.id, "weather").expect("tag"));
        assert!(!add_item_tag(&conn, "ben", &item.id, "weather").expect("dup tag"));

        let notes = list_notifications(&conn, "ana", false).expect("list");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::CommentAdded);

        let found = query::find_item(&conn, &item.id).expect("find").expect("found");
        assert_eq!(found.item.comments.len(), 2);
        assert_eq!(found.item.tags, vec!["weather"]);
    }

    #[test]
    fn photo_reactions_replace_per_user() {
        let mut conn = open_in_memory().expect("db");
        let retro = create_retro(&mut conn, "ana", &draft("Zoo")).expect("create");
        let photo = add_photo(&conn, "ana", &retro.id, "https://img/1.jpg", Some("lion"), None)
            .expect("photo");

        react_to_photo(&conn, "ben", &photo.id, "👍").expect("react");
        react_to_photo(&conn, "ben", &photo.id, "❤️").expect("re-react");
        react_to_photo(&conn, "ana", &photo.id, "😂").expect("react");
        comment_on_photo(&conn, "ana", &photo.id, "roar").expect("comment");

        let loaded = query::get_photo(&conn, &photo.id).expect("get").expect("found");
        assert_eq!(loaded.reactions.len(), 2);
        assert!(loaded.reactions.iter().any(|r| r.user == "ben" && r.emoji == "❤️"));
        assert_eq!(loaded.comments.len(), 1);
    }

    #[test]
    fn item_photos_must_belong_to_retro() {
        let mut conn = open_in_memory().expect("db");
        let a = create_retro(&mut conn, "ana", &draft("A")).expect("a");
        let b = create_retro(&mut conn, "ana", &draft("B")).expect("b");
        let item = add_rbt_item(&mut conn, "ana", &a.id, Category::Rose, "x", &[]).expect("item");

        assert!(matches!(
            add_photo(&conn, "ana", &b.id, "u", None, Some(&item.id)),
            Err(RetroError::NotFound { .. })
        ));
        add_photo(&conn, "ana", &a.id, "u", None, Some(&item.id)).expect("ok");
        let loaded = query::get_retro(&conn, &a.id).expect("get").expect("found");
        assert_eq!(loaded.roses[0].photos.len(), 1);
        assert!(loaded.photos.is_empty(), "item photos are not retro-level photos");
    }
}
