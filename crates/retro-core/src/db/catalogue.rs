//! Catalogues: shared, named collections of saved RBT items.
//!
//! Saving copies the item's text, tags, category and place name into a
//! snapshot row. The snapshot keeps a reference to its source but is never
//! refreshed from it.

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::access::require_visible;
use super::{from_us, new_id, now_us, query};
use crate::error::{Result, RetroError};
use crate::model::catalogue::{Catalogue, CatalogueItem, CatalogueMember, MemberRole};

const ITEM_COLUMNS: &str = "entry_id, catalogue_id, source_retro_id, source_item_id, category, \
     body, tags_json, place_name, saved_by, created_at_us";

/// Create a catalogue; `owner` becomes its first member.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] for a blank name.
pub fn create_catalogue(
    conn: &mut Connection,
    owner: &str,
    name: &str,
    description: Option<&str>,
) -> Result<Catalogue> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RetroError::validation("name", "must not be empty"));
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    let catalogue_id = new_id();
    let now = now_us();

    let tx = conn.transaction().context("begin create_catalogue")?;
    tx.execute(
        "INSERT INTO catalogues (catalogue_id, owner, name, description, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![catalogue_id, owner, name, description, now],
    )
    .context("insert catalogue")?;
    tx.execute(
        "INSERT INTO catalogue_members (catalogue_id, user_name, role, created_at_us) \
         VALUES (?1, ?2, 'owner', ?3)",
        params![catalogue_id, owner, now],
    )
    .context("insert catalogue owner")?;
    tx.commit().context("commit create_catalogue")?;

    info!(catalogue = %catalogue_id, owner, "created catalogue");
    Ok(Catalogue {
        id: catalogue_id,
        owner: owner.to_string(),
        name: name.to_string(),
        description: description.map(str::to_string),
        created_at: from_us(now),
    })
}

/// Fetch a catalogue by exact id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_catalogue(conn: &Connection, catalogue_id: &str) -> Result<Option<Catalogue>> {
    let found = conn
        .query_row(
            "SELECT catalogue_id, owner, name, description, created_at_us \
             FROM catalogues WHERE catalogue_id = ?1",
            params![catalogue_id],
            row_to_catalogue,
        )
        .optional()
        .with_context(|| format!("get_catalogue '{catalogue_id}'"))?;
    Ok(found)
}

/// Catalogues `user` is a member of, by name.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_catalogues(conn: &Connection, user: &str) -> Result<Vec<Catalogue>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.catalogue_id, c.owner, c.name, c.description, c.created_at_us \
             FROM catalogues c JOIN catalogue_members m ON m.catalogue_id = c.catalogue_id \
             WHERE m.user_name = ?1 ORDER BY c.name COLLATE NOCASE ASC, c.created_at_us ASC",
        )
        .context("prepare list_catalogues")?;
    let rows = stmt
        .query_map(params![user], row_to_catalogue)
        .context("execute list_catalogues")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read catalogue row")?);
    }
    Ok(out)
}

/// `user`'s role in the catalogue, if any.
///
/// # Errors
///
/// Returns an error if the query fails or the stored role is unknown.
pub fn member_role(
    conn: &Connection,
    catalogue_id: &str,
    user: &str,
) -> Result<Option<MemberRole>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT role FROM catalogue_members WHERE catalogue_id = ?1 AND user_name = ?2",
            params![catalogue_id, user],
            |row| row.get(0),
        )
        .optional()
        .context("load member role")?;
    raw.map(|role| role.parse::<MemberRole>()).transpose()
}

/// Whether `user` belongs to the catalogue in any role.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn is_catalogue_member(conn: &Connection, catalogue_id: &str, user: &str) -> Result<bool> {
    Ok(member_role(conn, catalogue_id, user)?.is_some())
}

fn require_role(
    conn: &Connection,
    catalogue_id: &str,
    user: &str,
    action: &'static str,
    allowed: fn(MemberRole) -> bool,
) -> Result<MemberRole> {
    if get_catalogue(conn, catalogue_id)?.is_none() {
        return Err(RetroError::not_found("catalogue", catalogue_id));
    }
    match member_role(conn, catalogue_id, user)? {
        None => Err(RetroError::not_found("catalogue", catalogue_id)),
        Some(role) if allowed(role) => Ok(role),
        Some(_) => Err(RetroError::forbidden(user, action, catalogue_id)),
    }
}

/// Share a catalogue with `member` as editor or viewer. Re-sharing changes
/// the role. Only the owner may share.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] for non-owners or when trying to grant
/// a second owner.
pub fn add_catalogue_member(
    conn: &Connection,
    actor: &str,
    catalogue_id: &str,
    member: &str,
    role: MemberRole,
) -> Result<()> {
    require_role(conn, catalogue_id, actor, "share", |role| role == MemberRole::Owner)?;
    let member = member.trim();
    if member.is_empty() {
        return Err(RetroError::validation("member", "must not be empty"));
    }
    if role == MemberRole::Owner || member == actor {
        return Err(RetroError::validation("role", "a catalogue has exactly one owner"));
    }
    conn.execute(
        "INSERT INTO catalogue_members (catalogue_id, user_name, role, created_at_us) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (catalogue_id, user_name) DO UPDATE SET role = excluded.role",
        params![catalogue_id, member, role.as_str(), now_us()],
    )
    .context("upsert catalogue member")?;
    info!(catalogue = %catalogue_id, member, %role, "shared catalogue");
    Ok(())
}

/// Members of a catalogue, owner first.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `viewer` is a member.
pub fn list_catalogue_members(
    conn: &Connection,
    viewer: &str,
    catalogue_id: &str,
) -> Result<Vec<CatalogueMember>> {
    require_role(conn, catalogue_id, viewer, "view", |_| true)?;
    let mut stmt = conn
        .prepare(
            "SELECT user_name, role FROM catalogue_members WHERE catalogue_id = ?1 \
             ORDER BY CASE role WHEN 'owner' THEN 0 WHEN 'editor' THEN 1 ELSE 2 END, user_name",
        )
        .context("prepare list_catalogue_members")?;
    let rows = stmt
        .query_map(params![catalogue_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })
        .context("execute list_catalogue_members")?;
    let mut out = Vec::new();
    for row in rows {
        let (user, role) = row.context("read member row")?;
        out.push(CatalogueMember {
            catalogue_id: catalogue_id.to_string(),
            user,
            role: role.parse()?,
        });
    }
    Ok(out)
}

/// Snapshot an RBT item into a catalogue.
///
/// The saver must be an owner or editor of the catalogue and able to see
/// the source retrospective. Saving the same item twice is rejected.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for unknown items or catalogues,
/// [`RetroError::Forbidden`] for viewers, [`RetroError::Validation`] for a
/// repeated save.
pub fn save_to_catalogue(
    conn: &Connection,
    user: &str,
    catalogue_id: &str,
    item_id: &str,
) -> Result<CatalogueItem> {
    require_role(conn, catalogue_id, user, "add items to", MemberRole::can_edit)?;
    let found =
        query::find_item(conn, item_id)?.ok_or_else(|| RetroError::not_found("item", item_id))?;
    require_visible(conn, &found.retro_id, Some(user))?;

    let place_name: Option<String> = conn
        .query_row(
            "SELECT COALESCE(NULLIF(trim(location_name), ''), NULLIF(trim(city), '')) \
             FROM retrospectives WHERE retro_id = ?1",
            params![found.retro_id],
            |row| row.get(0),
        )
        .context("load place name")?;

    let tags_json = serde_json::to_string(&found.item.tags).context("encode tags")?;
    let entry_id = new_id();
    let now = now_us();
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO catalogue_items \
             (entry_id, catalogue_id, source_retro_id, source_item_id, category, body, \
              tags_json, place_name, saved_by, created_at_us) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entry_id,
                catalogue_id,
                found.retro_id,
                item_id,
                found.category.as_str(),
                found.item.text,
                tags_json,
                place_name,
                user,
                now,
            ],
        )
        .context("insert catalogue item")?;
    if inserted == 0 {
        return Err(RetroError::validation("item", "already saved to this catalogue"));
    }

    info!(catalogue = %catalogue_id, item = %item_id, "saved item to catalogue");
    Ok(CatalogueItem {
        id: entry_id,
        catalogue_id: catalogue_id.to_string(),
        source_retro_id: found.retro_id,
        source_item_id: item_id.to_string(),
        category: found.category,
        text: found.item.text,
        tags: found.item.tags,
        place_name,
        saved_by: user.to_string(),
        created_at: from_us(now),
    })
}

/// Saved entries of a catalogue, oldest first.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `viewer` is a member.
pub fn list_catalogue_items(
    conn: &Connection,
    viewer: &str,
    catalogue_id: &str,
) -> Result<Vec<CatalogueItem>> {
    require_role(conn, catalogue_id, viewer, "view", |_| true)?;
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM catalogue_items WHERE catalogue_id = ?1 \
         ORDER BY created_at_us ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare list_catalogue_items")?;
    let rows = stmt
        .query_map(params![catalogue_id], raw_item)
        .context("execute list_catalogue_items")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(decode_item(row.context("read catalogue item row")?)?);
    }
    Ok(out)
}

/// Fetch one saved entry by exact id, without permission checks.
///
/// # Errors
///
/// Returns an error if the query fails or the row cannot be decoded.
pub fn get_catalogue_item(conn: &Connection, entry_id: &str) -> Result<Option<CatalogueItem>> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM catalogue_items WHERE entry_id = ?1");
    let raw = conn
        .query_row(&sql, params![entry_id], raw_item)
        .optional()
        .with_context(|| format!("get_catalogue_item '{entry_id}'"))?;
    raw.map(decode_item).transpose()
}

/// Remove a saved entry. Owners and editors only.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for unknown entries,
/// [`RetroError::Forbidden`] for viewers.
pub fn remove_catalogue_item(conn: &Connection, user: &str, entry_id: &str) -> Result<()> {
    let entry = get_catalogue_item(conn, entry_id)?
        .ok_or_else(|| RetroError::not_found("catalogue entry", entry_id))?;
    require_role(conn, &entry.catalogue_id, user, "remove items from", MemberRole::can_edit)?;
    conn.execute(
        "DELETE FROM catalogue_items WHERE entry_id = ?1",
        params![entry_id],
    )
    .context("delete catalogue item")?;
    info!(catalogue = %entry.catalogue_id, entry = %entry_id, "removed catalogue entry");
    Ok(())
}

/// Delete a catalogue with its members and entries. Owner only.
///
/// # Errors
///
/// Returns [`RetroError::Forbidden`] for non-owners.
pub fn delete_catalogue(conn: &Connection, user: &str, catalogue_id: &str) -> Result<()> {
    require_role(conn, catalogue_id, user, "delete", |role| role == MemberRole::Owner)?;
    conn.execute(
        "DELETE FROM catalogues WHERE catalogue_id = ?1",
        params![catalogue_id],
    )
    .context("delete catalogue")?;
    info!(catalogue = %catalogue_id, "deleted catalogue");
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_catalogue(row: &Row<'_>) -> rusqlite::Result<Catalogue> {
    Ok(Catalogue {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: from_us(row.get(4)?),
    })
}

struct RawItem {
    id: String,
    catalogue_id: String,
    source_retro_id: String,
    source_item_id: String,
    category: String,
    text: String,
    tags_json: String,
    place_name: Option<String>,
    saved_by: String,
    created_at_us: i64,
}

fn raw_item(row: &Row<'_>) -> rusqlite::Result<RawItem> {
    Ok(RawItem {
        id: row.get(0)?,
        catalogue_id: row.get(1)?,
        source_retro_id: row.get(2)?,
        source_item_id: row.get(3)?,
        category: row.get(4)?,
        text: row.get(5)?,
        tags_json: row.get(6)?,
        place_name: row.get(7)?,
        saved_by: row.get(8)?,
        created_at_us: row.get(9)?,
    })
}

fn decode_item(raw: RawItem) -> Result<CatalogueItem> {
    let tags: Vec<String> = serde_json::from_str(&raw.tags_json)
        .with_context(|| format!("decode tags of catalogue entry '{}'", raw.id))?;
    Ok(CatalogueItem {
        category: raw.category.parse()?,
        id: raw.id,
        catalogue_id: raw.catalogue_id,
        source_retro_id: raw.source_retro_id,
        source_item_id: raw.source_item_id,
        text: raw.text,
        tags,
        place_name: raw.place_name,
        saved_by: raw.saved_by,
        created_at: from_us(raw.created_at_us),
    })
}
