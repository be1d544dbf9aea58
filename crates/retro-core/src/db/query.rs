//! `SQLite` read helpers for the journal store.
//!
//! Retrospectives come back fully hydrated: attendees, RBT items with their
//! tags, comments and photos, and retro-level photos with reactions and
//! comments. All functions take a shared `&Connection` and return
//! `anyhow::Result<T>` with typed structs (never raw rows), except
//! [`resolve_id`] which reports domain errors.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter, types::Type};
use serde::Serialize;

use super::{from_us, like_escape};
use crate::error::RetroError;
use crate::filter::LocationQuery;
use crate::model::{
    Attendee, Category, Comment, Location, Photo, RbtItem, Reaction, Retrospective,
};

const RETRO_COLUMNS: &str = "r.retro_id, r.owner, r.title, r.event_type, r.event_date, \
     r.primary_photo_url, r.location_name, r.city, r.state, r.country, r.lat, r.lng, \
     r.parent_id, r.feedback_space_id, r.is_private, r.created_at_us, r.updated_at_us";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Just enough of a retrospective to walk the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetroLink {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
}

/// An RBT item together with where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    pub retro_id: String,
    pub category: Category,
    pub item: RbtItem,
}

/// Global tag inventory row with usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Store-side criteria for retrospective listings. Fields combine with AND.
#[derive(Debug, Clone, Default)]
pub struct RetroQuery {
    /// Identity used for privacy checks; `None` sees public rows only.
    pub viewer: Option<String>,
    /// Skip the privacy check (feedback space owners reviewing submissions).
    pub ignore_visibility: bool,
    /// City/state substring match, ASCII case-insensitive.
    pub location: Option<LocationQuery>,
    /// Only direct children of this retrospective.
    pub parent_id: Option<String>,
    /// Only retrospectives without a parent.
    pub roots_only: bool,
    /// Only retrospectives owned by this user.
    pub owner: Option<String>,
    /// Only retrospectives submitted through this feedback space.
    pub feedback_space_id: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
}

/// Record families addressable by ID or unique ID prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Retro,
    Item,
    Photo,
    Catalogue,
    CatalogueEntry,
    Trip,
    TripItem,
    Space,
    Notification,
}

impl IdKind {
    const fn table_and_column(self) -> (&'static str, &'static str) {
        match self {
            Self::Retro => ("retrospectives", "retro_id"),
            Self::Item => ("rbt_items", "item_id"),
            Self::Photo => ("photos", "photo_id"),
            Self::Catalogue => ("catalogues", "catalogue_id"),
            Self::CatalogueEntry => ("catalogue_items", "entry_id"),
            Self::Trip => ("trip_planners", "trip_id"),
            Self::TripItem => ("trip_items", "trip_item_id"),
            Self::Space => ("feedback_spaces", "space_id"),
            Self::Notification => ("notifications", "notification_id"),
        }
    }

    /// Human label used in error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Retro => "retrospective",
            Self::Item => "item",
            Self::Photo => "photo",
            Self::Catalogue => "catalogue",
            Self::CatalogueEntry => "catalogue entry",
            Self::Trip => "trip",
            Self::TripItem => "trip item",
            Self::Space => "feedback space",
            Self::Notification => "notification",
        }
    }
}

/// SQL predicate: retrospective `alias` is visible to the identity bound at
/// parameter `?{n}`. Mirrors `Retrospective::is_visible_to`.
pub(crate) fn visible_to_sql(alias: &str, n: usize) -> String {
    format!(
        "({alias}.is_private = 0 OR {alias}.owner = ?{n} OR EXISTS (\
         SELECT 1 FROM retro_attendees a WHERE a.retro_id = {alias}.retro_id \
         AND (a.user_ref = ?{n} OR a.name = ?{n})))"
    )
}

// ---------------------------------------------------------------------------
// Core query functions
// ---------------------------------------------------------------------------

/// Resolve a full ID or a unique prefix of one.
///
/// Prefix matches on retrospectives only consider those `viewer` can see,
/// so an ambiguity error never lists hidden IDs. An exact ID is returned
/// as-is; callers check visibility on the record itself.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] when nothing matches,
/// [`RetroError::AmbiguousId`] when several IDs share the prefix, or
/// [`RetroError::Db`] if the query fails.
pub fn resolve_id(
    conn: &Connection,
    kind: IdKind,
    input: &str,
    viewer: Option<&str>,
) -> Result<String, RetroError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(RetroError::not_found(kind.label(), input));
    }
    let (table, column) = kind.table_and_column();

    let exact_sql = format!("SELECT {column} FROM {table} WHERE {column} = ?1");
    let exact: Option<String> = conn
        .query_row(&exact_sql, params![input], |row| row.get(0))
        .optional()
        .with_context(|| format!("exact {} lookup for '{input}'", kind.label()))?;
    if let Some(id) = exact {
        return Ok(id);
    }

    let visibility = match (kind, viewer) {
        (IdKind::Retro, Some(_)) => format!(" AND {}", visible_to_sql("r", 2)),
        (IdKind::Retro, None) => " AND r.is_private = 0".to_string(),
        _ => String::new(),
    };
    let prefix_sql = format!(
        "SELECT r.{column} FROM {table} r WHERE r.{column} LIKE ?1 ESCAPE '\\'{visibility} \
         ORDER BY r.{column} LIMIT 6"
    );
    let pattern = format!("{}%", like_escape(input));
    let mut stmt = conn
        .prepare(&prefix_sql)
        .with_context(|| format!("prepare {} prefix lookup", kind.label()))?;
    let read_id = |row: &Row<'_>| row.get::<_, String>(0);
    let rows = match (kind, viewer) {
        (IdKind::Retro, Some(viewer)) => stmt.query_map(params![pattern, viewer], read_id),
        _ => stmt.query_map(params![pattern], read_id),
    }
    .with_context(|| format!("execute {} prefix lookup", kind.label()))?;
    let mut matches = Vec::new();
    for row in rows {
        matches.push(row.context("read prefix match")?);
    }

    match matches.len() {
        0 => Err(RetroError::not_found(kind.label(), input)),
        1 => Ok(matches.remove(0)),
        _ => Err(RetroError::AmbiguousId {
            kind: kind.label(),
            prefix: input.to_string(),
            candidates: matches,
        }),
    }
}

/// Fetch a single hydrated retrospective by exact ID.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn get_retro(conn: &Connection, retro_id: &str) -> Result<Option<Retrospective>> {
    let sql = format!("SELECT {RETRO_COLUMNS} FROM retrospectives r WHERE r.retro_id = ?1");
    let mut stmt = conn.prepare(&sql).context("prepare get_retro query")?;

    let found = stmt
        .query_row(params![retro_id], row_to_retro)
        .optional()
        .with_context(|| format!("get_retro for '{retro_id}'"))?;

    match found {
        Some(mut retro) => {
            hydrate(conn, &mut retro)?;
            Ok(Some(retro))
        }
        None => Ok(None),
    }
}

/// Whether a retrospective with this exact ID exists.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn retro_exists(conn: &Connection, retro_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM retrospectives WHERE retro_id = ?1)",
        params![retro_id],
        |row| row.get(0),
    )
    .context("check retro_exists")
}

/// Fetch the id/title/parent triple used for hierarchy walks.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_retro_link(conn: &Connection, retro_id: &str) -> Result<Option<RetroLink>> {
    conn.query_row(
        "SELECT retro_id, title, parent_id FROM retrospectives WHERE retro_id = ?1",
        params![retro_id],
        |row| {
            Ok(RetroLink {
                id: row.get(0)?,
                title: row.get(1)?,
                parent_id: row.get(2)?,
            })
        },
    )
    .optional()
    .with_context(|| format!("get_retro_link for '{retro_id}'"))
}

/// IDs of the direct children of `parent_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_child_ids(conn: &Connection, parent_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT retro_id FROM retrospectives WHERE parent_id = ?1 \
             ORDER BY created_at_us ASC, retro_id ASC",
        )
        .context("prepare get_child_ids")?;
    let rows = stmt
        .query_map(params![parent_id], |row| row.get::<_, String>(0))
        .context("execute get_child_ids")?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row.context("read child id")?);
    }
    Ok(ids)
}

/// Hydrated direct children of `parent_id`, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_children(conn: &Connection, parent_id: &str) -> Result<Vec<Retrospective>> {
    let sql = format!(
        "SELECT {RETRO_COLUMNS} FROM retrospectives r WHERE r.parent_id = ?1 \
         ORDER BY r.created_at_us ASC, r.retro_id ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare get_children")?;
    let rows = stmt
        .query_map(params![parent_id], row_to_retro)
        .context("execute get_children")?;

    let mut children = Vec::new();
    for row in rows {
        children.push(row.context("read child row")?);
    }
    for child in &mut children {
        hydrate(conn, child)?;
    }
    Ok(children)
}

/// List hydrated retrospectives matching `query`, newest event first.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn list_retros(conn: &Connection, query: &RetroQuery) -> Result<Vec<Retrospective>> {
    let mut conditions: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if !query.ignore_visibility {
        match &query.viewer {
            Some(viewer) => {
                param_values.push(Box::new(viewer.clone()));
                conditions.push(visible_to_sql("r", param_values.len()));
            }
            None => conditions.push("r.is_private = 0".to_string()),
        }
    }

    if let Some(location) = &query.location {
        if let Some(city) = &location.city {
            param_values.push(Box::new(format!("%{}%", like_escape(city))));
            conditions.push(format!("r.city LIKE ?{} ESCAPE '\\'", param_values.len()));
        }
        if let Some(state) = &location.state {
            param_values.push(Box::new(format!("%{}%", like_escape(state))));
            conditions.push(format!("r.state LIKE ?{} ESCAPE '\\'", param_values.len()));
        }
    }

    if let Some(parent_id) = &query.parent_id {
        param_values.push(Box::new(parent_id.clone()));
        conditions.push(format!("r.parent_id = ?{}", param_values.len()));
    }

    if query.roots_only {
        conditions.push("r.parent_id IS NULL".to_string());
    }

    if let Some(owner) = &query.owner {
        param_values.push(Box::new(owner.clone()));
        conditions.push(format!("r.owner = ?{}", param_values.len()));
    }

    if let Some(space_id) = &query.feedback_space_id {
        param_values.push(Box::new(space_id.clone()));
        conditions.push(format!("r.feedback_space_id = ?{}", param_values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let limit_clause = query
        .limit
        .map(|limit| format!(" LIMIT {limit}"))
        .unwrap_or_default();

    let sql = format!(
        "SELECT {RETRO_COLUMNS} FROM retrospectives r{where_clause} \
         ORDER BY r.event_date DESC, r.created_at_us DESC, r.retro_id ASC{limit_clause}"
    );

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("prepare list_retros query: {sql}"))?;

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(AsRef::as_ref).collect();

    let rows = stmt
        .query_map(params_from_iter(params_ref), row_to_retro)
        .context("execute list_retros query")?;

    let mut retros = Vec::new();
    for row in rows {
        retros.push(row.context("read list_retros row")?);
    }
    for retro in &mut retros {
        hydrate(conn, retro)?;
    }
    tracing::debug!(count = retros.len(), "listed retrospectives");
    Ok(retros)
}

/// Find an RBT item anywhere in the store.
///
/// # Errors
///
/// Returns an error if the query fails or the stored category is invalid.
pub fn find_item(conn: &Connection, item_id: &str) -> Result<Option<ItemRef>> {
    let found = conn
        .query_row(
            "SELECT retro_id, category, item_id, body, owner_name \
             FROM rbt_items WHERE item_id = ?1",
            params![item_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    RbtItem::new(
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ),
                ))
            },
        )
        .optional()
        .with_context(|| format!("find_item '{item_id}'"))?;

    let Some((retro_id, category, mut item)) = found else {
        return Ok(None);
    };
    let category = parse_category(&category)?;
    hydrate_item(conn, &mut item)?;
    Ok(Some(ItemRef {
        retro_id,
        category,
        item,
    }))
}

/// The retrospective a photo belongs to.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn photo_retro_id(conn: &Connection, photo_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT retro_id FROM photos WHERE photo_id = ?1",
        params![photo_id],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("photo_retro_id '{photo_id}'"))
}

/// Load a single photo with reactions and comments.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_photo(conn: &Connection, photo_id: &str) -> Result<Option<Photo>> {
    let found = conn
        .query_row(
            "SELECT photo_id, url, caption FROM photos WHERE photo_id = ?1",
            params![photo_id],
            row_to_photo,
        )
        .optional()
        .with_context(|| format!("get_photo '{photo_id}'"))?;
    match found {
        Some(mut photo) => {
            hydrate_photo(conn, &mut photo)?;
            Ok(Some(photo))
        }
        None => Ok(None),
    }
}

/// Tag usage counts across the RBT items of retrospectives `viewer` can
/// see, most used first.
///
/// # Errors
///
/// Returns an error if the aggregate query fails.
pub fn list_tags(
    conn: &Connection,
    viewer: Option<&str>,
    limit: Option<u32>,
) -> Result<Vec<TagCount>> {
    let visibility = if viewer.is_some() {
        visible_to_sql("r", 1)
    } else {
        "r.is_private = 0".to_string()
    };
    let limit_clause = limit.map(|l| format!(" LIMIT {l}")).unwrap_or_default();
    let sql = format!(
        "SELECT t.tag, COUNT(*) AS count FROM rbt_item_tags t \
         JOIN rbt_items i ON i.item_id = t.item_id \
         JOIN retrospectives r ON r.retro_id = i.retro_id \
         WHERE {visibility} \
         GROUP BY t.tag ORDER BY count DESC, t.tag ASC{limit_clause}"
    );
    let mut stmt = conn.prepare(&sql).context("prepare list_tags")?;
    let read_count = |row: &Row<'_>| -> rusqlite::Result<TagCount> {
        let count: i64 = row.get(1)?;
        Ok(TagCount {
            tag: row.get(0)?,
            count: usize::try_from(count).unwrap_or(usize::MAX),
        })
    };
    let rows = match viewer {
        Some(viewer) => stmt.query_map(params![viewer], read_count),
        None => stmt.query_map([], read_count),
    }
    .context("execute list_tags")?;

    let mut tags = Vec::new();
    for row in rows {
        tags.push(row.context("read list_tags row")?);
    }
    Ok(tags)
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

fn hydrate(conn: &Connection, retro: &mut Retrospective) -> Result<()> {
    retro.attendees = load_attendees(conn, &retro.id)?;

    let mut stmt = conn
        .prepare(
            "SELECT item_id, category, body, owner_name FROM rbt_items \
             WHERE retro_id = ?1 ORDER BY position ASC",
        )
        .context("prepare item load")?;
    let rows = stmt
        .query_map(params![retro.id], |row| {
            Ok((
                row.get::<_, String>(1)?,
                RbtItem::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ),
            ))
        })
        .context("execute item load")?;

    let mut loaded = Vec::new();
    for row in rows {
        loaded.push(row.context("read item row")?);
    }
    for (category, mut item) in loaded {
        hydrate_item(conn, &mut item)?;
        retro.items_mut(parse_category(&category)?).push(item);
    }

    retro.photos = load_photos(
        conn,
        "SELECT photo_id, url, caption FROM photos \
         WHERE retro_id = ?1 AND item_id IS NULL ORDER BY created_at_us ASC, rowid ASC",
        &retro.id,
    )?;
    Ok(())
}

fn hydrate_item(conn: &Connection, item: &mut RbtItem) -> Result<()> {
    let mut stmt = conn
        .prepare(
            "SELECT tag FROM rbt_item_tags WHERE item_id = ?1 \
             ORDER BY created_at_us ASC, rowid ASC",
        )
        .context("prepare tag load")?;
    let rows = stmt
        .query_map(params![item.id], |row| row.get::<_, String>(0))
        .context("execute tag load")?;
    for row in rows {
        item.tags.push(row.context("read tag row")?);
    }

    item.comments = load_comments(
        conn,
        "SELECT comment_id, body, author, created_at_us FROM rbt_comments \
         WHERE item_id = ?1 ORDER BY created_at_us ASC, rowid ASC",
        &item.id,
    )?;
    item.photos = load_photos(
        conn,
        "SELECT photo_id, url, caption FROM photos \
         WHERE item_id = ?1 ORDER BY created_at_us ASC, rowid ASC",
        &item.id,
    )?;
    Ok(())
}

fn hydrate_photo(conn: &Connection, photo: &mut Photo) -> Result<()> {
    let mut stmt = conn
        .prepare(
            "SELECT user_name, emoji FROM photo_reactions WHERE photo_id = ?1 \
             ORDER BY created_at_us ASC, user_name ASC",
        )
        .context("prepare reaction load")?;
    let rows = stmt
        .query_map(params![photo.id], |row| {
            Ok(Reaction {
                user: row.get(0)?,
                emoji: row.get(1)?,
            })
        })
        .context("execute reaction load")?;
    for row in rows {
        photo.reactions.push(row.context("read reaction row")?);
    }

    photo.comments = load_comments(
        conn,
        "SELECT comment_id, body, author, created_at_us FROM photo_comments \
         WHERE photo_id = ?1 ORDER BY created_at_us ASC, rowid ASC",
        &photo.id,
    )?;
    Ok(())
}

fn load_attendees(conn: &Connection, retro_id: &str) -> Result<Vec<Attendee>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, user_ref FROM retro_attendees WHERE retro_id = ?1 \
             ORDER BY attendee_id ASC",
        )
        .context("prepare attendee load")?;
    let rows = stmt
        .query_map(params![retro_id], |row| {
            Ok(Attendee {
                name: row.get(0)?,
                user: row.get(1)?,
            })
        })
        .context("execute attendee load")?;

    let mut attendees = Vec::new();
    for row in rows {
        attendees.push(row.context("read attendee row")?);
    }
    Ok(attendees)
}

fn load_comments(conn: &Connection, sql: &str, owner_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(sql).context("prepare comment load")?;
    let rows = stmt
        .query_map(params![owner_id], |row| {
            Ok(Comment {
                id: row.get(0)?,
                text: row.get(1)?,
                author_name: row.get(2)?,
                created_at: from_us(row.get(3)?),
            })
        })
        .context("execute comment load")?;

    let mut comments = Vec::new();
    for row in rows {
        comments.push(row.context("read comment row")?);
    }
    Ok(comments)
}

fn load_photos(conn: &Connection, sql: &str, owner_id: &str) -> Result<Vec<Photo>> {
    let mut stmt = conn.prepare(sql).context("prepare photo load")?;
    let rows = stmt
        .query_map(params![owner_id], row_to_photo)
        .context("execute photo load")?;

    let mut photos = Vec::new();
    for row in rows {
        photos.push(row.context("read photo row")?);
    }
    for photo in &mut photos {
        hydrate_photo(conn, photo)?;
    }
    Ok(photos)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_retro(row: &Row<'_>) -> rusqlite::Result<Retrospective> {
    let raw_date: String = row.get(4)?;
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    let location = Location {
        name: row.get(6)?,
        city: row.get(7)?,
        state: row.get(8)?,
        country: row.get(9)?,
        lat: row.get(10)?,
        lng: row.get(11)?,
    };

    Ok(Retrospective {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        event_type: row.get(3)?,
        date,
        attendees: Vec::new(),
        roses: Vec::new(),
        buds: Vec::new(),
        thorns: Vec::new(),
        photos: Vec::new(),
        primary_photo_url: row.get(5)?,
        location: (!location.is_empty()).then_some(location),
        parent_id: row.get(12)?,
        feedback_space_id: row.get(13)?,
        is_private: row.get::<_, i64>(14)? != 0,
        created_at: from_us(row.get(15)?),
        updated_at: from_us(row.get(16)?),
    })
}

fn row_to_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        url: row.get(1)?,
        caption: row.get(2)?,
        reactions: Vec::new(),
        comments: Vec::new(),
    })
}

fn parse_category(raw: &str) -> Result<Category> {
    raw.parse::<Category>()
        .with_context(|| format!("stored category '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn insert_retro(conn: &Connection, id: &str, parent: Option<&str>, date: &str, private: bool) {
        conn.execute(
            "INSERT INTO retrospectives \
             (retro_id, owner, title, event_date, parent_id, is_private, city, state, \
              created_at_us, updated_at_us) \
             VALUES (?1, 'ana', ?2, ?3, ?4, ?5, 'Austin', 'TX', 1000, 2000)",
            params![id, format!("Title {id}"), date, parent, i64::from(private)],
        )
        .expect("insert retro");
    }

    fn insert_item(conn: &Connection, retro: &str, id: &str, category: &str, position: i64) {
        conn.execute(
            "INSERT INTO rbt_items \
             (item_id, retro_id, category, position, body, owner_name, created_at_us) \
             VALUES (?1, ?2, ?3, ?4, ?5, 'ana', 1)",
            params![id, retro, category, position, format!("body {id}")],
        )
        .expect("insert item");
    }

    #[test]
    fn get_retro_hydrates_items_by_category_and_position() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "r1", None, "2024-01-02", false);
        insert_item(&conn, "r1", "i2", "rose", 1);
        insert_item(&conn, "r1", "i1", "rose", 0);
        insert_item(&conn, "r1", "i3", "thorn", 0);
        conn.execute(
            "INSERT INTO rbt_item_tags (item_id, tag, created_at_us) VALUES ('i1', 'food', 1)",
            [],
        )
        .expect("tag");

        let retro = get_retro(&conn, "r1").expect("query").expect("found");
        let roses: Vec<&str> = retro.roses.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(roses, vec!["i1", "i2"]);
        assert_eq!(retro.thorns.len(), 1);
        assert_eq!(retro.roses[0].tags, vec!["food"]);
        assert_eq!(
            retro.location.as_ref().and_then(|l| l.city.as_deref()),
            Some("Austin")
        );
    }

    #[test]
    fn get_retro_missing_is_none() {
        let conn = open_in_memory().expect("db");
        assert!(get_retro(&conn, "nope").expect("query").is_none());
    }

    #[test]
    fn list_retros_hides_private_rows_from_strangers() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "pub", None, "2024-01-01", false);
        insert_retro(&conn, "priv", None, "2024-01-02", true);
        conn.execute(
            "INSERT INTO retro_attendees (retro_id, name, created_at_us) VALUES ('priv', 'Ben', 1)",
            [],
        )
        .expect("attendee");

        let anon = list_retros(&conn, &RetroQuery::default()).expect("list");
        assert_eq!(anon.len(), 1);

        let owner = list_retros(
            &conn,
            &RetroQuery {
                viewer: Some("ana".into()),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert_eq!(owner.len(), 2);
        assert_eq!(owner[0].id, "priv", "newest event first");

        let attendee = list_retros(
            &conn,
            &RetroQuery {
                viewer: Some("ben".into()),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert_eq!(attendee.len(), 2, "attendee names match case-insensitively");
    }

    #[test]
    fn list_retros_filters_location_roots_and_parent() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "root", None, "2024-01-01", false);
        insert_retro(&conn, "kid", Some("root"), "2024-01-02", false);

        let by_city = list_retros(
            &conn,
            &RetroQuery {
                location: LocationQuery::parse("aus, tx"),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert_eq!(by_city.len(), 2);

        let wrong_state = list_retros(
            &conn,
            &RetroQuery {
                location: LocationQuery::parse("Austin, CA"),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert!(wrong_state.is_empty());

        let roots = list_retros(
            &conn,
            &RetroQuery {
                roots_only: true,
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, "root");

        let kids = list_retros(
            &conn,
            &RetroQuery {
                parent_id: Some("root".into()),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].id, "kid");
    }

    #[test]
    fn location_wildcards_are_literal() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "r1", None, "2024-01-01", false);
        let hits = list_retros(
            &conn,
            &RetroQuery {
                location: LocationQuery::parse("%"),
                ..RetroQuery::default()
            },
        )
        .expect("list");
        assert!(hits.is_empty());
    }

    #[test]
    fn resolve_id_exact_prefix_and_ambiguous() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "abc-1", None, "2024-01-01", false);
        insert_retro(&conn, "abc-2", None, "2024-01-01", false);
        insert_retro(&conn, "xyz-9", None, "2024-01-01", false);

        assert_eq!(resolve_id(&conn, IdKind::Retro, "abc-1", None).ok().as_deref(), Some("abc-1"));
        assert_eq!(resolve_id(&conn, IdKind::Retro, "xy", None).ok().as_deref(), Some("xyz-9"));
        assert!(matches!(
            resolve_id(&conn, IdKind::Retro, "abc", None),
            Err(RetroError::AmbiguousId { .. })
        ));
        assert!(matches!(
            resolve_id(&conn, IdKind::Retro, "nope", None),
            Err(RetroError::NotFound { .. })
        ));
    }

    #[test]
    fn children_and_links() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "p", None, "2024-01-01", false);
        insert_retro(&conn, "c", Some("p"), "2024-01-01", false);

        assert_eq!(get_child_ids(&conn, "p").expect("ids"), vec!["c"]);
        assert_eq!(get_children(&conn, "p").expect("children").len(), 1);
        let link = get_retro_link(&conn, "c").expect("link").expect("found");
        assert_eq!(link.parent_id.as_deref(), Some("p"));
        assert!(retro_exists(&conn, "p").expect("exists"));
        assert!(!retro_exists(&conn, "q").expect("exists"));
    }

    #[test]
    fn find_item_reports_retro_and_category() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "r1", None, "2024-01-01", false);
        insert_item(&conn, "r1", "i1", "bud", 0);

        let found = find_item(&conn, "i1").expect("query").expect("found");
        assert_eq!(found.retro_id, "r1");
        assert_eq!(found.category, Category::Bud);
        assert_eq!(found.item.text, "body i1");
        assert!(find_item(&conn, "i9").expect("query").is_none());
    }

    #[test]
    fn list_tags_counts_usage() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "r1", None, "2024-01-01", false);
        insert_item(&conn, "r1", "i1", "rose", 0);
        insert_item(&conn, "r1", "i2", "rose", 1);
        for (item, tag) in [("i1", "food"), ("i2", "food"), ("i2", "view")] {
            conn.execute(
                "INSERT INTO rbt_item_tags (item_id, tag, created_at_us) VALUES (?1, ?2, 1)",
                params![item, tag],
            )
            .expect("tag");
        }
        let tags = list_tags(&conn, Some("ana"), None).expect("tags");
        assert_eq!(
            tags,
            vec![
                TagCount { tag: "food".into(), count: 2 },
                TagCount { tag: "view".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn ambiguous_prefixes_only_list_visible_retros() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "abc-1", None, "2024-01-01", false);
        insert_retro(&conn, "abc-2", None, "2024-01-01", true);
        insert_retro(&conn, "abc-3", None, "2024-01-01", true);

        // Only one visible match, so the prefix resolves for a stranger.
        assert_eq!(
            resolve_id(&conn, IdKind::Retro, "abc", Some("bob")).ok().as_deref(),
            Some("abc-1")
        );
        match resolve_id(&conn, IdKind::Retro, "abc", Some("ana")) {
            Err(RetroError::AmbiguousId { candidates, .. }) => assert_eq!(candidates.len(), 3),
            other => panic!("expected ambiguity for the owner, got {other:?}"),
        }
        insert_retro(&conn, "zzz-1", None, "2024-01-01", true);
        assert!(matches!(
            resolve_id(&conn, IdKind::Retro, "zzz", None),
            Err(RetroError::NotFound { .. })
        ));
    }

    #[test]
    fn list_tags_skips_private_retros_of_others() {
        let conn = open_in_memory().expect("db");
        insert_retro(&conn, "open", None, "2024-01-01", false);
        insert_retro(&conn, "secret", None, "2024-01-01", true);
        insert_item(&conn, "open", "i1", "rose", 0);
        insert_item(&conn, "secret", "i2", "thorn", 0);
        for (item, tag) in [("i1", "food"), ("i2", "lawyer")] {
            conn.execute(
                "INSERT INTO rbt_item_tags (item_id, tag, created_at_us) VALUES (?1, ?2, 1)",
                params![item, tag],
            )
            .expect("tag");
        }

        let tag_names = |viewer: Option<&str>| -> Vec<String> {
            list_tags(&conn, viewer, None)
                .expect("tags")
                .into_iter()
                .map(|t| t.tag)
                .collect()
        };
        assert_eq!(tag_names(Some("bob")), vec!["food"]);
        assert_eq!(tag_names(None), vec!["food"]);
        assert_eq!(tag_names(Some("ana")), vec!["food", "lawyer"]);
    }
}
