//! Trip planners: user-owned itineraries built from scratch or from saved
//! catalogue entries.

use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params, types::Type};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::catalogue::{get_catalogue_item, is_catalogue_member};
use super::{from_us, new_id, now_us};
use crate::error::{Result, RetroError};
use crate::model::draft::{validate_text, validate_title};
use crate::model::trip::{TripPlanner, TripPlannerItem, TripStatus};

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const ITEM_COLUMNS: &str = "trip_item_id, trip_id, title, location, starts_at, ends_at, notes, \
     status, catalogue_item_id, created_at_us";

/// Fields for a new itinerary entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripItemDraft {
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub ends_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: TripStatus,
}

impl TripItemDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`RetroError::Validation`] for a blank title or an end before
    /// the start.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if let Some(notes) = &self.notes {
            validate_text("notes", notes)?;
        }
        if let (Some(start), Some(end)) = (self.starts_at, self.ends_at) {
            if end < start {
                return Err(RetroError::validation("ends_at", "must not be before starts_at"));
            }
        }
        Ok(())
    }
}

/// Create an itinerary owned by `owner`.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] for a blank name.
pub fn create_trip(
    conn: &Connection,
    owner: &str,
    name: &str,
    destination: Option<&str>,
) -> Result<TripPlanner> {
    if name.trim().is_empty() {
        return Err(RetroError::validation("name", "must not be empty"));
    }
    let destination = destination.map(str::trim).filter(|d| !d.is_empty());
    let trip_id = new_id();
    let now = now_us();
    conn.execute(
        "INSERT INTO trip_planners (trip_id, owner, name, destination, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![trip_id, owner, name.trim(), destination, now],
    )
    .context("insert trip planner")?;
    info!(trip = %trip_id, owner, "created trip planner");
    Ok(TripPlanner {
        id: trip_id,
        owner: owner.to_string(),
        name: name.trim().to_string(),
        destination: destination.map(str::to_string),
        created_at: from_us(now),
    })
}

/// Fetch a trip planner by exact id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_trip(conn: &Connection, trip_id: &str) -> Result<Option<TripPlanner>> {
    let found = conn
        .query_row(
            "SELECT trip_id, owner, name, destination, created_at_us \
             FROM trip_planners WHERE trip_id = ?1",
            params![trip_id],
            row_to_trip,
        )
        .optional()
        .with_context(|| format!("get_trip '{trip_id}'"))?;
    Ok(found)
}

/// Trip planners owned by `owner`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_trips(conn: &Connection, owner: &str) -> Result<Vec<TripPlanner>> {
    let mut stmt = conn
        .prepare(
            "SELECT trip_id, owner, name, destination, created_at_us FROM trip_planners \
             WHERE owner = ?1 ORDER BY created_at_us DESC, trip_id ASC",
        )
        .context("prepare list_trips")?;
    let rows = stmt
        .query_map(params![owner], row_to_trip)
        .context("execute list_trips")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read trip row")?);
    }
    Ok(out)
}

fn require_trip_owner(conn: &Connection, trip_id: &str, user: &str) -> Result<TripPlanner> {
    match get_trip(conn, trip_id)? {
        Some(trip) if trip.owner == user => Ok(trip),
        _ => Err(RetroError::not_found("trip", trip_id)),
    }
}

/// Append an entry to a trip planner.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `user` owns the trip, or
/// [`RetroError::Validation`] for a bad draft.
pub fn add_trip_item(
    conn: &Connection,
    user: &str,
    trip_id: &str,
    draft: &TripItemDraft,
) -> Result<TripPlannerItem> {
    insert_trip_item(conn, user, trip_id, draft, None)
}

/// Plan a saved catalogue entry: its text becomes the title and its place
/// name the location.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for unknown trips or entries, or when
/// `user` is not a member of the entry's catalogue.
pub fn add_trip_item_from_catalogue(
    conn: &Connection,
    user: &str,
    trip_id: &str,
    entry_id: &str,
    status: TripStatus,
) -> Result<TripPlannerItem> {
    let entry = get_catalogue_item(conn, entry_id)?
        .ok_or_else(|| RetroError::not_found("catalogue entry", entry_id))?;
    if !is_catalogue_member(conn, &entry.catalogue_id, user)? {
        return Err(RetroError::not_found("catalogue entry", entry_id));
    }
    let title: String = entry.text.chars().take(crate::model::draft::MAX_TITLE_LEN).collect();
    let draft = TripItemDraft {
        title,
        location: entry.place_name,
        status,
        ..TripItemDraft::default()
    };
    insert_trip_item(conn, user, trip_id, &draft, Some(entry_id))
}

fn insert_trip_item(
    conn: &Connection,
    user: &str,
    trip_id: &str,
    draft: &TripItemDraft,
    catalogue_item_id: Option<&str>,
) -> Result<TripPlannerItem> {
    require_trip_owner(conn, trip_id, user)?;
    draft.validate()?;

    let item_id = new_id();
    let now = now_us();
    let location = draft.location.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let notes = draft.notes.as_deref().map(str::trim);
    conn.execute(
        "INSERT INTO trip_items \
         (trip_item_id, trip_id, title, location, starts_at, ends_at, notes, status, \
          catalogue_item_id, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            item_id,
            trip_id,
            draft.title.trim(),
            location,
            draft.starts_at.map(|t| t.format(DATETIME_FORMAT).to_string()),
            draft.ends_at.map(|t| t.format(DATETIME_FORMAT).to_string()),
            notes,
            draft.status.as_str(),
            catalogue_item_id,
            now,
        ],
    )
    .context("insert trip item")?;
    info!(trip = %trip_id, item = %item_id, status = %draft.status, "added trip item");

    Ok(TripPlannerItem {
        id: item_id,
        trip_id: trip_id.to_string(),
        title: draft.title.trim().to_string(),
        location: location.map(str::to_string),
        starts_at: draft.starts_at,
        ends_at: draft.ends_at,
        notes: notes.map(str::to_string),
        status: draft.status,
        catalogue_item_id: catalogue_item_id.map(str::to_string),
        created_at: from_us(now),
    })
}

fn trip_of_item(conn: &Connection, item_id: &str) -> Result<String> {
    conn.query_row(
        "SELECT trip_id FROM trip_items WHERE trip_item_id = ?1",
        params![item_id],
        |row| row.get(0),
    )
    .optional()
    .context("load trip of item")?
    .ok_or_else(|| RetroError::not_found("trip item", item_id))
}

/// Set an entry's booking status. Any status may follow any other.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `user` owns the entry's trip.
pub fn set_trip_item_status(
    conn: &Connection,
    user: &str,
    item_id: &str,
    status: TripStatus,
) -> Result<()> {
    let trip_id = trip_of_item(conn, item_id)?;
    require_trip_owner(conn, &trip_id, user)?;
    conn.execute(
        "UPDATE trip_items SET status = ?1 WHERE trip_item_id = ?2",
        params![status.as_str(), item_id],
    )
    .context("update trip item status")?;
    info!(item = %item_id, %status, "set trip item status");
    Ok(())
}

/// Entries of a trip ordered by start time; undated entries last.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `user` owns the trip.
pub fn list_trip_items(
    conn: &Connection,
    user: &str,
    trip_id: &str,
) -> Result<Vec<TripPlannerItem>> {
    require_trip_owner(conn, trip_id, user)?;
    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM trip_items WHERE trip_id = ?1 \
         ORDER BY starts_at IS NULL, starts_at ASC, created_at_us ASC, rowid ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare list_trip_items")?;
    let rows = stmt
        .query_map(params![trip_id], row_to_item)
        .context("execute list_trip_items")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read trip item row")?);
    }
    Ok(out)
}

/// Remove one itinerary entry.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `user` owns the entry's trip.
pub fn delete_trip_item(conn: &Connection, user: &str, item_id: &str) -> Result<()> {
    let trip_id = trip_of_item(conn, item_id)?;
    require_trip_owner(conn, &trip_id, user)?;
    conn.execute(
        "DELETE FROM trip_items WHERE trip_item_id = ?1",
        params![item_id],
    )
    .context("delete trip item")?;
    info!(trip = %trip_id, item = %item_id, "removed trip item");
    Ok(())
}

/// Delete a trip planner and all its entries.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `user` owns the trip.
pub fn delete_trip(conn: &Connection, user: &str, trip_id: &str) -> Result<()> {
    require_trip_owner(conn, trip_id, user)?;
    conn.execute("DELETE FROM trip_planners WHERE trip_id = ?1", params![trip_id])
        .context("delete trip")?;
    info!(trip = %trip_id, "deleted trip planner");
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_trip(row: &Row<'_>) -> rusqlite::Result<TripPlanner> {
    Ok(TripPlanner {
        id: row.get(0)?,
        owner: row.get(1)?,
        name: row.get(2)?,
        destination: row.get(3)?,
        created_at: from_us(row.get(4)?),
    })
}

fn parse_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        NaiveDateTime::parse_from_str(&value, DATETIME_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<TripPlannerItem> {
    let status: String = row.get(7)?;
    let status = status
        .parse::<TripStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
    Ok(TripPlannerItem {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        title: row.get(2)?,
        location: row.get(3)?,
        starts_at: parse_datetime(row, 4)?,
        ends_at: parse_datetime(row, 5)?,
        notes: row.get(6)?,
        status,
        catalogue_item_id: row.get(8)?,
        created_at: from_us(row.get(9)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::catalogue::{create_catalogue, save_to_catalogue};
    use crate::db::mutate::{add_rbt_item, create_retro};
    use crate::db::open_in_memory;
    use crate::model::Category;
    use crate::model::draft::RetroDraft;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid datetime")
    }

    #[test]
    fn items_sort_by_start_with_undated_last() {
        let conn = open_in_memory().expect("db");
        let trip = create_trip(&conn, "ana", "Italy", Some("Rome")).expect("trip");

        add_trip_item(&conn, "ana", &trip.id, &TripItemDraft::new("Someday")).expect("undated");
        let mut late = TripItemDraft::new("Colosseum");
        late.starts_at = Some(at(3, 9));
        add_trip_item(&conn, "ana", &trip.id, &late).expect("late");
        let mut early = TripItemDraft::new("Flight");
        early.starts_at = Some(at(1, 6));
        early.ends_at = Some(at(1, 9));
        early.status = TripStatus::Booked;
        add_trip_item(&conn, "ana", &trip.id, &early).expect("early");

        let items = list_trip_items(&conn, "ana", &trip.id).expect("items");
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Flight", "Colosseum", "Someday"]);
        assert_eq!(items[0].status, TripStatus::Booked);
        assert_eq!(items[0].ends_at, Some(at(1, 9)));
        assert_eq!(items[2].status, TripStatus::PendingReview);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let conn = open_in_memory().expect("db");
        let trip = create_trip(&conn, "ana", "Italy", None).expect("trip");
        let mut draft = TripItemDraft::new("Backwards");
        draft.starts_at = Some(at(2, 10));
        draft.ends_at = Some(at(2, 9));
        assert!(matches!(
            add_trip_item(&conn, "ana", &trip.id, &draft),
            Err(RetroError::Validation { .. })
        ));
    }

    #[test]
    fn status_changes_freely_and_only_for_owner() {
        let conn = open_in_memory().expect("db");
        let trip = create_trip(&conn, "ana", "Italy", None).expect("trip");
        let item =
            add_trip_item(&conn, "ana", &trip.id, &TripItemDraft::new("Hotel")).expect("item");

        for status in [TripStatus::Declined, TripStatus::Booked, TripStatus::PendingReview] {
            set_trip_item_status(&conn, "ana", &item.id, status).expect("status");
            let items = list_trip_items(&conn, "ana", &trip.id).expect("items");
            assert_eq!(items[0].status, status);
        }
        assert!(matches!(
            set_trip_item_status(&conn, "ben", &item.id, TripStatus::Booked),
            Err(RetroError::NotFound { .. })
        ));

        delete_trip_item(&conn, "ana", &item.id).expect("delete");
        assert!(list_trip_items(&conn, "ana", &trip.id).expect("items").is_empty());
    }

    #[test]
    fn plan_from_catalogue_copies_snapshot() {
        let mut conn = open_in_memory().expect("db");
        let date = NaiveDate::from_ymd_opt(2024, 9, 9).expect("date");
        let mut draft = RetroDraft::new("Naples", date);
        draft.metadata.location = Some(crate::model::Location {
            name: Some("Da Michele".into()),
            ..crate::model::Location::default()
        });
        let retro = create_retro(&mut conn, "ana", &draft).expect("retro");
        let item = add_rbt_item(&mut conn, "ana", &retro.id, Category::Rose, "Best pizza", &[])
            .expect("item");
        let cat = create_catalogue(&mut conn, "ana", "Pizza", None).expect("catalogue");
        let entry = save_to_catalogue(&conn, "ana", &cat.id, &item.id).expect("save");

        let trip = create_trip(&conn, "ana", "Back to Naples", None).expect("trip");
        let pending = TripStatus::PendingReview;
        let planned = add_trip_item_from_catalogue(&conn, "ana", &trip.id, &entry.id, pending)
            .expect("plan");
        assert_eq!(planned.title, "Best pizza");
        assert_eq!(planned.location.as_deref(), Some("Da Michele"));
        assert_eq!(planned.catalogue_item_id.as_deref(), Some(entry.id.as_str()));

        assert!(
            add_trip_item_from_catalogue(&conn, "ben", &trip.id, &entry.id, TripStatus::Booked)
                .is_err()
        );

        delete_trip(&conn, "ana", &trip.id).expect("delete trip");
        assert!(list_trips(&conn, "ana").expect("trips").is_empty());
    }
}
