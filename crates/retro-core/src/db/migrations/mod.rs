//! Store schema upgrades.
//!
//! The store's schema version lives in `PRAGMA user_version` and is mirrored
//! into `store_meta.schema_version`. Opening a store runs every [`Step`] newer
//! than the recorded version, one transaction per step.

use super::schema;
use rusqlite::Connection;

/// One schema upgrade.
struct Step {
    version: u32,
    label: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step { version: 1, label: "base tables", sql: schema::MIGRATION_V1_SQL },
    Step { version: 2, label: "read-path indexes", sql: schema::MIGRATION_V2_SQL },
    Step { version: 3, label: "case-folded recipients", sql: schema::MIGRATION_V3_SQL },
];

/// Schema version a freshly migrated store ends up at.
pub const LATEST_SCHEMA_VERSION: u32 = STEPS[STEPS.len() - 1].version;

/// Version recorded in the store, `0` for an empty database.
///
/// # Errors
///
/// Returns an error if the pragma cannot be read or holds a negative or
/// oversized value.
pub fn current_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    let raw: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    u32::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(0, raw))
}

fn apply(conn: &mut Connection, step: &Step) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.execute("UPDATE store_meta SET schema_version = ?1 WHERE id = 1", [step.version])?;
    tx.commit()?;
    tracing::debug!(version = step.version, step = step.label, "applied store migration");
    Ok(())
}

/// Bring the store up to [`LATEST_SCHEMA_VERSION`] and return the version it
/// ends at. A store already at or past the latest version is left alone.
///
/// # Errors
///
/// Returns an error if a step fails; earlier steps stay committed.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<u32> {
    let found = current_schema_version(conn)?;
    STEPS
        .iter()
        .filter(|step| step.version > found)
        .try_fold(found, |_, step| apply(conn, step).map(|()| step.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn has_object(conn: &Connection, kind: &str, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = ?1 AND name = ?2",
            params![kind, name],
            |row| row.get(0),
        )
        .expect("sqlite_master lookup")
    }

    fn stored_version(conn: &Connection) -> i64 {
        conn.query_row("SELECT schema_version FROM store_meta WHERE id = 1", [], |row| row.get(0))
            .expect("store_meta row")
    }

    #[test]
    fn empty_store_gets_every_table_and_index() {
        let mut conn = Connection::open_in_memory().expect("db");
        assert_eq!(migrate(&mut conn).expect("migrate"), LATEST_SCHEMA_VERSION);
        assert_eq!(current_schema_version(&conn).expect("version"), LATEST_SCHEMA_VERSION);
        assert_eq!(stored_version(&conn), i64::from(LATEST_SCHEMA_VERSION));

        let tables = [
            "retrospectives",
            "retro_attendees",
            "rbt_items",
            "rbt_item_tags",
            "rbt_comments",
            "photos",
            "photo_reactions",
            "photo_comments",
            "catalogues",
            "catalogue_members",
            "catalogue_items",
            "trip_planners",
            "trip_items",
            "feedback_spaces",
            "notifications",
            "store_meta",
        ];
        for table in tables {
            assert!(has_object(&conn, "table", table), "no table {table}");
        }
        assert!(!has_object(&conn, "table", "notifications_v3"));
        for index in schema::REQUIRED_INDEXES {
            assert!(has_object(&conn, "index", index), "no index {index}");
        }
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut conn = Connection::open_in_memory().expect("db");
        migrate(&mut conn).expect("first run");
        assert_eq!(migrate(&mut conn).expect("second run"), LATEST_SCHEMA_VERSION);

        let meta_rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM store_meta", [], |row| row.get(0))
            .expect("count");
        assert_eq!(meta_rows, 1);
    }

    #[test]
    fn v1_store_upgrades_with_rows_intact() {
        let mut conn = Connection::open_in_memory().expect("db");
        conn.execute_batch(schema::MIGRATION_V1_SQL).expect("v1");
        conn.pragma_update(None, "user_version", 1_i64).expect("pragma");
        conn.execute(
            "INSERT INTO retrospectives \
             (retro_id, owner, title, event_date, created_at_us, updated_at_us) \
             VALUES ('r-1', 'ana', 'Road trip', '2024-04-01', 1, 1)",
            [],
        )
        .expect("seed retro");

        assert_eq!(migrate(&mut conn).expect("migrate"), LATEST_SCHEMA_VERSION);
        assert!(has_object(&conn, "index", "idx_retros_parent"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM retrospectives", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 1);
    }

    #[test]
    fn v2_notifications_survive_and_match_any_case() {
        let mut conn = Connection::open_in_memory().expect("db");
        conn.execute_batch(schema::MIGRATION_V1_SQL).expect("v1");
        conn.execute_batch(schema::MIGRATION_V2_SQL).expect("v2");
        conn.pragma_update(None, "user_version", 2_i64).expect("pragma");
        conn.execute(
            "INSERT INTO notifications \
             (notification_id, recipient, kind, message, created_at_us) \
             VALUES ('n-1', 'Ben', 'attendee_added', 'tagged', 1)",
            [],
        )
        .expect("seed notification");

        assert_eq!(migrate(&mut conn).expect("migrate"), 3);
        assert_eq!(stored_version(&conn), 3);
        let hits: i64 = conn
            .query_row("SELECT COUNT(*) FROM notifications WHERE recipient = 'ben'", [], |row| {
                row.get(0)
            })
            .expect("count");
        assert_eq!(hits, 1);
        assert!(has_object(&conn, "index", "idx_notifications_recipient"));
    }

    #[test]
    fn retro_cannot_be_its_own_parent() {
        let mut conn = Connection::open_in_memory().expect("db");
        migrate(&mut conn).expect("migrate");
        let inserted = conn.execute(
            "INSERT INTO retrospectives \
             (retro_id, owner, title, event_date, parent_id, created_at_us, updated_at_us) \
             VALUES ('r-1', 'ana', 'Loop', '2024-04-01', 'r-1', 1, 1)",
            [],
        );
        assert!(inserted.is_err());
    }
}
