//! Canonical SQLite schema for the retro journal.
//!
//! The schema is normalized so that concurrent writers append rows rather
//! than overwrite whole lists:
//! - `retrospectives` holds metadata and the parent pointer
//! - `retro_attendees`, `rbt_items`, `rbt_item_tags`, `rbt_comments` model
//!   the multi-valued parts of a retrospective
//! - `photos`, `photo_reactions`, `photo_comments` hang off a retrospective
//!   or one of its items
//! - catalogues, trip planners, feedback spaces and notifications are
//!   user-owned collections referencing the above
//! - `store_meta` tracks the schema version

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS feedback_spaces (
    space_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL CHECK (length(trim(owner)) > 0),
    code TEXT NOT NULL UNIQUE CHECK (length(code) >= 4),
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    description TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS retrospectives (
    retro_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL CHECK (length(trim(owner)) > 0),
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    event_type TEXT NOT NULL DEFAULT '',
    event_date TEXT NOT NULL,
    primary_photo_url TEXT,
    location_name TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    lat REAL,
    lng REAL,
    parent_id TEXT REFERENCES retrospectives(retro_id) ON DELETE SET NULL,
    feedback_space_id TEXT REFERENCES feedback_spaces(space_id) ON DELETE SET NULL,
    is_private INTEGER NOT NULL DEFAULT 0 CHECK (is_private IN (0, 1)),
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (parent_id IS NULL OR parent_id <> retro_id)
);

CREATE TABLE IF NOT EXISTS retro_attendees (
    attendee_id INTEGER PRIMARY KEY AUTOINCREMENT,
    retro_id TEXT NOT NULL REFERENCES retrospectives(retro_id) ON DELETE CASCADE,
    name TEXT NOT NULL COLLATE NOCASE CHECK (length(trim(name)) > 0),
    user_ref TEXT,
    created_at_us INTEGER NOT NULL,
    UNIQUE (retro_id, name)
);

CREATE TABLE IF NOT EXISTS rbt_items (
    item_id TEXT PRIMARY KEY,
    retro_id TEXT NOT NULL REFERENCES retrospectives(retro_id) ON DELETE CASCADE,
    category TEXT NOT NULL CHECK (category IN ('rose', 'bud', 'thorn')),
    position INTEGER NOT NULL,
    body TEXT NOT NULL CHECK (length(trim(body)) > 0),
    owner_name TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    UNIQUE (retro_id, category, position)
);

CREATE TABLE IF NOT EXISTS rbt_item_tags (
    item_id TEXT NOT NULL REFERENCES rbt_items(item_id) ON DELETE CASCADE,
    tag TEXT NOT NULL CHECK (length(trim(tag)) > 0),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (item_id, tag)
);

CREATE TABLE IF NOT EXISTS rbt_comments (
    comment_id TEXT PRIMARY KEY,
    item_id TEXT NOT NULL REFERENCES rbt_items(item_id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS photos (
    photo_id TEXT PRIMARY KEY,
    retro_id TEXT NOT NULL REFERENCES retrospectives(retro_id) ON DELETE CASCADE,
    item_id TEXT REFERENCES rbt_items(item_id) ON DELETE CASCADE,
    url TEXT NOT NULL CHECK (length(trim(url)) > 0),
    caption TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS photo_reactions (
    photo_id TEXT NOT NULL REFERENCES photos(photo_id) ON DELETE CASCADE,
    user_name TEXT NOT NULL,
    emoji TEXT NOT NULL CHECK (length(trim(emoji)) > 0),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (photo_id, user_name)
);

CREATE TABLE IF NOT EXISTS photo_comments (
    comment_id TEXT PRIMARY KEY,
    photo_id TEXT NOT NULL REFERENCES photos(photo_id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS catalogues (
    catalogue_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    description TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS catalogue_members (
    catalogue_id TEXT NOT NULL REFERENCES catalogues(catalogue_id) ON DELETE CASCADE,
    user_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('owner', 'editor', 'viewer')),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (catalogue_id, user_name)
);

CREATE TABLE IF NOT EXISTS catalogue_items (
    entry_id TEXT PRIMARY KEY,
    catalogue_id TEXT NOT NULL REFERENCES catalogues(catalogue_id) ON DELETE CASCADE,
    source_retro_id TEXT NOT NULL,
    source_item_id TEXT NOT NULL,
    category TEXT NOT NULL CHECK (category IN ('rose', 'bud', 'thorn')),
    body TEXT NOT NULL,
    tags_json TEXT NOT NULL DEFAULT '[]',
    place_name TEXT,
    saved_by TEXT NOT NULL,
    created_at_us INTEGER NOT NULL,
    UNIQUE (catalogue_id, source_item_id)
);

CREATE TABLE IF NOT EXISTS trip_planners (
    trip_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    destination TEXT,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS trip_items (
    trip_item_id TEXT PRIMARY KEY,
    trip_id TEXT NOT NULL REFERENCES trip_planners(trip_id) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK (length(trim(title)) > 0),
    location TEXT,
    starts_at TEXT,
    ends_at TEXT,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending_review'
        CHECK (status IN ('booked', 'pending_review', 'declined')),
    catalogue_item_id TEXT REFERENCES catalogue_items(entry_id) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    recipient TEXT NOT NULL,
    kind TEXT NOT NULL CHECK (kind IN ('attendee_added', 'comment_added')),
    retro_id TEXT REFERENCES retrospectives(retro_id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, CAST((julianday('now') - 2440587.5) * 86400000000 AS INTEGER));
"#;

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_retros_parent
    ON retrospectives(parent_id);

CREATE INDEX IF NOT EXISTS idx_retros_date
    ON retrospectives(event_date DESC, created_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_retros_city_state
    ON retrospectives(city, state);

CREATE INDEX IF NOT EXISTS idx_retros_feedback_space
    ON retrospectives(feedback_space_id);

CREATE INDEX IF NOT EXISTS idx_attendees_name
    ON retro_attendees(name, retro_id);

CREATE INDEX IF NOT EXISTS idx_rbt_items_retro
    ON rbt_items(retro_id, category, position);

CREATE INDEX IF NOT EXISTS idx_rbt_comments_item
    ON rbt_comments(item_id, created_at_us);

CREATE INDEX IF NOT EXISTS idx_photos_retro_item
    ON photos(retro_id, item_id);

CREATE INDEX IF NOT EXISTS idx_catalogue_items_catalogue
    ON catalogue_items(catalogue_id, created_at_us);

CREATE INDEX IF NOT EXISTS idx_catalogue_members_user
    ON catalogue_members(user_name, catalogue_id);

CREATE INDEX IF NOT EXISTS idx_trip_items_trip
    ON trip_items(trip_id, starts_at);

CREATE INDEX IF NOT EXISTS idx_notifications_recipient
    ON notifications(recipient, is_read, created_at_us DESC);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
"#;

/// Migration v3: notification recipients compare without regard to ASCII
/// case, matching attendee names. SQLite cannot change a column's collation
/// in place, so the table is rebuilt.
pub const MIGRATION_V3_SQL: &str = r#"
CREATE TABLE notifications_v3 (
    notification_id TEXT PRIMARY KEY,
    recipient TEXT NOT NULL COLLATE NOCASE,
    kind TEXT NOT NULL CHECK (kind IN ('attendee_added', 'comment_added')),
    retro_id TEXT REFERENCES retrospectives(retro_id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0 CHECK (is_read IN (0, 1)),
    created_at_us INTEGER NOT NULL
);

INSERT INTO notifications_v3
    (notification_id, recipient, kind, retro_id, message, is_read, created_at_us)
SELECT notification_id, recipient, kind, retro_id, message, is_read, created_at_us
FROM notifications;

DROP TABLE notifications;

ALTER TABLE notifications_v3 RENAME TO notifications;

CREATE INDEX IF NOT EXISTS idx_notifications_recipient
    ON notifications(recipient, is_read, created_at_us DESC);

UPDATE store_meta
SET schema_version = 3
WHERE id = 1;
"#;

/// Indexes expected by list/filter query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_retros_parent",
    "idx_retros_date",
    "idx_retros_city_state",
    "idx_retros_feedback_space",
    "idx_attendees_name",
    "idx_rbt_items_retro",
    "idx_rbt_comments_item",
    "idx_photos_retro_item",
    "idx_catalogue_items_catalogue",
    "idx_catalogue_members_user",
    "idx_trip_items_trip",
    "idx_notifications_recipient",
];
