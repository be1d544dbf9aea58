//! Feedback spaces: owner-created intake points addressed by a short code.

use anyhow::Context;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{info, warn};

use super::query::{self, RetroQuery};
use super::{from_us, mutate, new_id, now_us};
use crate::error::{Result, RetroError};
use crate::model::Retrospective;
use crate::model::draft::{RetroDraft, validate_title};
use crate::model::feedback::{FeedbackSpace, normalize_code, random_code};

/// Attempts at drawing an unused code before giving up.
pub const MAX_CODE_ATTEMPTS: u32 = 16;

const SPACE_COLUMNS: &str = "space_id, owner, code, title, description, created_at_us";

/// Draw random codes until one is not in use.
///
/// # Errors
///
/// Returns [`RetroError::CodeSpaceExhausted`] after [`MAX_CODE_ATTEMPTS`]
/// collisions, or [`RetroError::Db`] if the lookup fails.
pub fn generate_unique_code<R: Rng + ?Sized>(
    conn: &Connection,
    rng: &mut R,
    len: usize,
) -> Result<String> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let code = random_code(rng, len);
        let taken: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM feedback_spaces WHERE code = ?1)",
                params![code],
                |row| row.get(0),
            )
            .context("check feedback code")?;
        if !taken {
            return Ok(code);
        }
        tracing::debug!(attempt, "feedback code collision");
    }
    warn!(len, attempts = MAX_CODE_ATTEMPTS, "feedback code space exhausted");
    Err(RetroError::CodeSpaceExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Create a feedback space with a fresh code of `code_len` characters.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] for a blank title or a code shorter
/// than four characters, or [`RetroError::CodeSpaceExhausted`].
pub fn create_feedback_space<R: Rng + ?Sized>(
    conn: &Connection,
    rng: &mut R,
    owner: &str,
    title: &str,
    description: Option<&str>,
    code_len: usize,
) -> Result<FeedbackSpace> {
    validate_title(title)?;
    if code_len < 4 {
        return Err(RetroError::validation("code length", "must be at least 4"));
    }
    let code = generate_unique_code(conn, rng, code_len)?;
    let description = description.map(str::trim).filter(|d| !d.is_empty());
    let space_id = new_id();
    let now = now_us();
    conn.execute(
        "INSERT INTO feedback_spaces (space_id, owner, code, title, description, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![space_id, owner, code, title.trim(), description, now],
    )
    .context("insert feedback space")?;
    info!(space = %space_id, owner, code = %code, "created feedback space");
    Ok(FeedbackSpace {
        id: space_id,
        owner: owner.to_string(),
        code,
        title: title.trim().to_string(),
        description: description.map(str::to_string),
        created_at: from_us(now),
    })
}

/// Look a space up by its code, ignoring case and surrounding space.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_feedback_space_by_code(conn: &Connection, code: &str) -> Result<Option<FeedbackSpace>> {
    let sql = format!("SELECT {SPACE_COLUMNS} FROM feedback_spaces WHERE code = ?1");
    let found = conn
        .query_row(&sql, params![normalize_code(code)], row_to_space)
        .optional()
        .context("get_feedback_space_by_code")?;
    Ok(found)
}

/// Fetch a space by exact id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_feedback_space(conn: &Connection, space_id: &str) -> Result<Option<FeedbackSpace>> {
    let sql = format!("SELECT {SPACE_COLUMNS} FROM feedback_spaces WHERE space_id = ?1");
    let found = conn
        .query_row(&sql, params![space_id], row_to_space)
        .optional()
        .with_context(|| format!("get_feedback_space '{space_id}'"))?;
    Ok(found)
}

/// Spaces owned by `owner`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_feedback_spaces(conn: &Connection, owner: &str) -> Result<Vec<FeedbackSpace>> {
    let sql = format!(
        "SELECT {SPACE_COLUMNS} FROM feedback_spaces WHERE owner = ?1 \
         ORDER BY created_at_us DESC, space_id ASC"
    );
    let mut stmt = conn.prepare(&sql).context("prepare list_feedback_spaces")?;
    let rows = stmt
        .query_map(params![owner], row_to_space)
        .context("execute list_feedback_spaces")?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("read feedback space row")?);
    }
    Ok(out)
}

/// Submit a retrospective through a space code. The submitter owns the new
/// retrospective; it references the space so the space owner can review it.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] for an unknown code, plus anything
/// [`mutate::create_retro`] returns.
pub fn submit_via_feedback_space(
    conn: &mut Connection,
    submitter: &str,
    code: &str,
    draft: &RetroDraft,
) -> Result<Retrospective> {
    let space = get_feedback_space_by_code(conn, code)?
        .ok_or_else(|| RetroError::not_found("feedback space", normalize_code(code)))?;
    let mut draft = draft.clone();
    draft.feedback_space_id = Some(space.id.clone());
    let retro = mutate::create_retro(conn, submitter, &draft)?;
    info!(space = %space.id, retro = %retro.id, submitter, "submitted via feedback space");
    Ok(retro)
}

/// Retrospectives submitted to a space, including private ones. Space
/// owner only.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] unless `viewer` owns the space.
pub fn list_space_retros(
    conn: &Connection,
    viewer: &str,
    space_id: &str,
) -> Result<Vec<Retrospective>> {
    match get_feedback_space(conn, space_id)? {
        Some(space) if space.owner == viewer => {}
        _ => return Err(RetroError::not_found("feedback space", space_id)),
    }
    let retros = query::list_retros(
        conn,
        &RetroQuery {
            feedback_space_id: Some(space_id.to_string()),
            ignore_visibility: true,
            ..RetroQuery::default()
        },
    )?;
    Ok(retros)
}

fn row_to_space(row: &Row<'_>) -> rusqlite::Result<FeedbackSpace> {
    Ok(FeedbackSpace {
        id: row.get(0)?,
        owner: row.get(1)?,
        code: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        created_at: from_us(row.get(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::model::feedback::{CODE_ALPHABET, DEFAULT_CODE_LENGTH};
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).expect("valid date")
    }

    #[test]
    fn create_and_find_by_code_case_insensitively() {
        let conn = open_in_memory().expect("db");
        let mut rng = StdRng::seed_from_u64(1);
        let space =
            create_feedback_space(&conn, &mut rng, "ana", "Offsite", None, DEFAULT_CODE_LENGTH)
                .expect("space");
        assert_eq!(space.code.len(), DEFAULT_CODE_LENGTH);
        assert!(space.code.bytes().all(|b| CODE_ALPHABET.contains(&b)));

        let lookup = format!("  {} ", space.code.to_lowercase());
        let found = get_feedback_space_by_code(&conn, &lookup).expect("lookup").expect("found");
        assert_eq!(found.id, space.id);
        assert_eq!(list_feedback_spaces(&conn, "ana").expect("list").len(), 1);
    }

    #[test]
    fn collisions_retry_then_exhaust() {
        let conn = open_in_memory().expect("db");
        // Same seed replays the same draws, so every candidate is taken.
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = random_code(&mut rng, 4);
            conn.execute(
                "INSERT OR IGNORE INTO feedback_spaces \
                 (space_id, owner, code, title, created_at_us) \
                 VALUES (?1, 'ana', ?2, 't', 1)",
                params![new_id(), code],
            )
            .expect("seed code");
        }
        let mut replay = StdRng::seed_from_u64(9);
        assert!(matches!(
            generate_unique_code(&conn, &mut replay, 4),
            Err(RetroError::CodeSpaceExhausted { .. })
        ));

        let mut fresh = StdRng::seed_from_u64(10);
        assert!(generate_unique_code(&conn, &mut fresh, 8).is_ok());
    }

    #[test]
    fn submissions_are_owned_by_submitter_and_listed_for_space_owner() {
        let mut conn = open_in_memory().expect("db");
        let mut rng = StdRng::seed_from_u64(3);
        let space = create_feedback_space(&conn, &mut rng, "ana", "Offsite", Some("tell us"), 6)
            .expect("space");

        let mut draft = RetroDraft::new("My take", day());
        draft.metadata.is_private = true;
        let retro =
            submit_via_feedback_space(&mut conn, "ben", &space.code, &draft).expect("submit");
        assert_eq!(retro.owner, "ben");
        assert_eq!(retro.feedback_space_id.as_deref(), Some(space.id.as_str()));

        let listed = list_space_retros(&conn, "ana", &space.id).expect("list");
        assert_eq!(listed.len(), 1, "space owner sees private submissions");
        assert!(list_space_retros(&conn, "ben", &space.id).is_err());

        assert!(matches!(
            submit_via_feedback_space(&mut conn, "ben", "ZZZZZZ", &draft),
            Err(RetroError::NotFound { .. })
        ));
    }
}
