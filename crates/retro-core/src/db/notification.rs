//! In-app notifications. Rows are written alongside the mutation that
//! caused them and are only ever listed or marked read.

use anyhow::{Context, anyhow};
use rusqlite::{Connection, params};

use super::{from_us, new_id, now_us};
use crate::error::{Result, RetroError};
use crate::model::notification::{Notification, NotificationKind};

/// Queue a notification for `recipient`. Self-notifications are skipped;
/// names compare without regard to ASCII case, like attendee names do.
///
/// Returns whether a row was written.
pub(crate) fn insert_notification(
    conn: &Connection,
    actor: &str,
    recipient: &str,
    kind: NotificationKind,
    retro_id: Option<&str>,
    message: &str,
) -> anyhow::Result<bool> {
    if recipient.trim().is_empty() || recipient.eq_ignore_ascii_case(actor) {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO notifications \
         (notification_id, recipient, kind, retro_id, message, is_read, created_at_us) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
        params![new_id(), recipient, kind.as_str(), retro_id, message, now_us()],
    )
    .with_context(|| format!("insert {kind} notification for '{recipient}'"))?;
    tracing::debug!(recipient, kind = %kind, "queued notification");
    Ok(true)
}

/// Notifications addressed to `user`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a stored kind is unknown.
pub fn list_notifications(
    conn: &Connection,
    user: &str,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let sql = if unread_only {
        "SELECT notification_id, recipient, kind, retro_id, message, is_read, created_at_us \
         FROM notifications WHERE recipient = ?1 AND is_read = 0 \
         ORDER BY created_at_us DESC, rowid DESC"
    } else {
        "SELECT notification_id, recipient, kind, retro_id, message, is_read, created_at_us \
         FROM notifications WHERE recipient = ?1 \
         ORDER BY created_at_us DESC, rowid DESC"
    };
    let mut stmt = conn.prepare(sql).context("prepare list_notifications")?;
    let rows = stmt
        .query_map(params![user], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })
        .context("execute list_notifications")?;

    let mut out = Vec::new();
    for row in rows {
        let (id, recipient, kind, retro_id, message, read, created) =
            row.context("read notification row")?;
        let kind = NotificationKind::parse(&kind)
            .ok_or_else(|| anyhow!("unknown notification kind '{kind}'"))?;
        out.push(Notification {
            id,
            recipient,
            kind,
            retro_id,
            message,
            read: read != 0,
            created_at: from_us(created),
        });
    }
    Ok(out)
}

/// Mark one of `user`'s notifications as read. Idempotent.
///
/// # Errors
///
/// Returns [`RetroError::NotFound`] if `user` has no such notification.
pub fn mark_notification_read(conn: &Connection, user: &str, notification_id: &str) -> Result<()> {
    let changed = conn
        .execute(
            "UPDATE notifications SET is_read = 1 WHERE notification_id = ?1 AND recipient = ?2",
            params![notification_id, user],
        )
        .context("mark notification read")?;
    if changed == 0 {
        return Err(RetroError::not_found("notification", notification_id));
    }
    Ok(())
}

/// Mark every notification for `user` as read; returns how many changed.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn mark_all_read(conn: &Connection, user: &str) -> Result<usize> {
    let changed = conn
        .execute(
            "UPDATE notifications SET is_read = 1 WHERE recipient = ?1 AND is_read = 0",
            params![user],
        )
        .context("mark all notifications read")?;
    Ok(changed)
}
