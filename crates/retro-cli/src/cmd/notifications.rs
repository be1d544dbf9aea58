//! `retro notifications`: your inbox: attendee tags and comments on your items.

use crate::cmd::resolve;
use crate::output::{OutputMode, pretty_section, render_mode, render_success, short_id};
use clap::{Args, Subcommand};
use retro_core::db::notification;
use retro_core::db::query::IdKind;
use retro_core::state::AppState;

#[derive(Args, Debug)]
pub struct NotificationsArgs {
    /// Only unread notifications.
    #[arg(long)]
    pub unread: bool,

    #[command(subcommand)]
    pub command: Option<NotificationsCommand>,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    #[command(about = "Mark one notification as read")]
    Read(NotificationIdArg),

    #[command(about = "Mark every notification as read")]
    ReadAll,
}

#[derive(Args, Debug)]
pub struct NotificationIdArg {
    /// Notification ID or unique prefix.
    pub id: String,
}

/// Execute `retro notifications`.
///
/// # Errors
///
/// Returns an error without an identity, or for a notification that is
/// not yours.
pub fn run_notifications(
    args: &NotificationsArgs,
    state: &AppState,
    output: OutputMode,
) -> anyhow::Result<()> {
    let user = state.require_user()?;
    match &args.command {
        Some(NotificationsCommand::Read(target)) => {
            let id = resolve(state, IdKind::Notification, &target.id)?;
            notification::mark_notification_read(&state.conn, user, &id)?;
            render_success(output, &format!("Marked {} read", short_id(&id)))
        }
        Some(NotificationsCommand::ReadAll) => {
            let changed = notification::mark_all_read(&state.conn, user)?;
            render_success(output, &format!("Marked {changed} notifications read"))
        }
        None => {
            let inbox = notification::list_notifications(&state.conn, user, args.unread)?;
            render_mode(
                output,
                &inbox,
                |inbox, w| {
                    for n in inbox {
                        let state = if n.read { "read" } else { "unread" };
                        writeln!(w, "{}\t{}\t{state}\t{}", n.id, n.kind, n.message)?;
                    }
                    Ok(())
                },
                |inbox, w| {
                    if inbox.is_empty() {
                        return writeln!(w, "Inbox empty.");
                    }
                    let unread = inbox.iter().filter(|n| !n.read).count();
                    pretty_section(w, &format!("Notifications ({unread} unread)"))?;
                    for n in inbox {
                        let dot = if n.read { " " } else { "•" };
                        writeln!(
                            w,
                            "{dot} {}  {}  {}",
                            short_id(&n.id),
                            n.created_at.format("%Y-%m-%d %H:%M"),
                            n.message
                        )?;
                    }
                    Ok(())
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: NotificationsArgs,
    }

    #[test]
    fn bare_command_lists() {
        let w = Wrapper::parse_from(["test", "--unread"]);
        assert!(w.args.unread);
        assert!(w.args.command.is_none());
    }

    #[test]
    fn read_all_subcommand() {
        let w = Wrapper::parse_from(["test", "read-all"]);
        assert!(matches!(w.args.command, Some(NotificationsCommand::ReadAll)));
    }
}
