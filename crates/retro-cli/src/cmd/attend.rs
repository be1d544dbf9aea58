//! `retro attend` and `retro unattend`: tag or untag attendees.
//!
//! Tagged attendees can see private retrospectives and add their own items.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, short_id};
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct AttendArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Attendee display names.
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Link a single name to this user identity.
    #[arg(long)]
    pub user_ref: Option<String>,
}

#[derive(Args, Debug)]
pub struct UnattendArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Attendee display names to remove.
    #[arg(required = true)]
    pub names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AttendReport {
    ok: bool,
    retro_id: String,
    changed: Vec<String>,
    unchanged: Vec<String>,
}

fn render_report(output: OutputMode, report: &AttendReport, verb: &str) -> anyhow::Result<()> {
    render(output, report, |r, w| {
        if r.changed.is_empty() {
            return writeln!(w, "No attendees {verb} on {}", short_id(&r.retro_id));
        }
        let names = r.changed.join(", ");
        writeln!(w, "✓ {} on {}: {names}", capitalize(verb), short_id(&r.retro_id))
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Execute `retro attend`.
///
/// # Errors
///
/// Returns an error unless you own the retrospective, or when
/// `--user-ref` is given with more than one name.
pub fn run_attend(args: &AttendArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    if args.user_ref.is_some() && args.names.len() > 1 {
        anyhow::bail!("--user-ref links exactly one name; got {}", args.names.len());
    }
    let retro_id = resolve(state, IdKind::Retro, &args.id)?;

    let mut report = AttendReport {
        ok: true,
        retro_id,
        changed: Vec::new(),
        unchanged: Vec::new(),
    };
    let user_ref = args.user_ref.as_deref();
    for name in &args.names {
        let added = mutate::add_attendee(&state.conn, user, &report.retro_id, name, user_ref)?;
        if added {
            report.changed.push(name.trim().to_string());
        } else {
            report.unchanged.push(name.trim().to_string());
        }
    }
    render_report(output, &report, "tagged")
}

/// Execute `retro unattend`.
///
/// # Errors
///
/// Returns an error unless you own the retrospective or are removing
/// yourself.
pub fn run_unattend(
    args: &UnattendArgs,
    state: &AppState,
    output: OutputMode,
) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let retro_id = resolve(state, IdKind::Retro, &args.id)?;

    let mut report = AttendReport {
        ok: true,
        retro_id,
        changed: Vec::new(),
        unchanged: Vec::new(),
    };
    for name in &args.names {
        if mutate::remove_attendee(&state.conn, user, &report.retro_id, name)? {
            report.changed.push(name.trim().to_string());
        } else {
            report.unchanged.push(name.trim().to_string());
        }
    }
    render_report(output, &report, "untagged")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: AttendArgs,
    }

    #[test]
    fn attend_accepts_several_names() {
        let w = Wrapper::parse_from(["test", "abc", "Ben", "Cleo"]);
        assert_eq!(w.args.names, vec!["Ben", "Cleo"]);
        assert!(w.args.user_ref.is_none());
    }

    #[test]
    fn names_are_required() {
        assert!(Wrapper::try_parse_from(["test", "abc"]).is_err());
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("tagged"), "Tagged");
        assert_eq!(capitalize(""), "");
    }
}
