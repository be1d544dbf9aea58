//! `retro delete`: remove a retrospective you own.
//!
//! Children are kept and become top-level retrospectives. Items saved to
//! catalogues survive as snapshots.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, short_id};
use clap::Args;
use retro_core::RetroError;
use retro_core::db::query::{self, IdKind};
use retro_core::db::mutate;
use retro_core::state::AppState;
use serde::Serialize;
use std::io::{IsTerminal, Write};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Skip interactive confirmation prompt.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct DeleteReport {
    ok: bool,
    id: String,
    title: String,
    orphaned_children: usize,
}

fn confirm_delete(id: &str, title: &str, children: usize) -> anyhow::Result<bool> {
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        return Ok(true);
    }

    if children > 0 {
        eprint!("Delete {id} '{title}'? Its {children} children become top-level. [y/N] ");
    } else {
        eprint!("Delete {id} '{title}'? [y/N] ");
    }
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

/// Execute `retro delete`.
///
/// # Errors
///
/// Returns an error without an identity, when the retrospective is not
/// yours, or when the prompt is declined.
pub fn run_delete(args: &DeleteArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let id = resolve(state, IdKind::Retro, &args.id)?;
    let link = query::get_retro_link(&state.conn, &id)?.ok_or_else(|| RetroError::NotFound {
        kind: "retrospective",
        id: id.clone(),
    })?;
    let children = query::get_child_ids(&state.conn, &id)?.len();

    if !args.force && !confirm_delete(&id, &link.title, children)? {
        anyhow::bail!("deletion of '{id}' cancelled");
    }
    mutate::delete_retro(&state.conn, user, &id)?;

    let report = DeleteReport {
        ok: true,
        id,
        title: link.title,
        orphaned_children: children,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ Deleted {} \"{}\"", short_id(&r.id), r.title)?;
        if r.orphaned_children > 0 {
            writeln!(w, "  {} children are now top-level.", r.orphaned_children)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: DeleteArgs,
    }

    #[test]
    fn delete_args_parse() {
        let w = Wrapper::parse_from(["test", "abc123", "--force"]);
        assert_eq!(w.args.id, "abc123");
        assert!(w.args.force);
    }

    #[test]
    fn force_defaults_off() {
        let w = Wrapper::parse_from(["test", "abc123"]);
        assert!(!w.args.force);
    }
}
