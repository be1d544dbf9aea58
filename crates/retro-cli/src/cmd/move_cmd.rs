//! `retro move`: reparent a retrospective under a different one.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, short_id};
use crate::validate::parse_parent;
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::graph::Crumb;
use retro_core::graph::hierarchy::get_retro_breadcrumb;
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Retrospective ID to move.
    pub id: String,

    /// New parent ID. Use "--parent none" to make it top-level.
    #[arg(long)]
    pub parent: String,
}

#[derive(Debug, Serialize)]
struct MoveReport {
    ok: bool,
    id: String,
    parent_id: Option<String>,
    breadcrumb: Vec<Crumb>,
}

/// Execute `retro move`.
///
/// # Errors
///
/// Returns an error when the move would create a cycle, when you do not own
/// the retrospective, or when you cannot contribute to the new parent.
pub fn run_move(args: &MoveArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let id = resolve(state, IdKind::Retro, &args.id)?;
    let parent_id = parse_parent(&args.parent)
        .map(|raw| resolve(state, IdKind::Retro, raw))
        .transpose()?;

    mutate::set_parent(&state.conn, user, &id, parent_id.as_deref())?;
    let hops = state.config.hierarchy.max_breadcrumb_hops;
    let breadcrumb = get_retro_breadcrumb(&state.conn, &id, Some(user), hops)?;

    let report = MoveReport {
        ok: true,
        id,
        parent_id,
        breadcrumb,
    };
    render(output, &report, |r, w| {
        match &r.parent_id {
            Some(parent) => {
                writeln!(w, "✓ Moved {} under {}", short_id(&r.id), short_id(parent))?;
            }
            None => writeln!(w, "✓ {} is now top-level", short_id(&r.id))?,
        }
        let trail: Vec<&str> = r.breadcrumb.iter().map(|c| c.title.as_str()).collect();
        writeln!(w, "  {}", trail.join(" › "))
    })
}
