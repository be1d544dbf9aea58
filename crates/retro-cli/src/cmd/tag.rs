//! `retro tag`: add tags to a rose, bud or thorn.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, short_id};
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct TagArgs {
    /// Item ID or unique prefix.
    pub id: String,

    /// Tags to add.
    #[arg(required = true)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TagReport {
    ok: bool,
    item_id: String,
    added: Vec<String>,
    unchanged: Vec<String>,
}

/// Execute `retro tag`.
///
/// # Errors
///
/// Returns an error for unknown items, when you cannot contribute to the
/// item's retrospective, or for blank tags.
pub fn run_tag(args: &TagArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let item_id = resolve(state, IdKind::Item, &args.id)?;

    let mut added = Vec::new();
    let mut unchanged = Vec::new();
    for tag in &args.tags {
        if mutate::add_item_tag(&state.conn, user, &item_id, tag)? {
            added.push(tag.trim().to_string());
        } else {
            unchanged.push(tag.trim().to_string());
        }
    }

    let report = TagReport {
        ok: true,
        item_id,
        added,
        unchanged,
    };
    render(output, &report, |r, w| {
        if r.added.is_empty() {
            writeln!(w, "No new tags on {} (already present)", short_id(&r.item_id))
        } else {
            writeln!(w, "✓ Tagged {}: #{}", short_id(&r.item_id), r.added.join(" #"))
        }
    })
}
