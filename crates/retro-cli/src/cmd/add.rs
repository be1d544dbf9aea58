//! `retro add`: append a rose, bud or thorn to a retrospective.

use crate::cmd::resolve;
use crate::output::{OutputMode, render_mode, short_id};
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::model::{Category, RbtItem};
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// rose, bud or thorn.
    pub category: Category,

    /// Retrospective ID or unique prefix.
    pub id: String,

    /// What happened.
    pub text: String,

    /// Tag the new item (repeatable).
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AddReport {
    retro_id: String,
    category: Category,
    item: RbtItem,
}

/// Execute `retro add`.
///
/// # Errors
///
/// Returns an error unless you own or attended the retrospective, or for
/// blank text or tags.
pub fn run_add(args: &AddArgs, state: &mut AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?.to_string();
    let retro_id = resolve(state, IdKind::Retro, &args.id)?;
    let item = mutate::add_rbt_item(
        &mut state.conn,
        &user,
        &retro_id,
        args.category,
        &args.text,
        &args.tags,
    )?;

    let report = AddReport {
        retro_id,
        category: args.category,
        item,
    };
    render_mode(
        output,
        &report,
        |r, w| writeln!(w, "{}\t{}\t{}", r.item.id, r.category, r.item.text),
        |r, w| {
            writeln!(
                w,
                "✓ Added {} {} to {}",
                r.category,
                short_id(&r.item.id),
                short_id(&r.retro_id)
            )?;
            if !r.item.tags.is_empty() {
                writeln!(w, "  Tags: #{}", r.item.tags.join(" #"))?;
            }
            Ok(())
        },
    )
}
