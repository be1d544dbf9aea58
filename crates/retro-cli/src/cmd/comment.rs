//! `retro comment`: discuss a rose, bud or thorn.
//!
//! Comments are append-only. The item's author gets a notification.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, short_id};
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::model::Comment;
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct CommentArgs {
    /// Item ID or unique prefix.
    pub id: String,

    /// Comment body.
    pub text: String,
}

#[derive(Debug, Serialize)]
struct CommentReport {
    ok: bool,
    item_id: String,
    comment: Comment,
}

/// Execute `retro comment`.
///
/// # Errors
///
/// Returns an error for unknown items, blank text, or when you cannot
/// contribute to the item's retrospective.
pub fn run_comment(args: &CommentArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let item_id = resolve(state, IdKind::Item, &args.id)?;
    let comment = mutate::add_item_comment(&state.conn, user, &item_id, &args.text)?;

    let report = CommentReport {
        ok: true,
        item_id,
        comment,
    };
    render(output, &report, |r, w| {
        writeln!(w, "✓ Commented on {} as {}", short_id(&r.item_id), r.comment.author_name)
    })
}
