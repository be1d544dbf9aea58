//! `retro tags`: tag inventory across every rose, bud and thorn.

use crate::output::{OutputMode, pretty_section, render_mode};
use clap::Args;
use retro_core::db::query::list_tags;
use retro_core::state::AppState;

#[derive(Args, Debug)]
pub struct TagsArgs {
    /// Show only the most used tags.
    #[arg(short = 'n', long)]
    pub limit: Option<u32>,
}

/// Execute `retro tags`.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn run_tags(args: &TagsArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let tags = list_tags(&state.conn, state.user(), args.limit)?;
    render_mode(
        output,
        &tags,
        |tags, w| {
            for t in tags {
                writeln!(w, "{}\t{}", t.tag, t.count)?;
            }
            Ok(())
        },
        |tags, w| {
            if tags.is_empty() {
                return writeln!(w, "No tags yet.");
            }
            pretty_section(w, &format!("Tags ({})", tags.len()))?;
            for t in tags {
                writeln!(w, "  {:>4}  #{}", t.count, t.tag)?;
            }
            Ok(())
        },
    )
}
