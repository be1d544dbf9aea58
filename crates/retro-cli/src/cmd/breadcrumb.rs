//! `retro breadcrumb`: print the root-first path to a retrospective.

use crate::cmd::resolve;
use crate::output::{OutputMode, render_mode, short_id};
use clap::Args;
use retro_core::db::access::require_visible;
use retro_core::db::query::IdKind;
use retro_core::graph::Crumb;
use retro_core::graph::hierarchy::get_retro_breadcrumb;
use retro_core::state::AppState;

#[derive(Args, Debug)]
pub struct BreadcrumbArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Stop after this many hops (defaults to `[hierarchy] max_breadcrumb_hops`).
    #[arg(long)]
    pub max_hops: Option<usize>,
}

/// Execute `retro breadcrumb`.
///
/// # Errors
///
/// Returns an error if the retrospective cannot be found or seen.
pub fn run_breadcrumb(
    args: &BreadcrumbArgs,
    state: &AppState,
    output: OutputMode,
) -> anyhow::Result<()> {
    let id = resolve(state, IdKind::Retro, &args.id)?;
    require_visible(&state.conn, &id, state.user())?;
    let hops = args.max_hops.unwrap_or(state.config.hierarchy.max_breadcrumb_hops);
    let trail: Vec<Crumb> = get_retro_breadcrumb(&state.conn, &id, state.user(), hops)?;

    render_mode(
        output,
        &trail,
        |trail, w| {
            for crumb in trail {
                writeln!(w, "{}\t{}", crumb.id, crumb.title)?;
            }
            Ok(())
        },
        |trail, w| {
            for (depth, crumb) in trail.iter().enumerate() {
                let marker = if depth == 0 {
                    String::new()
                } else {
                    format!("{}└ ", "  ".repeat(depth - 1))
                };
                writeln!(w, "{marker}{}  {}", short_id(&crumb.id), crumb.title)?;
            }
            Ok(())
        },
    )
}
