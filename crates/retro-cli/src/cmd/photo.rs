//! `retro photo`: attach photos, react to them and discuss them.

use crate::cmd::resolve;
use crate::output::{OutputMode, render, render_success, short_id};
use clap::{Args, Subcommand};
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::state::AppState;

#[derive(Args, Debug)]
pub struct PhotoArgs {
    #[command(subcommand)]
    pub command: PhotoCommand,
}

#[derive(Subcommand, Debug)]
pub enum PhotoCommand {
    #[command(
        about = "Attach a photo to a retrospective or one of its items",
        after_help = "EXAMPLES:\n    retro photo add 3f2a https://img.example/sunset.jpg --caption \"Last night\"\n\n    # Pin it to a specific rose\n    retro photo add 3f2a https://img.example/tacos.jpg --item 9c1e"
    )]
    Add(PhotoAddArgs),

    #[command(about = "React to a photo with an emoji (replaces your previous reaction)")]
    React(PhotoReactArgs),

    #[command(about = "Comment on a photo")]
    Comment(PhotoCommentArgs),
}

#[derive(Args, Debug)]
pub struct PhotoAddArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Photo URL.
    pub url: String,

    #[arg(long)]
    pub caption: Option<String>,

    /// Attach to this item instead of the retrospective itself.
    #[arg(long)]
    pub item: Option<String>,
}

#[derive(Args, Debug)]
pub struct PhotoReactArgs {
    /// Photo ID or unique prefix.
    pub id: String,

    pub emoji: String,
}

#[derive(Args, Debug)]
pub struct PhotoCommentArgs {
    /// Photo ID or unique prefix.
    pub id: String,

    pub text: String,
}

/// Execute `retro photo <subcommand>`.
///
/// # Errors
///
/// Returns an error for unknown ids or when you lack access.
pub fn run_photo(args: &PhotoArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    match &args.command {
        PhotoCommand::Add(add) => {
            let retro_id = resolve(state, IdKind::Retro, &add.id)?;
            let item_id = add
                .item
                .as_deref()
                .map(|raw| resolve(state, IdKind::Item, raw))
                .transpose()?;
            let photo = mutate::add_photo(
                &state.conn,
                user,
                &retro_id,
                &add.url,
                add.caption.as_deref(),
                item_id.as_deref(),
            )?;
            render(output, &photo, |p, w| {
                writeln!(w, "✓ Added photo {} to {}", short_id(&p.id), short_id(&retro_id))
            })
        }
        PhotoCommand::React(react) => {
            let photo_id = resolve(state, IdKind::Photo, &react.id)?;
            mutate::react_to_photo(&state.conn, user, &photo_id, &react.emoji)?;
            let emoji = react.emoji.trim();
            render_success(output, &format!("Reacted {emoji} to {}", short_id(&photo_id)))
        }
        PhotoCommand::Comment(comment) => {
            let photo_id = resolve(state, IdKind::Photo, &comment.id)?;
            let created = mutate::comment_on_photo(&state.conn, user, &photo_id, &comment.text)?;
            render(output, &created, |c, w| {
                writeln!(w, "✓ Commented on photo {} as {}", short_id(&photo_id), c.author_name)
            })
        }
    }
}
