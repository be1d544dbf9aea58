//! `retro space`: feedback spaces: short codes others submit retrospectives to.
//!
//! Anyone holding the code can submit. Only the space owner can list what
//! was submitted, private submissions included.

use crate::cmd::create::LocationArgs;
use crate::cmd::list::{RetroRow, write_rows_text, write_tree_pretty};
use crate::cmd::resolve;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode, short_id};
use crate::validate::parse_date;
use clap::{Args, Subcommand};
use retro_core::RetroError;
use retro_core::db::feedback;
use retro_core::db::query::IdKind;
use retro_core::model::Retrospective;
use retro_core::model::draft::RetroDraft;
use retro_core::state::AppState;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SpaceArgs {
    #[command(subcommand)]
    pub command: SpaceCommand,
}

#[derive(Subcommand, Debug)]
pub enum SpaceCommand {
    #[command(
        about = "Open a feedback space and get its code",
        after_help = "EXAMPLES:\n    retro space create \"Offsite 2024\" --description \"Tell us how it went\""
    )]
    Create(SpaceCreateArgs),

    #[command(about = "List spaces you own")]
    List,

    #[command(about = "Look up a space by its code")]
    Show(SpaceCodeArg),

    #[command(
        about = "Submit a retrospective to a space",
        after_help = "EXAMPLES:\n    retro space submit K7QX2M --title \"Day two\" --date 2024-06-02 --private"
    )]
    Submit(SpaceSubmitArgs),

    #[command(about = "List retrospectives submitted to a space you own")]
    Retros(SpaceIdArg),
}

#[derive(Args, Debug)]
pub struct SpaceCreateArgs {
    pub title: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct SpaceCodeArg {
    /// Space code (case-insensitive).
    pub code: String,
}

#[derive(Args, Debug)]
pub struct SpaceIdArg {
    /// Space ID or unique prefix.
    pub space: String,
}

#[derive(Args, Debug)]
pub struct SpaceSubmitArgs {
    /// Space code (case-insensitive).
    pub code: String,

    #[arg(short, long)]
    pub title: String,

    #[arg(short, long, default_value = "")]
    pub event_type: String,

    /// Event date: YYYY-MM-DD, today or yesterday.
    #[arg(short, long, default_value = "today")]
    pub date: String,

    /// Hide from everyone except you, the attendees and the space owner.
    #[arg(long)]
    pub private: bool,

    #[arg(short, long = "attendee")]
    pub attendees: Vec<String>,

    #[command(flatten)]
    pub location: LocationArgs,
}

impl SpaceSubmitArgs {
    fn to_draft(&self) -> anyhow::Result<RetroDraft> {
        let mut draft = RetroDraft::new(self.title.trim(), parse_date(&self.date)?);
        draft.metadata.event_type = self.event_type.trim().to_string();
        draft.metadata.is_private = self.private;
        draft.metadata.location = self.location.to_location()?;
        draft.attendees = self.attendees.clone();
        Ok(draft)
    }
}

#[derive(Debug, Serialize)]
struct SpaceRetrosReport {
    space_id: String,
    count: usize,
    retros: Vec<RetroRow>,
    #[serde(skip)]
    source: Vec<Retrospective>,
}

/// Execute `retro space <subcommand>`.
///
/// # Errors
///
/// Returns an error for unknown codes, for spaces you do not own, or when
/// no unused code can be drawn.
pub fn run_space(args: &SpaceArgs, state: &mut AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?.to_string();
    match &args.command {
        SpaceCommand::Create(create) => {
            let mut rng = rand::thread_rng();
            let space = feedback::create_feedback_space(
                &state.conn,
                &mut rng,
                &user,
                &create.title,
                create.description.as_deref(),
                state.config.feedback.code_length,
            )?;
            render_mode(
                output,
                &space,
                |s, w| writeln!(w, "{}\t{}\t{}", s.id, s.code, s.title),
                |s, w| {
                    writeln!(w, "✓ Opened feedback space \"{}\"", s.title)?;
                    writeln!(w, "  Code: {}", s.code)?;
                    writeln!(w, "  Share it: retro space submit {} --title ...", s.code)
                },
            )
        }
        SpaceCommand::List => {
            let spaces = feedback::list_feedback_spaces(&state.conn, &user)?;
            render_mode(
                output,
                &spaces,
                |spaces, w| {
                    for s in spaces {
                        writeln!(w, "{}\t{}\t{}", s.id, s.code, s.title)?;
                    }
                    Ok(())
                },
                |spaces, w| {
                    if spaces.is_empty() {
                        return writeln!(w, "No feedback spaces yet.");
                    }
                    pretty_section(w, &format!("Feedback spaces ({})", spaces.len()))?;
                    for s in spaces {
                        writeln!(w, "  {}  {}  {}", short_id(&s.id), s.code, s.title)?;
                    }
                    Ok(())
                },
            )
        }
        SpaceCommand::Show(target) => {
            let found = feedback::get_feedback_space_by_code(&state.conn, &target.code)?;
            let space = found.ok_or_else(|| RetroError::NotFound {
                kind: "feedback space",
                id: target.code.trim().to_ascii_uppercase(),
            })?;
            render_mode(
                output,
                &space,
                |s, w| writeln!(w, "{}\t{}\t{}\t{}", s.id, s.code, s.title, s.owner),
                |s, w| {
                    pretty_section(w, &s.title)?;
                    pretty_kv(w, "Code", &s.code)?;
                    pretty_kv(w, "Owner", &s.owner)?;
                    if let Some(description) = &s.description {
                        pretty_kv(w, "About", description)?;
                    }
                    Ok(())
                },
            )
        }
        SpaceCommand::Submit(submit) => {
            let draft = submit.to_draft()?;
            let retro =
                feedback::submit_via_feedback_space(&mut state.conn, &user, &submit.code, &draft)?;
            let code = submit.code.trim();
            render_mode(
                output,
                &retro,
                |r, w| writeln!(w, "{}\t{}\t{}", r.id, r.date, r.title),
                |r, w| writeln!(w, "✓ Submitted {} \"{}\" to {code}", short_id(&r.id), r.title),
            )
        }
        SpaceCommand::Retros(target) => {
            let space_id = resolve(state, IdKind::Space, &target.space)?;
            let found = feedback::list_space_retros(&state.conn, &user, &space_id)?;
            let report = SpaceRetrosReport {
                space_id,
                count: found.len(),
                retros: found.iter().map(RetroRow::from).collect(),
                source: found,
            };
            render_mode(
                output,
                &report,
                |r, w| write_rows_text(&r.retros, w),
                |r, w| {
                    if r.source.is_empty() {
                        return writeln!(w, "Nothing submitted to {} yet.", short_id(&r.space_id));
                    }
                    pretty_section(w, &format!("Submissions ({})", r.count))?;
                    write_tree_pretty(&r.source, w)
                },
            )
        }
    }
}
