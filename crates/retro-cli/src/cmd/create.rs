//! `retro create`: record a new retrospective.

use crate::cmd::resolve;
use crate::output::{OutputMode, render_mode, short_id};
use crate::validate::{parse_date, validate_coordinates};
use clap::Args;
use retro_core::db::mutate;
use retro_core::db::query::IdKind;
use retro_core::model::Location;
use retro_core::model::draft::RetroDraft;
use retro_core::state::AppState;

/// Where it happened. Shared by `create`, `edit` and `space submit`.
#[derive(Args, Debug, Default, Clone)]
pub struct LocationArgs {
    /// Place name (venue, park, restaurant).
    #[arg(long)]
    pub place: Option<String>,

    #[arg(long)]
    pub city: Option<String>,

    /// State or region.
    #[arg(long)]
    pub state: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,
}

impl LocationArgs {
    /// The location these flags describe, or `None` when none were given.
    pub fn to_location(&self) -> anyhow::Result<Option<Location>> {
        validate_coordinates(self.lat, self.lng)?;
        let location = Location {
            name: self.place.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            lat: self.lat,
            lng: self.lng,
        };
        Ok((!location.is_empty()).then_some(location))
    }
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Title of the retrospective.
    #[arg(short, long)]
    pub title: String,

    /// Free-form kind of event: trip, dinner, conference...
    #[arg(short, long, default_value = "")]
    pub event_type: String,

    /// Event date: YYYY-MM-DD, today or yesterday.
    #[arg(short, long, default_value = "today")]
    pub date: String,

    /// Parent retrospective ID (makes this a day or stop within it).
    #[arg(long)]
    pub parent: Option<String>,

    /// Hide from everyone except you and the attendees.
    #[arg(long)]
    pub private: bool,

    /// Tag an attendee by name (repeatable).
    #[arg(short, long = "attendee")]
    pub attendees: Vec<String>,

    /// Primary photo URL.
    #[arg(long)]
    pub photo: Option<String>,

    #[command(flatten)]
    pub location: LocationArgs,
}

impl CreateArgs {
    /// Build a draft from the flags. `parent_id` must already be resolved.
    pub fn to_draft(&self, parent_id: Option<String>) -> anyhow::Result<RetroDraft> {
        let mut draft = RetroDraft::new(self.title.trim(), parse_date(&self.date)?);
        draft.metadata.event_type = self.event_type.trim().to_string();
        draft.metadata.is_private = self.private;
        draft.metadata.location = self.location.to_location()?;
        draft.metadata.primary_photo_url = self.photo.clone();
        draft.parent_id = parent_id;
        draft.attendees = self.attendees.clone();
        Ok(draft)
    }
}

/// Execute `retro create`.
///
/// # Errors
///
/// Returns an error without an identity, for invalid input, or when the
/// parent cannot be resolved or is not yours to extend.
pub fn run_create(
    args: &CreateArgs,
    state: &mut AppState,
    output: OutputMode,
) -> anyhow::Result<()> {
    let user = state.require_user()?.to_string();
    let parent_id = args
        .parent
        .as_deref()
        .map(|raw| resolve(state, IdKind::Retro, raw))
        .transpose()?;
    let draft = args.to_draft(parent_id)?;
    let retro = mutate::create_retro(&mut state.conn, &user, &draft)?;

    render_mode(
        output,
        &retro,
        |r, w| writeln!(w, "{}\t{}\t{}", r.id, r.date, r.title),
        |r, w| {
            let kind = if r.parent_id.is_some() { "child retrospective" } else { "retrospective" };
            writeln!(w, "✓ Created {kind} {} \"{}\" ({})", short_id(&r.id), r.title, r.date)?;
            if !r.attendees.is_empty() {
                let names: Vec<&str> = r.attendees.iter().map(|a| a.name.as_str()).collect();
                writeln!(w, "  Attendees: {}", names.join(", "))?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CreateArgs,
    }

    #[test]
    fn create_args_defaults() {
        let w = Wrapper::parse_from(["test", "--title", "Hello"]);
        assert_eq!(w.args.title, "Hello");
        assert_eq!(w.args.date, "today");
        assert!(w.args.parent.is_none());
        assert!(!w.args.private);
        assert!(w.args.attendees.is_empty());
    }

    #[test]
    fn draft_carries_location_and_attendees() {
        let w = Wrapper::parse_from([
            "test", "--title", " Lisbon ", "--date", "2024-05-01", "--city", "Lisbon",
            "--country", "PT",
            "-a", "Rui", "-a", "Ana", "--private",
        ]);
        let draft = w.args.to_draft(None).expect("draft");
        assert_eq!(draft.metadata.title, "Lisbon");
        assert!(draft.metadata.is_private);
        assert_eq!(draft.attendees, vec!["Rui", "Ana"]);
        let location = draft.metadata.location.expect("location");
        assert_eq!(location.city.as_deref(), Some("Lisbon"));
        assert_eq!(location.country.as_deref(), Some("PT"));
    }

    #[test]
    fn no_location_flags_means_no_location() {
        let w = Wrapper::parse_from(["test", "--title", "x", "--date", "2024-05-01"]);
        assert!(w.args.to_draft(None).expect("draft").metadata.location.is_none());
    }

    #[test]
    fn negative_coordinates_parse() {
        let w = Wrapper::parse_from(["test", "--title", "x", "--lat", "-33.9", "--lng", "18.4"]);
        assert!(w.args.location.lat.is_some_and(|lat| (lat + 33.9).abs() < 1e-9));
    }
}
