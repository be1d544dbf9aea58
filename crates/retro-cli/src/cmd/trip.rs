//! `retro trip`: private itineraries, optionally seeded from catalogues.

use crate::cmd::resolve;
use crate::output::{
    OutputMode, pretty_section, render, render_mode, render_success, short_id, truncate,
};
use crate::validate::parse_datetime;
use clap::{Args, Subcommand};
use retro_core::db::query::IdKind;
use retro_core::db::trip::{self, TripItemDraft};
use retro_core::model::trip::{TripPlanner, TripPlannerItem, TripStatus};
use retro_core::state::AppState;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct TripArgs {
    #[command(subcommand)]
    pub command: TripCommand,
}

#[derive(Subcommand, Debug)]
pub enum TripCommand {
    #[command(
        about = "Start a trip planner",
        after_help = "EXAMPLES:\n    retro trip create \"Hill Country weekend\" --destination \"Fredericksburg, TX\""
    )]
    Create(TripCreateArgs),

    #[command(about = "List your trips")]
    List,

    #[command(
        about = "Add an entry to a trip",
        after_help = "EXAMPLES:\n    retro trip add 51ad \"Dinner at Otto's\" --starts \"2024-06-01 19:30\" --status booked\n\n    # Copy a catalogue entry in\n    retro trip add 51ad --from-entry c0de"
    )]
    Add(TripAddArgs),

    #[command(about = "Set the booking status of an entry")]
    Status(TripStatusArgs),

    #[command(about = "List a trip's entries, earliest first")]
    Items(TripIdArg),

    #[command(about = "Remove an entry")]
    Remove(TripItemArg),

    #[command(about = "Delete a trip and its entries")]
    Delete(TripIdArg),
}

#[derive(Args, Debug)]
pub struct TripCreateArgs {
    pub name: String,

    #[arg(long)]
    pub destination: Option<String>,
}

#[derive(Args, Debug)]
pub struct TripIdArg {
    /// Trip ID or unique prefix.
    pub trip: String,
}

#[derive(Args, Debug)]
pub struct TripItemArg {
    /// Trip entry ID or unique prefix.
    pub item: String,
}

#[derive(Args, Debug)]
pub struct TripAddArgs {
    /// Trip ID or unique prefix.
    pub trip: String,

    /// Entry title. Omit with --from-entry to use the saved text.
    #[arg(required_unless_present = "from_entry")]
    pub title: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    /// Start time: "YYYY-MM-DD HH:MM".
    #[arg(long)]
    pub starts: Option<String>,

    /// End time: "YYYY-MM-DD HH:MM".
    #[arg(long)]
    pub ends: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    /// booked, pending_review or declined.
    #[arg(long, default_value = "pending_review")]
    pub status: TripStatus,

    /// Copy this catalogue entry in instead.
    #[arg(long, conflicts_with_all = ["title", "location", "starts", "ends", "notes"])]
    pub from_entry: Option<String>,
}

impl TripAddArgs {
    fn to_draft(&self) -> anyhow::Result<TripItemDraft> {
        let mut draft = TripItemDraft::new(self.title.as_deref().unwrap_or_default().trim());
        draft.location = self.location.clone();
        draft.starts_at = self.starts.as_deref().map(parse_datetime).transpose()?;
        draft.ends_at = self.ends.as_deref().map(parse_datetime).transpose()?;
        draft.notes = self.notes.clone();
        draft.status = self.status;
        Ok(draft)
    }
}

#[derive(Args, Debug)]
pub struct TripStatusArgs {
    /// Trip entry ID or unique prefix.
    pub item: String,

    /// booked, pending_review or declined.
    pub status: TripStatus,
}

#[derive(Debug, Serialize)]
struct ItemsReport {
    trip: TripPlanner,
    count: usize,
    items: Vec<TripPlannerItem>,
}

fn status_marker(status: TripStatus) -> &'static str {
    match status {
        TripStatus::Booked => "✓",
        TripStatus::PendingReview => "?",
        TripStatus::Declined => "✗",
    }
}

fn write_item(w: &mut dyn Write, item: &TripPlannerItem) -> io::Result<()> {
    let when = match (item.starts_at, item.ends_at) {
        (Some(start), Some(end)) => {
            format!("{} → {}", start.format("%Y-%m-%d %H:%M"), end.format("%H:%M"))
        }
        (Some(start), None) => start.format("%Y-%m-%d %H:%M").to_string(),
        _ => "unscheduled".to_string(),
    };
    let location = item.location.as_deref().map(|l| format!("  @ {l}")).unwrap_or_default();
    writeln!(
        w,
        "  {} {}  {:<16}  {}{location}",
        status_marker(item.status),
        short_id(&item.id),
        when,
        truncate(&item.title, 40)
    )
}

/// Execute `retro trip <subcommand>`.
///
/// # Errors
///
/// Returns an error for invalid input or for trips that are not yours.
pub fn run_trip(args: &TripArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    match &args.command {
        TripCommand::Create(create) => {
            let destination = create.destination.as_deref();
            let created = trip::create_trip(&state.conn, user, &create.name, destination)?;
            render_mode(
                output,
                &created,
                |t, w| writeln!(w, "{}\t{}", t.id, t.name),
                |t, w| writeln!(w, "✓ Created trip {} \"{}\"", short_id(&t.id), t.name),
            )
        }
        TripCommand::List => {
            let trips = trip::list_trips(&state.conn, user)?;
            render_mode(
                output,
                &trips,
                |trips, w| {
                    for t in trips {
                        let destination = t.destination.as_deref().unwrap_or("-");
                        writeln!(w, "{}\t{}\t{destination}", t.id, t.name)?;
                    }
                    Ok(())
                },
                |trips, w| {
                    if trips.is_empty() {
                        return writeln!(w, "No trips yet.");
                    }
                    pretty_section(w, &format!("Trips ({})", trips.len()))?;
                    for t in trips {
                        let destination = t
                            .destination
                            .as_deref()
                            .map(|d| format!("  → {d}"))
                            .unwrap_or_default();
                        writeln!(w, "  {}  {}{destination}", short_id(&t.id), t.name)?;
                    }
                    Ok(())
                },
            )
        }
        TripCommand::Add(add) => {
            let trip_id = resolve(state, IdKind::Trip, &add.trip)?;
            let item = match &add.from_entry {
                Some(raw) => {
                    let entry_id = resolve(state, IdKind::CatalogueEntry, raw)?;
                    let conn = &state.conn;
                    trip::add_trip_item_from_catalogue(conn, user, &trip_id, &entry_id, add.status)?
                }
                None => trip::add_trip_item(&state.conn, user, &trip_id, &add.to_draft()?)?,
            };
            render(output, &item, |i, w| {
                writeln!(w, "✓ Added {} \"{}\" ({})", short_id(&i.id), i.title, i.status)
            })
        }
        TripCommand::Status(change) => {
            let item_id = resolve(state, IdKind::TripItem, &change.item)?;
            trip::set_trip_item_status(&state.conn, user, &item_id, change.status)?;
            render_success(output, &format!("{} is now {}", short_id(&item_id), change.status))
        }
        TripCommand::Items(target) => {
            let trip_id = resolve(state, IdKind::Trip, &target.trip)?;
            let items = trip::list_trip_items(&state.conn, user, &trip_id)?;
            let planner = trip::get_trip(&state.conn, &trip_id)?.ok_or_else(|| {
                retro_core::RetroError::NotFound {
                    kind: "trip",
                    id: trip_id.clone(),
                }
            })?;
            let report = ItemsReport {
                trip: planner,
                count: items.len(),
                items,
            };
            render_mode(
                output,
                &report,
                |r, w| {
                    for i in &r.items {
                        let starts = i.starts_at.map(|s| s.to_string()).unwrap_or_default();
                        writeln!(w, "{}\t{}\t{}\t{starts}", i.id, i.status, i.title)?;
                    }
                    Ok(())
                },
                |r, w| {
                    pretty_section(w, &format!("{} ({})", r.trip.name, r.count))?;
                    if r.items.is_empty() {
                        return writeln!(w, "  Nothing planned yet.");
                    }
                    for i in &r.items {
                        write_item(w, i)?;
                    }
                    Ok(())
                },
            )
        }
        TripCommand::Remove(target) => {
            let item_id = resolve(state, IdKind::TripItem, &target.item)?;
            trip::delete_trip_item(&state.conn, user, &item_id)?;
            render_success(output, &format!("Removed {}", short_id(&item_id)))
        }
        TripCommand::Delete(target) => {
            let trip_id = resolve(state, IdKind::Trip, &target.trip)?;
            trip::delete_trip(&state.conn, user, &trip_id)?;
            render_success(output, &format!("Deleted trip {}", short_id(&trip_id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(subcommand)]
        command: TripCommand,
    }

    fn add_args(argv: &[&str]) -> TripAddArgs {
        let mut full = vec!["test", "add"];
        full.extend_from_slice(argv);
        match Wrapper::parse_from(full).command {
            TripCommand::Add(add) => add,
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn add_builds_draft_with_times() {
        let add = add_args(&["t1", "Dinner", "--starts", "2024-06-01 19:30", "--status", "booked"]);
        let draft = add.to_draft().expect("draft");
        assert_eq!(draft.title, "Dinner");
        assert_eq!(draft.status, TripStatus::Booked);
        assert_eq!(draft.starts_at.map(|s| s.to_string()).as_deref(), Some("2024-06-01 19:30:00"));
        assert!(draft.ends_at.is_none());
    }

    #[test]
    fn status_defaults_to_pending_review() {
        let add = add_args(&["t1", "Museum"]);
        assert_eq!(add.status, TripStatus::PendingReview);
    }

    #[test]
    fn from_entry_needs_no_title() {
        let add = add_args(&["t1", "--from-entry", "c0de"]);
        assert!(add.title.is_none());
        assert_eq!(add.from_entry.as_deref(), Some("c0de"));
    }

    #[test]
    fn title_or_entry_required() {
        assert!(Wrapper::try_parse_from(["test", "add", "t1"]).is_err());
    }

    #[test]
    fn bad_datetime_is_rejected() {
        let add = add_args(&["t1", "Dinner", "--starts", "tonight"]);
        assert!(add.to_draft().is_err());
    }
}
