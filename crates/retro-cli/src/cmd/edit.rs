//! `retro edit`: overwrite a retrospective's metadata (owner only).
//!
//! The edit is applied locally first and then written; the rendered result
//! is whatever the store confirms.

use crate::cmd::create::LocationArgs;
use crate::cmd::resolve;
use crate::output::{OutputMode, render_mode, short_id};
use crate::validate::parse_date;
use clap::Args;
use retro_core::db::access::require_visible;
use retro_core::db::mutate;
use retro_core::db::query::{self, IdKind};
use retro_core::model::Retrospective;
use retro_core::model::draft::RetroMetadata;
use retro_core::optimistic::{Optimistic, Outcome};
use retro_core::state::AppState;
use retro_core::RetroError;

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub event_type: Option<String>,

    /// New date: YYYY-MM-DD, today or yesterday.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Make private.
    #[arg(long, conflicts_with = "public")]
    pub private: bool,

    /// Make public.
    #[arg(long)]
    pub public: bool,

    /// Primary photo URL; pass an empty string to clear.
    #[arg(long)]
    pub photo: Option<String>,

    /// Remove the location entirely.
    #[arg(long, conflicts_with_all = ["place", "city", "state", "country", "lat", "lng"])]
    pub clear_location: bool,

    #[command(flatten)]
    pub location: LocationArgs,
}

impl EditArgs {
    /// Current metadata with the given flags applied on top.
    fn apply(&self, current: &Retrospective) -> anyhow::Result<RetroMetadata> {
        let mut meta = RetroMetadata {
            title: current.title.clone(),
            event_type: current.event_type.clone(),
            date: current.date,
            location: current.location.clone(),
            is_private: current.is_private,
            primary_photo_url: current.primary_photo_url.clone(),
        };
        if let Some(title) = &self.title {
            meta.title = title.trim().to_string();
        }
        if let Some(event_type) = &self.event_type {
            meta.event_type = event_type.trim().to_string();
        }
        if let Some(date) = &self.date {
            meta.date = parse_date(date)?;
        }
        if self.private {
            meta.is_private = true;
        } else if self.public {
            meta.is_private = false;
        }
        if let Some(photo) = &self.photo {
            meta.primary_photo_url = Some(photo.trim().to_string()).filter(|p| !p.is_empty());
        }
        if self.clear_location {
            meta.location = None;
        } else if let Some(given) = self.location.to_location()? {
            let mut merged = meta.location.take().unwrap_or_default();
            merged.name = given.name.or(merged.name);
            merged.city = given.city.or(merged.city);
            merged.state = given.state.or(merged.state);
            merged.country = given.country.or(merged.country);
            if given.lat.is_some() {
                merged.lat = given.lat;
                merged.lng = given.lng;
            }
            meta.location = Some(merged);
        }
        Ok(meta)
    }
}

fn apply_metadata(retro: &mut Retrospective, meta: &RetroMetadata) {
    retro.title.clone_from(&meta.title);
    retro.event_type.clone_from(&meta.event_type);
    retro.date = meta.date;
    retro.location.clone_from(&meta.location);
    retro.is_private = meta.is_private;
    retro.primary_photo_url.clone_from(&meta.primary_photo_url);
}

/// Execute `retro edit`.
///
/// # Errors
///
/// Returns an error without an identity, when you do not own the
/// retrospective, or for invalid input.
pub fn run_edit(args: &EditArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let user = state.require_user()?;
    let id = resolve(state, IdKind::Retro, &args.id)?;
    require_visible(&state.conn, &id, Some(user))?;
    let current = query::get_retro(&state.conn, &id)?.ok_or_else(|| RetroError::NotFound {
        kind: "retrospective",
        id: id.clone(),
    })?;
    let meta = args.apply(&current)?;

    let mut view = Optimistic::new(current);
    let local = meta.clone();
    let patch = view.apply_local("edit metadata", move |r| apply_metadata(r, &local));

    if let Err(err) = mutate::update_retro_metadata(&state.conn, user, &id, &meta) {
        view.reconcile(patch, Outcome::Rejected);
        return Err(err.into());
    }
    let outcome = query::get_retro(&state.conn, &id)?.map_or(Outcome::Rejected, Outcome::Confirmed);
    view.reconcile(patch, outcome);
    tracing::debug!(id = %id, pending = view.has_pending(), "metadata edit settled");

    render_mode(
        output,
        view.confirmed(),
        |r, w| writeln!(w, "{}\t{}\t{}", r.id, r.date, r.title),
        |r, w| {
            writeln!(w, "✓ Updated {} \"{}\" ({})", short_id(&r.id), r.title, r.date)?;
            if r.is_private {
                writeln!(w, "  Visible to you and attendees only.")?;
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::Parser;
    use retro_core::model::Location;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: EditArgs,
    }

    fn current() -> Retrospective {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
        let mut r = Retrospective::new("r1", "ana", "Old title", date);
        r.location = Some(Location {
            city: Some("Austin".into()),
            state: Some("TX".into()),
            ..Location::default()
        });
        r
    }

    #[test]
    fn unspecified_fields_are_kept() {
        let w = Wrapper::parse_from(["test", "r1", "--title", "New title"]);
        let meta = w.args.apply(&current()).expect("apply");
        assert_eq!(meta.title, "New title");
        assert_eq!(meta.date, current().date);
        assert_eq!(meta.location, current().location);
        assert!(!meta.is_private);
    }

    #[test]
    fn location_flags_merge_into_existing() {
        let w = Wrapper::parse_from(["test", "r1", "--place", "Zilker Park", "--private"]);
        let meta = w.args.apply(&current()).expect("apply");
        let location = meta.location.expect("location");
        assert_eq!(location.name.as_deref(), Some("Zilker Park"));
        assert_eq!(location.city.as_deref(), Some("Austin"));
        assert!(meta.is_private);
    }

    #[test]
    fn clear_location_removes_it() {
        let w = Wrapper::parse_from(["test", "r1", "--clear-location"]);
        assert!(w.args.apply(&current()).expect("apply").location.is_none());
    }

    #[test]
    fn private_and_public_conflict() {
        assert!(Wrapper::try_parse_from(["test", "r1", "--private", "--public"]).is_err());
    }

    #[test]
    fn local_edit_matches_metadata() {
        let mut r = current();
        let mut meta = RetroMetadata::new("Renamed", r.date);
        meta.is_private = true;
        apply_metadata(&mut r, &meta);
        assert_eq!(r.title, "Renamed");
        assert!(r.is_private);
        assert!(r.location.is_none());
    }
}
