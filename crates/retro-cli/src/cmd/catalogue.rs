//! `retro catalogue`: curated collections of roses, buds and thorns.
//!
//! Saving an item copies a snapshot of it; later edits to the source do not
//! reach the catalogue. Members are owner, editor or viewer.

use crate::cmd::resolve;
use crate::output::{
    OutputMode, pretty_section, render, render_mode, render_success, short_id, truncate,
};
use clap::{Args, Subcommand};
use retro_core::db::catalogue;
use retro_core::db::query::IdKind;
use retro_core::model::catalogue::{CatalogueItem, MemberRole};
use retro_core::state::AppState;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct CatalogueArgs {
    #[command(subcommand)]
    pub command: CatalogueCommand,
}

#[derive(Subcommand, Debug)]
pub enum CatalogueCommand {
    #[command(
        about = "Create a catalogue you own",
        after_help = "EXAMPLES:\n    retro catalogue create \"Austin eats\" --description \"Places worth going back to\""
    )]
    Create(CatalogueCreateArgs),

    #[command(about = "List catalogues you belong to")]
    List,

    #[command(
        about = "Save a snapshot of an item into a catalogue",
        after_help = "EXAMPLES:\n    retro catalogue save 7b1c 9c1e"
    )]
    Save(CatalogueSaveArgs),

    #[command(about = "List the entries of a catalogue")]
    Items(CatalogueIdArg),

    #[command(about = "Remove an entry from its catalogue")]
    Remove(CatalogueEntryArg),

    #[command(
        about = "Grant someone access to a catalogue",
        after_help = "EXAMPLES:\n    retro catalogue share 7b1c ben --role editor"
    )]
    Share(CatalogueShareArgs),

    #[command(about = "List the members of a catalogue")]
    Members(CatalogueIdArg),

    #[command(about = "Delete a catalogue and all its entries")]
    Delete(CatalogueIdArg),
}

#[derive(Args, Debug)]
pub struct CatalogueCreateArgs {
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct CatalogueIdArg {
    /// Catalogue ID or unique prefix.
    pub catalogue: String,
}

#[derive(Args, Debug)]
pub struct CatalogueEntryArg {
    /// Catalogue entry ID or unique prefix.
    pub entry: String,
}

#[derive(Args, Debug)]
pub struct CatalogueSaveArgs {
    /// Catalogue ID or unique prefix.
    pub catalogue: String,

    /// Rose, bud or thorn ID to copy in.
    pub item: String,
}

#[derive(Args, Debug)]
pub struct CatalogueShareArgs {
    /// Catalogue ID or unique prefix.
    pub catalogue: String,

    /// User to add.
    pub member: String,

    /// owner, editor or viewer.
    #[arg(long, default_value = "viewer")]
    pub role: MemberRole,
}

#[derive(Debug, Serialize)]
struct ItemsReport {
    catalogue_id: String,
    count: usize,
    items: Vec<CatalogueItem>,
}

fn write_entry(w: &mut dyn Write, entry: &CatalogueItem) -> io::Result<()> {
    let place = entry
        .place_name
        .as_deref()
        .map(|p| format!("  @ {p}"))
        .unwrap_or_default();
    let tags = if entry.tags.is_empty() {
        String::new()
    } else {
        format!("  #{}", entry.tags.join(" #"))
    };
    writeln!(
        w,
        "  {}  {:<5}  {}{tags}{place}",
        short_id(&entry.id),
        entry.category.as_str(),
        truncate(&entry.text, 50)
    )
}

/// Execute `retro catalogue <subcommand>`.
///
/// # Errors
///
/// Returns an error for unknown ids, for catalogues you are not a member
/// of, or when your role does not allow the change.
pub fn run_catalogue(
    args: &CatalogueArgs,
    state: &mut AppState,
    output: OutputMode,
) -> anyhow::Result<()> {
    let user = state.require_user()?.to_string();
    match &args.command {
        CatalogueCommand::Create(create) => {
            let description = create.description.as_deref();
            let created =
                catalogue::create_catalogue(&mut state.conn, &user, &create.name, description)?;
            render_mode(
                output,
                &created,
                |c, w| writeln!(w, "{}\t{}", c.id, c.name),
                |c, w| writeln!(w, "✓ Created catalogue {} \"{}\"", short_id(&c.id), c.name),
            )
        }
        CatalogueCommand::List => {
            let all = catalogue::list_catalogues(&state.conn, &user)?;
            render_mode(
                output,
                &all,
                |all, w| {
                    for c in all {
                        writeln!(w, "{}\t{}\t{}", c.id, c.name, c.owner)?;
                    }
                    Ok(())
                },
                |all, w| {
                    if all.is_empty() {
                        return writeln!(w, "No catalogues yet.");
                    }
                    pretty_section(w, &format!("Catalogues ({})", all.len()))?;
                    for c in all {
                        let description =
                            c.description.as_deref().map(|d| format!("  {d}")).unwrap_or_default();
                        let id = short_id(&c.id);
                        writeln!(w, "  {id}  {}  (owner {}){description}", c.name, c.owner)?;
                    }
                    Ok(())
                },
            )
        }
        CatalogueCommand::Save(save) => {
            let catalogue_id = resolve(state, IdKind::Catalogue, &save.catalogue)?;
            let item_id = resolve(state, IdKind::Item, &save.item)?;
            let entry = catalogue::save_to_catalogue(&state.conn, &user, &catalogue_id, &item_id)?;
            render(output, &entry, |e, w| {
                let text = truncate(&e.text, 40);
                writeln!(w, "✓ Saved {} \"{text}\" as entry {}", e.category, short_id(&e.id))
            })
        }
        CatalogueCommand::Items(target) => {
            let catalogue_id = resolve(state, IdKind::Catalogue, &target.catalogue)?;
            let items = catalogue::list_catalogue_items(&state.conn, &user, &catalogue_id)?;
            let report = ItemsReport {
                catalogue_id,
                count: items.len(),
                items,
            };
            render_mode(
                output,
                &report,
                |r, w| {
                    for e in &r.items {
                        writeln!(w, "{}\t{}\t{}\t{}", e.id, e.category, e.text, e.source_retro_id)?;
                    }
                    Ok(())
                },
                |r, w| {
                    if r.items.is_empty() {
                        return writeln!(w, "Catalogue {} is empty.", short_id(&r.catalogue_id));
                    }
                    pretty_section(w, &format!("Entries ({})", r.count))?;
                    for e in &r.items {
                        write_entry(w, e)?;
                    }
                    Ok(())
                },
            )
        }
        CatalogueCommand::Remove(target) => {
            let entry_id = resolve(state, IdKind::CatalogueEntry, &target.entry)?;
            catalogue::remove_catalogue_item(&state.conn, &user, &entry_id)?;
            render_success(output, &format!("Removed entry {}", short_id(&entry_id)))
        }
        CatalogueCommand::Share(share) => {
            let catalogue_id = resolve(state, IdKind::Catalogue, &share.catalogue)?;
            let member = share.member.trim();
            catalogue::add_catalogue_member(&state.conn, &user, &catalogue_id, member, share.role)?;
            let id = short_id(&catalogue_id);
            render_success(output, &format!("Shared {id} with {member} as {}", share.role))
        }
        CatalogueCommand::Members(target) => {
            let catalogue_id = resolve(state, IdKind::Catalogue, &target.catalogue)?;
            let members = catalogue::list_catalogue_members(&state.conn, &user, &catalogue_id)?;
            render(output, &members, |members, w| {
                for m in members {
                    writeln!(w, "  {:<7} {}", m.role.as_str(), m.user)?;
                }
                Ok(())
            })
        }
        CatalogueCommand::Delete(target) => {
            let catalogue_id = resolve(state, IdKind::Catalogue, &target.catalogue)?;
            catalogue::delete_catalogue(&state.conn, &user, &catalogue_id)?;
            render_success(output, &format!("Deleted catalogue {}", short_id(&catalogue_id)))
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
        command: CatalogueCommand,
    }

    #[test]
    fn share_defaults_to_viewer() {
        let w = Wrapper::parse_from(["test", "share", "abc", "ben"]);
        let CatalogueCommand::Share(share) = w.command else {
            panic!("expected share");
        };
        assert_eq!(share.role, MemberRole::Viewer);
    }

    #[test]
    fn share_rejects_unknown_role() {
        let parsed = Wrapper::try_parse_from(["test", "share", "abc", "ben", "--role", "admin"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn list_takes_no_arguments() {
        assert!(matches!(Wrapper::parse_from(["test", "list"]).command, CatalogueCommand::List));
    }
}
