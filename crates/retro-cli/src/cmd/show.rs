//! `retro show`: display one retrospective with its roses, buds and thorns.
//!
//! By default children's items are folded into the parent (see
//! `[view] merge_children` in `.retro/config.toml`); `--no-merged` shows the
//! parent's own items only. `--tree` adds the full subtree beneath it.

use crate::cmd::resolve;
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode, short_id};
use clap::Args;
use retro_core::aggregate::{RbtView, aggregate_store};
use retro_core::db::access::{load_access, require_visible};
use retro_core::db::query::{self, IdKind, RetroLink};
use retro_core::graph::hierarchy::{get_retro_breadcrumb, get_subtree_ids};
use retro_core::graph::{Crumb, RetroArena};
use retro_core::model::{Category, RbtItem, Retrospective};
use retro_core::state::AppState;
use rusqlite::Connection;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Retrospective ID or unique prefix.
    pub id: String,

    /// Fold children's items into this view.
    #[arg(long, overrides_with = "no_merged")]
    pub merged: bool,

    /// Show only this retrospective's own items.
    #[arg(long, overrides_with = "merged")]
    pub no_merged: bool,

    /// Also print the subtree of child retrospectives.
    #[arg(long)]
    pub tree: bool,
}

impl ShowArgs {
    fn view(&self, config_default: bool) -> RbtView {
        let merge = if self.merged {
            true
        } else if self.no_merged {
            false
        } else {
            config_default
        };
        RbtView::from_toggle(merge)
    }
}

/// A subtree node in `--tree` output.
#[derive(Debug, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Serialize)]
struct RbtLists<'a> {
    roses: &'a [RbtItem],
    buds: &'a [RbtItem],
    thorns: &'a [RbtItem],
}

#[derive(Debug, Serialize)]
struct ShowReport<'a> {
    retro: &'a Retrospective,
    view: RbtView,
    rbt: RbtLists<'a>,
    merged_count: usize,
    breadcrumb: Vec<Crumb>,
    children: Vec<RetroLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tree: Option<TreeNode>,
}

/// Visible subtree of `root_id` as an arena. Hidden private nodes are
/// dropped together with everything beneath them.
fn visible_subtree(
    conn: &Connection,
    root_id: &str,
    viewer: Option<&str>,
) -> anyhow::Result<RetroArena> {
    let mut arena = RetroArena::new();
    for id in get_subtree_ids(conn, root_id)? {
        let Some(link) = query::get_retro_link(conn, &id)? else {
            continue;
        };
        if !load_access(conn, &id)?.is_visible_to(viewer) {
            continue;
        }
        let parent = if id == root_id {
            None
        } else {
            match link.parent_id.as_deref() {
                Some(parent) if arena.contains(parent) => Some(parent),
                _ => continue,
            }
        };
        arena.insert(&link.id, &link.title, parent)?;
    }
    Ok(arena)
}

fn tree_node(arena: &RetroArena, id: &str) -> TreeNode {
    TreeNode {
        id: id.to_string(),
        title: arena.title(id).unwrap_or_default().to_string(),
        children: arena
            .children_of(id)
            .into_iter()
            .map(|child| tree_node(arena, child))
            .collect(),
    }
}

fn write_tree(w: &mut dyn Write, node: &TreeNode, depth: usize) -> io::Result<()> {
    let marker = if depth == 0 { String::new() } else { format!("{}└ ", "  ".repeat(depth - 1)) };
    writeln!(w, "{marker}{}  {}", short_id(&node.id), node.title)?;
    for child in &node.children {
        write_tree(w, child, depth + 1)?;
    }
    Ok(())
}

fn write_items_pretty(w: &mut dyn Write, category: Category, items: &[RbtItem]) -> io::Result<()> {
    writeln!(w)?;
    pretty_section(w, &format!("{} ({})", capitalize(category.plural()), items.len()))?;
    for item in items {
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", item.tags.join(" #"))
        };
        writeln!(w, "  {}  {}{tags}  ({})", short_id(&item.id), item.text, item.owner_name)?;
        for comment in &item.comments {
            writeln!(w, "      ↳ {}: {}", comment.author_name, comment.text)?;
        }
        for photo in &item.photos {
            writeln!(w, "      ▣ {}", photo.url)?;
        }
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn render_show_text(report: &ShowReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    let r = report.retro;
    writeln!(w, "{}\t{}\t{}", r.id, r.date, r.title)?;
    let lists = [
        (Category::Rose, report.rbt.roses),
        (Category::Bud, report.rbt.buds),
        (Category::Thorn, report.rbt.thorns),
    ];
    for (category, items) in lists {
        for item in items {
            writeln!(w, "{category}\t{}\t{}\t{}", item.id, item.text, item.tags.join(","))?;
        }
    }
    for child in &report.children {
        writeln!(w, "child\t{}\t{}", child.id, child.title)?;
    }
    Ok(())
}

fn render_show_human(report: &ShowReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    let r = report.retro;
    if report.breadcrumb.len() > 1 {
        let trail: Vec<&str> = report.breadcrumb.iter().map(|c| c.title.as_str()).collect();
        writeln!(w, "{}", trail.join(" › "))?;
    }
    pretty_section(w, &r.title)?;
    pretty_kv(w, "ID", &r.id)?;
    pretty_kv(w, "Date", r.date.to_string())?;
    if !r.event_type.is_empty() {
        pretty_kv(w, "Type", &r.event_type)?;
    }
    if let Some(location) = r.location.as_ref().map(ToString::to_string).filter(|l| !l.is_empty()) {
        pretty_kv(w, "Where", location)?;
    }
    pretty_kv(w, "Owner", &r.owner)?;
    if !r.attendees.is_empty() {
        let names: Vec<&str> = r.attendees.iter().map(|a| a.name.as_str()).collect();
        pretty_kv(w, "With", names.join(", "))?;
    }
    pretty_kv(w, "Visibility", if r.is_private { "private" } else { "public" })?;
    if report.view == RbtView::Merged && report.merged_count > 0 {
        pretty_kv(w, "Merged", format!("{} items from children", report.merged_count))?;
    }

    write_items_pretty(w, Category::Rose, report.rbt.roses)?;
    write_items_pretty(w, Category::Bud, report.rbt.buds)?;
    write_items_pretty(w, Category::Thorn, report.rbt.thorns)?;

    if !r.photos.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Photos ({})", r.photos.len()))?;
        for photo in &r.photos {
            let caption = photo.caption.as_deref().unwrap_or("");
            let reactions: String = photo.reactions.iter().map(|re| re.emoji.as_str()).collect();
            writeln!(w, "  {}  {}  {caption} {reactions}", short_id(&photo.id), photo.url)?;
        }
    }

    if let Some(tree) = &report.tree {
        writeln!(w)?;
        pretty_section(w, "Tree")?;
        write_tree(w, tree, 0)?;
    } else if !report.children.is_empty() {
        writeln!(w)?;
        pretty_section(w, &format!("Children ({})", report.children.len()))?;
        for child in &report.children {
            writeln!(w, "  {}  {}", short_id(&child.id), child.title)?;
        }
    }
    pretty_rule(w)
}

/// Execute `retro show <id>`.
///
/// # Errors
///
/// Returns an error if the ID does not resolve to a retrospective you can
/// see, or if a store query fails.
pub fn run_show(args: &ShowArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let id = resolve(state, IdKind::Retro, &args.id)?;
    let viewer = state.user();
    require_visible(&state.conn, &id, viewer)?;

    let (retro, merged) = aggregate_store(&state.conn, &id, viewer)?;
    let view = args.view(state.config.view.merge_children);
    let hops = state.config.hierarchy.max_breadcrumb_hops;
    let breadcrumb = get_retro_breadcrumb(&state.conn, &id, viewer, hops)?;
    let children = query::get_children(&state.conn, &id)?
        .into_iter()
        .filter(|child| child.is_visible_to(viewer))
        .map(|child| RetroLink {
            id: child.id,
            title: child.title,
            parent_id: child.parent_id,
        })
        .collect();
    let tree = if args.tree {
        let arena = visible_subtree(&state.conn, &id, viewer)?;
        Some(tree_node(&arena, &id))
    } else {
        None
    };

    let report = ShowReport {
        retro: &retro,
        view,
        rbt: RbtLists {
            roses: merged.view(view, &retro, Category::Rose),
            buds: merged.view(view, &retro, Category::Bud),
            thorns: merged.view(view, &retro, Category::Thorn),
        },
        merged_count: if view == RbtView::Merged { merged.merged_count } else { 0 },
        breadcrumb,
        children,
        tree,
    };

    render_mode(output, &report, render_show_text, render_show_human)
}
