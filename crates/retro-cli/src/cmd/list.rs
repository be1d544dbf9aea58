//! `retro list`: search retrospectives visible to you.

use crate::output::{OutputMode, pretty_section, render_mode, short_id, truncate};
use clap::Args;
use retro_core::filter::{RetroCriteria, search};
use retro_core::graph::split_parents_and_children;
use retro_core::model::Retrospective;
use retro_core::state::AppState;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{self, Write};

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Whitespace-separated words; every word must appear somewhere.
    #[arg(short, long)]
    pub keywords: Option<String>,

    /// Comma-separated tag fragments; every fragment must match an item tag.
    #[arg(short, long)]
    pub tags: Option<String>,

    /// Attendee name fragment.
    #[arg(short, long)]
    pub attendee: Option<String>,

    /// "city, state" (either half may be omitted).
    #[arg(short, long)]
    pub location: Option<String>,

    /// Only top-level retrospectives.
    #[arg(long)]
    pub roots: bool,

    /// Maximum rows to show.
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

impl ListArgs {
    fn criteria(&self) -> RetroCriteria {
        RetroCriteria {
            keywords: self.keywords.clone(),
            tags: self.tags.clone(),
            user: self.attendee.clone(),
            location: self.location.clone(),
        }
    }
}

/// One row of list output.
#[derive(Debug, Serialize)]
pub struct RetroRow {
    pub id: String,
    pub title: String,
    pub date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub owner: String,
    pub attendees: Vec<String>,
    pub items: usize,
    pub is_private: bool,
}

impl From<&Retrospective> for RetroRow {
    fn from(r: &Retrospective) -> Self {
        Self {
            id: r.id.clone(),
            title: r.title.clone(),
            date: r.date.to_string(),
            event_type: r.event_type.clone(),
            parent_id: r.parent_id.clone(),
            location: r.location.as_ref().map(ToString::to_string).filter(|s| !s.is_empty()),
            owner: r.owner.clone(),
            attendees: r.attendees.iter().map(|a| a.name.clone()).collect(),
            items: r.item_count(),
            is_private: r.is_private,
        }
    }
}

#[derive(Debug, Serialize)]
struct ListReport {
    count: usize,
    retros: Vec<RetroRow>,
    #[serde(skip)]
    source: Vec<Retrospective>,
}

/// Tab-separated rows: id, date, title, parent.
pub fn write_rows_text(rows: &[RetroRow], w: &mut dyn Write) -> io::Result<()> {
    for row in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            row.id,
            row.date,
            row.title,
            row.parent_id.as_deref().unwrap_or("-")
        )?;
    }
    Ok(())
}

fn write_row_pretty(w: &mut dyn Write, r: &Retrospective, indent: &str) -> io::Result<()> {
    let lock = if r.is_private { " [private]" } else { "" };
    let location = r
        .location
        .as_ref()
        .map(ToString::to_string)
        .filter(|s| !s.is_empty())
        .map(|s| format!("  @ {s}"))
        .unwrap_or_default();
    writeln!(
        w,
        "{indent}{}  {}  {}{lock}{location}  ({} items)",
        short_id(&r.id),
        r.date,
        truncate(&r.title, 40),
        r.item_count()
    )
}

/// Parents first with their children indented beneath; children whose
/// parent is not in the list are grouped at the end.
pub fn write_tree_pretty(retros: &[Retrospective], w: &mut dyn Write) -> io::Result<()> {
    let split = split_parents_and_children(retros);
    let shown: HashSet<&str> = split.parents.iter().map(|p| p.id.as_str()).collect();

    for parent in &split.parents {
        write_row_pretty(w, parent, "")?;
        for child in split.children_of(&parent.id) {
            write_row_pretty(w, child, "  └ ")?;
        }
    }

    let mut orphans = split
        .children_by_parent
        .iter()
        .filter(|(parent_id, _)| !shown.contains(parent_id.as_str()))
        .peekable();
    if orphans.peek().is_some() {
        writeln!(w)?;
        writeln!(w, "Within other retrospectives:")?;
        for (parent_id, children) in orphans {
            for child in children {
                write_row_pretty(w, child, &format!("  {} › ", short_id(parent_id)))?;
            }
        }
    }
    Ok(())
}

/// Execute `retro list`.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn run_list(args: &ListArgs, state: &AppState, output: OutputMode) -> anyhow::Result<()> {
    let mut found = search(&state.conn, state.user(), &args.criteria(), args.roots)?;
    if let Some(limit) = args.limit {
        found.truncate(limit);
    }

    let report = ListReport {
        count: found.len(),
        retros: found.iter().map(RetroRow::from).collect(),
        source: found,
    };

    render_mode(
        output,
        &report,
        |report, w| write_rows_text(&report.retros, w),
        |report, w| {
            if report.source.is_empty() {
                return writeln!(w, "No retrospectives match.");
            }
            pretty_section(w, &format!("Retrospectives ({})", report.count))?;
            write_tree_pretty(&report.source, w)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn retro(id: &str, parent: Option<&str>) -> Retrospective {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).expect("date");
        let mut r = Retrospective::new(id, "ana", format!("Retro {id}"), date);
        r.parent_id = parent.map(str::to_string);
        r
    }

    #[test]
    fn list_args_map_to_criteria() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ListArgs,
        }
        let w = Wrapper::parse_from(["test", "-k", "beach day", "-a", "ben", "-l", "Austin, TX"]);
        let criteria = w.args.criteria();
        assert_eq!(criteria.keyword_tokens(), vec!["beach", "day"]);
        assert_eq!(criteria.user.as_deref(), Some("ben"));
        assert!(criteria.location_query().is_some());
        assert!(!w.args.roots);
    }

    #[test]
    fn tree_groups_children_under_parents() {
        let retros = vec![
            retro("aaaa0001", None),
            retro("bbbb0002", Some("aaaa0001")),
            retro("cccc0003", Some("zzzz9999")),
        ];
        let mut buf = Vec::new();
        write_tree_pretty(&retros, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("aaaa0001"));
        assert!(lines[1].starts_with("  └ bbbb0002"));
        assert!(text.contains("Within other retrospectives:"));
        assert!(text.contains("zzzz9999 › cccc0003"));
    }

    #[test]
    fn text_rows_are_tab_separated() {
        let rows = vec![RetroRow::from(&retro("r1", Some("p1")))];
        let mut buf = Vec::new();
        write_rows_text(&rows, &mut buf).expect("render");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "r1\t2024-05-01\tRetro r1\tp1\n");
    }
}
