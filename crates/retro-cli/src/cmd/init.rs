use crate::output::{OutputMode, render};
use anyhow::Result;
use retro_core::state::{RETRO_DIR, db_path, init_project};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct InitReport {
    ok: bool,
    root: String,
    store: String,
    created: bool,
}

/// Execute `retro init`. Creates the journal skeleton:
///
/// ```text
/// .retro/
///   retro.sqlite3   (migrated store)
///   config.toml     (default project config)
/// ```
///
/// Re-running is safe: an existing store and config are left untouched.
///
/// # Errors
///
/// Returns an error if a directory or file cannot be created.
pub fn run_init(project_root: &Path, output: OutputMode) -> Result<()> {
    let created = init_project(project_root)?;
    let report = InitReport {
        ok: true,
        root: project_root.display().to_string(),
        store: db_path(project_root).display().to_string(),
        created,
    };

    render(output, &report, |report, w| {
        if !report.created {
            return writeln!(w, "✓ {RETRO_DIR}/ already initialized; nothing changed.");
        }
        writeln!(w, "✓ Initialized {RETRO_DIR}/ journal.")?;
        writeln!(w)?;
        writeln!(w, "  Store:   {}", report.store)?;
        writeln!(w, "  Config:  {RETRO_DIR}/config.toml")?;
        writeln!(w)?;
        writeln!(w, "Next steps:")?;
        writeln!(w, "  Set your identity (required for changes):")?;
        writeln!(w, "    export RETRO_USER=your-name")?;
        writeln!(w, "  Record your first retrospective:")?;
        writeln!(w, "    retro create --title \"Weekend in Lisbon\" --date today")
    })
}
