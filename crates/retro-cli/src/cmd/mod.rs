pub mod add;
pub mod attend;
pub mod breadcrumb;
pub mod catalogue;
pub mod comment;
pub mod completions;
pub mod create;
pub mod delete;
pub mod edit;
pub mod init;
pub mod list;
pub mod move_cmd;
pub mod notifications;
pub mod photo;
pub mod show;
pub mod space;
pub mod tag;
pub mod tags;
pub mod trip;

use crate::validate;
use retro_core::RetroError;
use retro_core::db::query::{self, IdKind};
use retro_core::state::{AppState, find_project_root};
use std::path::Path;

/// Open the journal containing `cwd` as `user`.
///
/// # Errors
///
/// Returns [`RetroError::NotInitialized`] when no `.retro/` is found above
/// `cwd`, or the error from [`AppState::open`].
pub fn open_state(cwd: &Path, user: Option<String>) -> anyhow::Result<AppState> {
    let root = find_project_root(cwd).ok_or_else(|| RetroError::NotInitialized {
        path: cwd.display().to_string(),
    })?;
    Ok(AppState::open(&root, user)?)
}

/// Resolve a user-typed full ID or unique prefix, as seen by the acting user.
pub fn resolve(state: &AppState, kind: IdKind, raw: &str) -> anyhow::Result<String> {
    validate::validate_id(kind.label(), raw)?;
    Ok(query::resolve_id(&state.conn, kind, raw, state.user())?)
}
