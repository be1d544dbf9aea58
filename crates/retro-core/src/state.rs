//! Application state for one session against one journal.
//!
//! [`AppState`] owns the store connection, the project config and the
//! acting identity. It is built once at start-up, passed by reference to
//! every command, and dropped (or [`AppState::sign_out`]) at exit.

use anyhow::Context;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::config::{ProjectConfig, load_project_config};
use crate::db;
use crate::error::{Result, RetroError};

/// Directory holding the store and config inside a journal root.
pub const RETRO_DIR: &str = ".retro";
/// Store file name inside [`RETRO_DIR`].
pub const DB_FILE: &str = "retro.sqlite3";

#[derive(Debug)]
pub struct AppState {
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub conn: Connection,
    user: Option<String>,
}

impl AppState {
    /// Open the journal rooted at `root` as `user`.
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::NotInitialized`] when there is no usable store,
    /// or [`RetroError::Config`] for a malformed config file.
    pub fn open(root: &Path, user: Option<String>) -> Result<Self> {
        let config = load_project_config(root).map_err(|e| RetroError::Config {
            path: root.join(RETRO_DIR).join("config.toml").display().to_string(),
            reason: format!("{e:#}"),
        })?;
        let db_path = db_path(root);
        let conn = db::try_open_store(&db_path)?.ok_or_else(|| RetroError::NotInitialized {
            path: root.display().to_string(),
        })?;
        let user = user.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        tracing::debug!(root = %root.display(), user = ?user, "opened journal");
        Ok(Self {
            root: root.to_path_buf(),
            config,
            conn,
            user,
        })
    }

    /// Open an in-memory journal with default config. Used by tests.
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::Db`] if the schema cannot be created.
    pub fn in_memory(user: Option<String>) -> Result<Self> {
        Ok(Self {
            root: PathBuf::new(),
            config: ProjectConfig::default(),
            conn: db::open_in_memory()?,
            user,
        })
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The acting identity, required by every mutating command.
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::IdentityRequired`] when none was resolved.
    pub fn require_user(&self) -> Result<&str> {
        self.user().ok_or(RetroError::IdentityRequired)
    }

    /// Forget the identity and close the store.
    ///
    /// # Errors
    ///
    /// Returns [`RetroError::Db`] if `SQLite` refuses to close cleanly.
    pub fn sign_out(self) -> Result<()> {
        let Self { conn, user, .. } = self;
        conn.close()
            .map_err(|(_, e)| anyhow::Error::from(e))
            .context("close store")?;
        tracing::debug!(user = ?user, "signed out");
        Ok(())
    }
}

/// Path of the store file under `root`.
#[must_use]
pub fn db_path(root: &Path) -> PathBuf {
    root.join(RETRO_DIR).join(DB_FILE)
}

/// Walk up from `start` to the nearest directory containing [`RETRO_DIR`].
#[must_use]
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(RETRO_DIR).is_dir())
        .map(Path::to_path_buf)
}

/// Create `.retro/` with a migrated store and a default config file.
/// Returns `false` when a journal already existed (nothing is overwritten).
///
/// # Errors
///
/// Returns [`RetroError::Db`] on I/O or store failures.
pub fn init_project(root: &Path) -> Result<bool> {
    let dir = root.join(RETRO_DIR);
    let existed = db_path(root).exists();
    std::fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;

    let conn = db::open_store(&db_path(root))?;
    drop(conn);

    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        let body =
            toml::to_string_pretty(&ProjectConfig::default()).context("render default config")?;
        std::fs::write(&config_path, body)
            .with_context(|| format!("write {}", config_path.display()))?;
    }
    tracing::info!(root = %root.display(), fresh = !existed, "initialized journal");
    Ok(!existed)
}
