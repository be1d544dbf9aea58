use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

use crate::graph::MAX_BREADCRUMB_HOPS;
use crate::model::feedback::DEFAULT_CODE_LENGTH;

/// Per-journal settings from `.retro/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Show children's roses, buds and thorns folded into the parent.
    #[serde(default = "default_true")]
    pub merge_children: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            merge_children: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default = "default_max_breadcrumb_hops")]
    pub max_breadcrumb_hops: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            max_breadcrumb_hops: default_max_breadcrumb_hops(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default = "default_code_length")]
    pub code_length: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
        }
    }
}

/// Per-user settings from the platform config directory.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct UserConfig {
    /// Display identity used when no flag or env var names one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `<root>/.retro/config.toml`, or defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(".retro/config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<config_dir>/retro/config.toml`, or defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&config_dir.join("retro/config.toml"))
}

fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Project and user config plus the output mode they resolve to.
///
/// # Errors
///
/// Returns an error if either config file is unreadable or malformed.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// `--json` > `FORMAT` env > user config > pretty on a terminal, text
/// otherwise. Unknown values fall through to the next source.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_max_breadcrumb_hops() -> usize {
    MAX_BREADCRUMB_HOPS
}

const fn default_code_length() -> usize {
    DEFAULT_CODE_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert!(cfg.view.merge_children);
        assert_eq!(cfg.hierarchy.max_breadcrumb_hops, 64);
        assert_eq!(cfg.feedback.code_length, 6);
    }

    #[test]
    fn partial_project_config_fills_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".retro")).expect("mkdir");
        std::fs::write(
            root.path().join(".retro/config.toml"),
            "[view]\nmerge_children = false\n\n[feedback]\ncode_length = 8\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert!(!cfg.view.merge_children);
        assert_eq!(cfg.feedback.code_length, 8);
        assert_eq!(cfg.hierarchy.max_breadcrumb_hops, 64);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(".retro")).expect("mkdir");
        std::fs::write(root.path().join(".retro/config.toml"), "[view\n").expect("write");
        let err = load_project_config(root.path()).expect_err("must fail");
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn user_config_parses_name_and_output() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "name = \"ana\"\noutput = \"json\"\n").expect("write");

        let cfg = load_user_config_from(&path).expect("parse");
        assert_eq!(cfg.name.as_deref(), Some("ana"));
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(
            load_user_config_from(&dir.path().join("missing.toml")).expect("default"),
            UserConfig::default()
        );
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        assert_eq!(resolve_output(true, Some("pretty"), Some("text")), "json");
    }

    #[test]
    fn env_beats_user_config_and_aliases_normalize() {
        assert_eq!(resolve_output(false, Some("json"), Some("human")), "pretty");
        assert_eq!(resolve_output(false, Some("plain"), Some("bogus")), "text");
    }
}
