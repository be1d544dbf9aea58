//! How commands print.
//!
//! Handlers take an [`OutputMode`] and hand their value to [`render`] or
//! [`render_mode`]. Pretty output is framed for a person at a terminal, text
//! output is one tab-separated row per record, JSON is the serde form of the
//! value itself.
//!
//! Mode precedence: `--format`, then `--json`, then `FORMAT`, then `output`
//! from the user config, then pretty on a TTY and text otherwise.

use clap::ValueEnum;
use retro_core::RetroError;
use serde::Serialize;
use std::io::{self, Write};

pub const RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))
}

/// Heading line with a rule under it.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sections and rules for reading at a terminal.
    Pretty,
    /// Tab-separated rows for `cut`, `awk` and friends.
    Text,
    /// Serialized records.
    Json,
}

impl OutputMode {
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    fn from_name(name: &str) -> Self {
        match name {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }
}

pub fn resolve_output_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    user_output: Option<&str>,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }
    let env_format = std::env::var("FORMAT").ok();
    let name = retro_core::config::resolve_output(json_flag, user_output, env_format.as_deref());
    OutputMode::from_name(&name)
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Print `value` with separate renderers for text and pretty modes.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => write_json(&mut out, value)?,
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// Print `value`; text and pretty modes share `human_fn`.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if mode.is_json() {
        write_json(&mut out, value)
    } else {
        human_fn(value, &mut out)?;
        Ok(())
    }
}

/// What a failed command reports, on stderr.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E2001` for domain errors, a snake_case tag like `invalid_date` for
    /// rejected input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }

    /// Classify a command failure: domain errors keep their code and hint,
    /// input errors keep their suggestion, anything else is reported as-is.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        if let Some(domain) = err.downcast_ref::<RetroError>() {
            return Self::from(domain);
        }
        if let Some(invalid) = err.downcast_ref::<crate::validate::ValidationError>() {
            return invalid.to_cli_error();
        }
        Self::new(format!("{err:#}"))
    }
}

impl From<&RetroError> for CliError {
    fn from(err: &RetroError) -> Self {
        Self {
            message: err.to_string(),
            suggestion: err.hint().map(str::to_string),
            error_code: Some(err.code().code().to_string()),
        }
    }
}

/// Print a failure to stderr. JSON mode wraps it as `{"error": {...}}`.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let mut out = io::stderr().lock();
    if mode.is_json() {
        return write_json(&mut out, &serde_json::json!({ "error": error }));
    }
    writeln!(out, "error: {}", error.message)?;
    if let Some(suggestion) = &error.suggestion {
        writeln!(out, "  hint: {suggestion}")?;
    }
    Ok(())
}

/// One-line confirmation. JSON mode emits `{"ok": true, "message": ...}`.
pub fn render_success(mode: OutputMode, message: &str) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => {
            write_json(&mut out, &serde_json::json!({ "ok": true, "message": message }))?;
        }
        OutputMode::Pretty => writeln!(out, "✓ {message}")?,
        OutputMode::Text => writeln!(out, "ok\t{message}")?,
    }
    Ok(())
}

/// Shorten `s` to at most `max` characters, marking the cut with `…`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// First eight characters of an id, enough to be typed back as a prefix.
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_wins() {
        assert_eq!(
            resolve_output_mode(Some(OutputMode::Text), true, Some("json")),
            OutputMode::Text
        );
    }

    #[test]
    fn json_flag_beats_user_config() {
        assert_eq!(resolve_output_mode(None, true, Some("pretty")), OutputMode::Json);
    }

    #[test]
    fn mode_names_map() {
        assert_eq!(OutputMode::from_name("json"), OutputMode::Json);
        assert_eq!(OutputMode::from_name("text"), OutputMode::Text);
        assert_eq!(OutputMode::from_name("pretty"), OutputMode::Pretty);
        assert!(OutputMode::Json.is_json());
        assert!(!OutputMode::Text.is_json());
    }

    #[test]
    fn domain_errors_keep_code_and_hint() {
        let err = anyhow::Error::from(RetroError::IdentityRequired);
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E1003"));
        assert!(cli.suggestion.as_deref().is_some_and(|s| s.contains("RETRO_USER")));
    }

    #[test]
    fn plain_errors_pass_through() {
        let err = anyhow::anyhow!("disk on fire");
        let cli = CliError::from_anyhow(&err);
        assert_eq!(cli.message, "disk on fire");
        assert!(cli.error_code.is_none());
    }

    #[test]
    fn cli_error_json_skips_missing_fields() {
        let json = serde_json::to_value(CliError::new("boom")).expect("serialize");
        assert_eq!(json, serde_json::json!({"message": "boom"}));
    }

    #[test]
    fn truncate_and_short_id() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 6), "hello…");
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
