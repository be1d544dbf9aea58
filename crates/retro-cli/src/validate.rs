use crate::output::CliError;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use std::fmt;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
    pub suggestion: String,
    pub code: &'static str,
}

impl ValidationError {
    pub fn new(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
        suggestion: impl Into<String>,
        code: &'static str,
    ) -> Self {
        Self {
            field,
            value: value.into(),
            reason: reason.into(),
            suggestion: suggestion.into(),
            code,
        }
    }

    pub fn to_cli_error(&self) -> CliError {
        CliError::with_details(self.to_string(), self.suggestion.clone(), self.code)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}': {}", self.field, self.value, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// `YYYY-MM-DD`, `today` or `yesterday`.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    let value = s.trim();
    let today = Local::now().date_naive();
    match value.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - Duration::days(1)),
        _ => {}
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ValidationError::new(
            "date",
            s,
            "expected YYYY-MM-DD",
            "use --date 2024-06-01, --date today or --date yesterday",
            "invalid_date",
        )
    })
}

/// `YYYY-MM-DDTHH:MM[:SS]` or the same with a space instead of `T`.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, ValidationError> {
    let value = s.trim().replacen(' ', "T", 1);
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&value, fmt).ok())
        .ok_or_else(|| {
            ValidationError::new(
                "datetime",
                s,
                "expected YYYY-MM-DDTHH:MM",
                "use a value like 2024-06-01T09:30",
                "invalid_datetime",
            )
        })
}

/// `none` (any case) clears the parent.
pub fn parse_parent(s: &str) -> Option<&str> {
    let value = s.trim();
    if value.eq_ignore_ascii_case("none") || value.is_empty() {
        None
    } else {
        Some(value)
    }
}

pub fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<(), ValidationError> {
    if let Some(lat) = lat {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::new(
                "lat",
                lat.to_string(),
                "must be between -90 and 90",
                "check the latitude sign and magnitude",
                "invalid_coordinates",
            ));
        }
    }
    if let Some(lng) = lng {
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ValidationError::new(
                "lng",
                lng.to_string(),
                "must be between -180 and 180",
                "check the longitude sign and magnitude",
                "invalid_coordinates",
            ));
        }
    }
    if lat.is_some() != lng.is_some() {
        return Err(ValidationError::new(
            "coordinates",
            format!("{lat:?}/{lng:?}"),
            "lat and lng must be given together",
            "pass both --lat and --lng, or neither",
            "invalid_coordinates",
        ));
    }
    Ok(())
}

/// IDs are UUIDs; a prefix is any run of hex digits and dashes.
pub fn validate_id(field: &'static str, s: &str) -> Result<(), ValidationError> {
    let value = s.trim();
    if value.is_empty() {
        return Err(ValidationError::new(
            field,
            s,
            "must not be empty",
            "pass a full ID or a unique prefix of one",
            "invalid_id",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Err(ValidationError::new(
            field,
            s,
            "may only contain hex digits and '-'",
            "copy the ID from `retro list` or `--json` output",
            "invalid_id",
        ));
    }
    Ok(())
}
