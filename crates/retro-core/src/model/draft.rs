//! Input shapes for creating and editing records, with presence checks.
//!
//! Validation is limited to required fields and sane lengths; referential
//! checks (parents, spaces) happen in the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::retro::Location;
use crate::error::{Result, RetroError};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_TEXT_LEN: usize = 4_000;
pub const MAX_TAG_LEN: usize = 50;

/// Metadata fields that an owner edit overwrites in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetroMetadata {
    pub title: String,
    #[serde(default)]
    pub event_type: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub primary_photo_url: Option<String>,
}

impl RetroMetadata {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            event_type: String::new(),
            date,
            location: None,
            is_private: false,
            primary_photo_url: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`RetroError::Validation`] when the title is blank or too long.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        if self.event_type.chars().count() > MAX_TITLE_LEN {
            return Err(RetroError::validation(
                "event type",
                format!("must be <= {MAX_TITLE_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Everything needed to create a retrospective in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetroDraft {
    #[serde(flatten)]
    pub metadata: RetroMetadata,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub feedback_space_id: Option<String>,
}

impl RetroDraft {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            metadata: RetroMetadata::new(title, date),
            parent_id: None,
            attendees: Vec::new(),
            feedback_space_id: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`RetroError::Validation`] for a bad title or a blank attendee.
    pub fn validate(&self) -> Result<()> {
        self.metadata.validate()?;
        if self.attendees.iter().any(|name| name.trim().is_empty()) {
            return Err(RetroError::validation("attendee", "must not be empty"));
        }
        Ok(())
    }
}

/// # Errors
///
/// Returns [`RetroError::Validation`] when the title is blank or too long.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(RetroError::validation("title", "must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(RetroError::validation(
            "title",
            format!("must be <= {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Item, comment and note bodies: non-empty after trimming, bounded length.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] naming `field`.
pub fn validate_text(field: &'static str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(RetroError::validation(field, "must not be empty"));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(RetroError::validation(
            field,
            format!("must be <= {MAX_TEXT_LEN} characters"),
        ));
    }
    Ok(())
}

/// Trim a tag and check it is usable. Tags are free text; case is kept.
///
/// # Errors
///
/// Returns [`RetroError::Validation`] for blank or overlong tags.
pub fn normalize_tag(tag: &str) -> Result<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(RetroError::validation("tag", "must not be empty"));
    }
    if tag.chars().count() > MAX_TAG_LEN {
        return Err(RetroError::validation(
            "tag",
            format!("must be <= {MAX_TAG_LEN} characters"),
        ));
    }
    Ok(tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date")
    }

    #[test]
    fn blank_title_is_rejected() {
        let draft = RetroDraft::new("   ", day());
        let err = draft.validate().expect_err("blank title must fail");
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn overlong_title_is_rejected() {
        let draft = RetroDraft::new("x".repeat(MAX_TITLE_LEN + 1), day());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn blank_attendee_is_rejected() {
        let mut draft = RetroDraft::new("Camping", day());
        draft.attendees = vec!["Ana".into(), " ".into()];
        assert!(draft.validate().is_err());
    }

    #[test]
    fn valid_draft_passes() {
        let mut draft = RetroDraft::new("Camping", day());
        draft.attendees = vec!["Ana".into()];
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn text_must_not_be_blank() {
        assert!(validate_text("text", "\n\t ").is_err());
        assert!(validate_text("text", "sunset swim").is_ok());
    }

    #[test]
    fn tags_are_trimmed() {
        assert_eq!(normalize_tag("  Food ").ok().as_deref(), Some("Food"));
        assert!(normalize_tag("").is_err());
        assert!(normalize_tag(&"t".repeat(MAX_TAG_LEN + 1)).is_err());
    }
}
