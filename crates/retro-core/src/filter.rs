//! Keyword, tag and attendee filtering over retrospective lists.
//!
//! Categories combine with AND. Within a category every fragment must be
//! found somewhere (case-insensitive substring). The location criterion is
//! parsed here but applied by the store's query layer, see
//! [`crate::db::query::list_retros`]; [`filter`] ignores it. [`search`] runs
//! both halves.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::query::{self, RetroQuery};
use crate::error::Result;
use crate::model::Retrospective;

/// Filter criteria. Absent or blank fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetroCriteria {
    /// Whitespace-separated tokens; each must match somewhere.
    pub keywords: Option<String>,
    /// Comma-separated tag fragments; each must match some RBT tag.
    pub tags: Option<String>,
    /// Attendee name fragment.
    pub user: Option<String>,
    /// `"city, state"`, matched by the store.
    pub location: Option<String>,
}

impl RetroCriteria {
    #[must_use]
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = Some(tags.into());
        self
    }

    #[must_use]
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Lower-cased keyword tokens.
    #[must_use]
    pub fn keyword_tokens(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|raw| raw.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }

    /// Lower-cased, trimmed tag fragments; empty pieces are dropped.
    #[must_use]
    pub fn tag_fragments(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|tag| tag.trim().to_lowercase())
                    .filter(|tag| !tag.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn user_fragment(&self) -> Option<String> {
        self.user
            .as_deref()
            .map(str::trim)
            .filter(|user| !user.is_empty())
            .map(str::to_lowercase)
    }

    /// Parsed location criterion, if any.
    #[must_use]
    pub fn location_query(&self) -> Option<LocationQuery> {
        self.location.as_deref().and_then(LocationQuery::parse)
    }
}

/// A `"city, state"` string split into independently matched halves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub city: Option<String>,
    pub state: Option<String>,
}

impl LocationQuery {
    /// Parse `"city"`, `"city, state"` or `", state"`. Returns `None` when
    /// both halves are blank.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(2, ',');
        let clean = |part: Option<&str>| {
            part.map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let city = clean(parts.next());
        let state = clean(parts.next());
        if city.is_none() && state.is_none() {
            None
        } else {
            Some(Self { city, state })
        }
    }
}

/// Whether `retro` satisfies the client-side criteria (keywords, tags, user).
#[must_use]
pub fn matches(retro: &Retrospective, criteria: &RetroCriteria) -> bool {
    let tokens = criteria.keyword_tokens();
    if !tokens.is_empty() {
        let haystack = keyword_haystack(retro);
        if !tokens
            .iter()
            .all(|token| haystack.iter().any(|field| field.contains(token.as_str())))
        {
            return false;
        }
    }

    let tags = criteria.tag_fragments();
    if !tags.is_empty() {
        let item_tags: Vec<String> = retro
            .all_items()
            .flat_map(|(_, item)| item.tags.iter().map(|tag| tag.to_lowercase()))
            .collect();
        if !tags
            .iter()
            .all(|wanted| item_tags.iter().any(|tag| tag.contains(wanted.as_str())))
        {
            return false;
        }
    }

    match criteria.user_fragment() {
        Some(user) => retro
            .attendees
            .iter()
            .any(|attendee| attendee.name.to_lowercase().contains(user.as_str())),
        None => true,
    }
}

/// Return the retrospectives matching `criteria`, preserving input order.
#[must_use]
pub fn filter(retros: &[Retrospective], criteria: &RetroCriteria) -> Vec<Retrospective> {
    retros
        .iter()
        .filter(|retro| matches(retro, criteria))
        .cloned()
        .collect()
}

/// Store-side location query plus client-side [`filter`], as seen by `viewer`.
///
/// # Errors
///
/// Returns [`crate::error::RetroError::Db`] if the store query fails.
pub fn search(
    conn: &Connection,
    viewer: Option<&str>,
    criteria: &RetroCriteria,
    roots_only: bool,
) -> Result<Vec<Retrospective>> {
    let store_query = RetroQuery {
        viewer: viewer.map(str::to_string),
        location: criteria.location_query(),
        roots_only,
        ..RetroQuery::default()
    };
    let candidates = query::list_retros(conn, &store_query)?;
    let found = filter(&candidates, criteria);
    tracing::debug!(
        candidates = candidates.len(),
        matched = found.len(),
        "retro search"
    );
    Ok(found)
}

/// Lower-cased text a keyword token may match.
fn keyword_haystack(retro: &Retrospective) -> Vec<String> {
    let mut fields = vec![retro.title.to_lowercase(), retro.date.to_string()];
    if let Some(location) = &retro.location {
        fields.extend(location.text_fields().map(str::to_lowercase));
    }
    fields.extend(retro.attendees.iter().map(|a| a.name.to_lowercase()));
    for (_, item) in retro.all_items() {
        fields.push(item.text.to_lowercase());
        fields.extend(item.tags.iter().map(|tag| tag.to_lowercase()));
    }
    fields
}
