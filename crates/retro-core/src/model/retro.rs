use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::RetroError;

/// The three reflection categories. A category is positional: it is the
/// list an item lives in, never a field the item carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Rose,
    Bud,
    Thorn,
}

impl Category {
    pub const ALL: [Self; 3] = [Self::Rose, Self::Bud, Self::Thorn];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rose => "rose",
            Self::Bud => "bud",
            Self::Thorn => "thorn",
        }
    }

    /// Plural label used when rendering grouped lists.
    #[must_use]
    pub const fn plural(self) -> &'static str {
        match self {
            Self::Rose => "roses",
            Self::Bud => "buds",
            Self::Thorn => "thorns",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RetroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rose" | "roses" => Ok(Self::Rose),
            "bud" | "buds" => Ok(Self::Bud),
            "thorn" | "thorns" => Ok(Self::Thorn),
            _ => Err(RetroError::InvalidEnumValue {
                field: "category",
                value: s.to_string(),
                expected: "rose, bud, thorn",
            }),
        }
    }
}

/// Append-only discussion entry on an RBT item or photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
}

/// One user's reaction to a photo. A user holds at most one per photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// A single rose, bud or thorn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbtItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub owner_name: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl RbtItem {
    /// Build a bare item with no tags, comments or photos.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        owner_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tags: Vec::new(),
            comments: Vec::new(),
            owner_name: owner_name.into(),
            photos: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Where a retrospective took place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Location {
    /// Text fields in display order, skipping empty ones.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [&self.name, &self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .filter(|value| !value.trim().is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_fields().next().is_none() && self.lat.is_none() && self.lng.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.text_fields().collect();
        f.write_str(&parts.join(", "))
    }
}

/// Someone who took part. `user` links the name to a journal identity when
/// the attendee has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Attendee {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user: None,
        }
    }

    /// Whether this attendee is the given identity, by linked user or name.
    #[must_use]
    pub fn is(&self, user: &str) -> bool {
        self.user.as_deref() == Some(user) || self.name.eq_ignore_ascii_case(user)
    }
}

/// A user's record of one trip or event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrospective {
    pub id: String,
    pub owner: String,
    pub title: String,
    pub event_type: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(default)]
    pub roses: Vec<RbtItem>,
    #[serde(default)]
    pub buds: Vec<RbtItem>,
    #[serde(default)]
    pub thorns: Vec<RbtItem>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_space_id: Option<String>,
    pub is_private: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Retrospective {
    /// Build an empty public root retrospective.
    pub fn new(
        id: impl Into<String>,
        owner: impl Into<String>,
        title: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            owner: owner.into(),
            title: title.into(),
            event_type: String::new(),
            date,
            attendees: Vec::new(),
            roses: Vec::new(),
            buds: Vec::new(),
            thorns: Vec::new(),
            photos: Vec::new(),
            primary_photo_url: None,
            location: None,
            parent_id: None,
            feedback_space_id: None,
            is_private: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn items(&self, category: Category) -> &[RbtItem] {
        match category {
            Category::Rose => &self.roses,
            Category::Bud => &self.buds,
            Category::Thorn => &self.thorns,
        }
    }

    pub fn items_mut(&mut self, category: Category) -> &mut Vec<RbtItem> {
        match category {
            Category::Rose => &mut self.roses,
            Category::Bud => &mut self.buds,
            Category::Thorn => &mut self.thorns,
        }
    }

    /// Every RBT item with its category, roses first.
    pub fn all_items(&self) -> impl Iterator<Item = (Category, &RbtItem)> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.items(category).iter().map(move |item| (category, item)))
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.roses.len() + self.buds.len() + self.thorns.len()
    }

    /// A retrospective is a root when it has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    #[must_use]
    pub fn is_attendee(&self, user: &str) -> bool {
        self.attendees.iter().any(|attendee| attendee.is(user))
    }

    /// Private retrospectives are visible to the owner and tagged attendees
    /// only; public ones to everybody.
    #[must_use]
    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        if !self.is_private {
            return true;
        }
        viewer.is_some_and(|user| self.owner == user || self.is_attendee(user))
    }

    /// Owners and attendees may append items, tags, comments and photos.
    #[must_use]
    pub fn can_contribute(&self, user: &str) -> bool {
        self.owner == user || self.is_attendee(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date")
    }

    #[test]
    fn category_parse_accepts_plural_and_case() {
        assert_eq!("Rose".parse::<Category>().ok(), Some(Category::Rose));
        assert_eq!("buds".parse::<Category>().ok(), Some(Category::Bud));
        assert_eq!(" THORN ".parse::<Category>().ok(), Some(Category::Thorn));
        assert!("petal".parse::<Category>().is_err());
    }

    #[test]
    fn category_roundtrips_through_display() {
        for category in Category::ALL {
            assert_eq!(category.to_string().parse::<Category>().ok(), Some(category));
        }
    }

    #[test]
    fn all_items_walks_roses_buds_thorns_in_order() {
        let mut retro = Retrospective::new("r1", "ana", "Lisbon", day());
        retro.thorns.push(RbtItem::new("t", "rain", "ana"));
        retro.roses.push(RbtItem::new("r", "food", "ana"));
        retro.buds.push(RbtItem::new("b", "surf", "ana"));

        let order: Vec<(Category, &str)> = retro
            .all_items()
            .map(|(category, item)| (category, item.id.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![(Category::Rose, "r"), (Category::Bud, "b"), (Category::Thorn, "t")]
        );
        assert_eq!(retro.item_count(), 3);
    }

    #[test]
    fn private_retro_visible_to_owner_and_attendees_only() {
        let mut retro = Retrospective::new("r1", "ana", "Lisbon", day());
        retro.is_private = true;
        retro.attendees.push(Attendee {
            name: "Ben".into(),
            user: Some("ben".into()),
        });

        assert!(retro.is_visible_to(Some("ana")));
        assert!(retro.is_visible_to(Some("ben")));
        assert!(!retro.is_visible_to(Some("cy")));
        assert!(!retro.is_visible_to(None));

        retro.is_private = false;
        assert!(retro.is_visible_to(None));
    }

    #[test]
    fn attendee_match_by_name_ignores_ascii_case() {
        let attendee = Attendee::named("Maria");
        assert!(attendee.is("maria"));
        assert!(!attendee.is("mario"));
    }

    #[test]
    fn location_display_skips_blank_fields() {
        let location = Location {
            name: Some("Cafe".into()),
            city: Some("Porto".into()),
            state: Some("  ".into()),
            country: Some("Portugal".into()),
            ..Location::default()
        };
        assert_eq!(location.to_string(), "Cafe, Porto, Portugal");
        assert!(!location.is_empty());
        assert!(Location::default().is_empty());
    }
}
