use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::RetroError;

/// Booking state of a planned trip item.
///
/// Any status may be set from any other; there are no transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Booked,
    #[default]
    PendingReview,
    Declined,
}

impl TripStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::PendingReview => "pending_review",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = RetroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "booked" => Ok(Self::Booked),
            "pending_review" | "pending-review" | "pending" => Ok(Self::PendingReview),
            "declined" => Ok(Self::Declined),
            _ => Err(RetroError::InvalidEnumValue {
                field: "status",
                value: s.to_string(),
                expected: "booked, pending_review, declined",
            }),
        }
    }
}

/// A user-owned itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPlanner {
    pub id: String,
    pub owner: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripPlannerItem {
    pub id: String,
    pub trip_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub status: TripStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalogue_item_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::TripStatus;

    #[test]
    fn status_parse_aliases() {
        assert_eq!("booked".parse::<TripStatus>().ok(), Some(TripStatus::Booked));
        assert_eq!(
            "pending-review".parse::<TripStatus>().ok(),
            Some(TripStatus::PendingReview)
        );
        assert_eq!(
            "PENDING_REVIEW".parse::<TripStatus>().ok(),
            Some(TripStatus::PendingReview)
        );
        assert_eq!("declined".parse::<TripStatus>().ok(), Some(TripStatus::Declined));
        assert!("cancelled".parse::<TripStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TripStatus::PendingReview).expect("serialize");
        assert_eq!(json, "\"pending_review\"");
    }

    #[test]
    fn default_status_is_pending_review() {
        assert_eq!(TripStatus::default(), TripStatus::PendingReview);
    }
}
