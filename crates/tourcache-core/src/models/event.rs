use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Human readable venue
    pub location: String,
    pub place_id: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_featured: bool,
    pub image_url: Option<String>,
    pub organizer_name: String,
    pub coordinates: Option<GeoPoint>,
}

impl Event {
    /// An event is upcoming until it ends, or until it starts when it has no end date.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        match self.end_date {
            Some(end) => end >= now,
            None => self.start_date >= now,
        }
    }

    /// "Feb 06, 2026" or "Feb 06 - Feb 08, 2026" for multi-day events
    pub fn formatted_dates(&self) -> String {
        match self.end_date {
            Some(end) if end.date_naive() != self.start_date.date_naive() => format!(
                "{} - {}",
                self.start_date.format("%b %d"),
                end.format("%b %d, %Y")
            ),
            _ => self.start_date.format("%b %d, %Y").to_string(),
        }
    }
}
