use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, ItemId, PostId, Side, UserId, Vote};

/// Filter token meaning "every event in the country".
pub const NATIONWIDE_FILTER: &str = "USA";
/// Events in this state are listed under every city/state filter.
pub const ALWAYS_LISTED_STATE: &str = "DC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub brief_description: String,
    #[serde(default)]
    pub full_description: String,
    #[serde(default)]
    pub street_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zipcode: String,
}

impl Event {
    /// Parses `date` as RFC 3339, a naive timestamp, or a bare `YYYY-MM-DD`.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        parse_event_date(&self.date)
    }

    /// Long-form date such as `Friday, April 12th 2019`. Falls back to the raw value.
    pub fn display_date(&self) -> String {
        match self.starts_at() {
            Some(at) => format!(
                "{}, {} {}{} {}",
                at.format("%A"),
                at.format("%B"),
                at.day(),
                ordinal_suffix(at.day()),
                at.year()
            ),
            None => self.date.clone(),
        }
    }

    pub fn address_line(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.street_address, self.city, self.state, self.zipcode
        )
    }
}

fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(at);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// A user's personal calendar. Updates replace the whole `events` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCalendar {
    pub user: UserId,
    #[serde(default)]
    pub events: Vec<EventId>,
}

impl UserCalendar {
    pub fn contains(&self, event_id: EventId) -> bool {
        self.events.contains(&event_id)
    }

    /// Returns `false` when the event was already on the calendar.
    pub fn add(&mut self, event_id: EventId) -> bool {
        if self.contains(event_id) {
            return false;
        }
        self.events.push(event_id);
        true
    }

    /// Returns `false` when the event was not on the calendar.
    pub fn remove(&mut self, event_id: EventId) -> bool {
        match self.events.iter().position(|id| *id == event_id) {
            Some(index) => {
                self.events.remove(index);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub item: ItemId,
    pub user: UserId,
    pub content: String,
    #[serde(default)]
    pub on_right: bool,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
}

impl Post {
    pub fn side(&self) -> Side {
        Side::from_on_right(self.on_right)
    }

    pub fn net_score(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }

    /// Copy of this record with one counter incremented.
    pub fn with_vote(&self, vote: Vote) -> Post {
        let mut next = self.clone();
        match vote {
            Vote::Up => next.upvotes = next.upvotes.saturating_add(1),
            Vote::Down => next.downvotes = next.downvotes.saturating_add(1),
        }
        next
    }
}

/// Body of `POST /posts/`; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub item: ItemId,
    pub user: UserId,
    pub content: String,
    pub on_right: bool,
    pub upvotes: u32,
    pub downvotes: u32,
}

impl NewPost {
    pub fn new(item: ItemId, user: UserId, content: impl Into<String>, side: Side) -> Self {
        Self {
            item,
            user,
            content: content.into(),
            on_right: side.on_right(),
            upvotes: 0,
            downvotes: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}
