//! Event model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub society_id: i64,
    pub name: String,
    pub details: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub online: bool,
    /// Cached count of engagement relations, never adjusted on its own
    pub interest_count: i32,
    pub interests: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An account's opt-in to an event. Its existence is the membership record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EngagementRelation {
    pub event_id: i64,
    pub account_id: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub society_id: i64,
    pub name: String,
    pub details: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub online: bool,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub details: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub online: Option<bool>,
    pub interests: Option<Vec<String>>,
}

impl UpdateEventRequest {
    /// Window the event would have after applying this update
    pub fn effective_window(&self, event: &Event) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            self.start_time.unwrap_or(event.start_time),
            self.end_time.unwrap_or(event.end_time),
        )
    }

    /// Whether applying the update moves the start time
    pub fn changes_start(&self, event: &Event) -> bool {
        matches!(self.start_time, Some(start) if start != event.start_time)
    }

    /// Apply the update to an in-memory copy of the event
    pub fn apply_to(&self, event: &mut Event) {
        if let Some(name) = &self.name {
            event.name = name.clone();
        }
        if let Some(details) = &self.details {
            event.details = details.clone();
        }
        if let Some(location) = &self.location {
            event.location = location.clone();
        }
        if let Some(start) = self.start_time {
            event.start_time = start;
        }
        if let Some(end) = self.end_time {
            event.end_time = end;
        }
        if let Some(online) = self.online {
            event.online = online;
        }
        if let Some(interests) = &self.interests {
            event.interests = interests.clone();
        }
    }
}

/// Temporal status of an event relative to a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Finished,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rows removed by an event deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedEvent {
    pub event_id: i64,
    pub relations_removed: u64,
    pub reminders_cancelled: u64,
    pub messages_removed: u64,
}
