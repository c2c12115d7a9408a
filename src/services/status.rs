//! Event status engine

use chrono::{DateTime, Utc};
use crate::models::{Event, EventStatus};

/// Status of the window `[start, end]` at `now`. Both bounds count as ongoing.
pub fn status_at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> EventStatus {
    if now < start {
        EventStatus::Upcoming
    } else if now > end {
        EventStatus::Finished
    } else {
        EventStatus::Ongoing
    }
}

pub fn event_status(event: &Event, now: DateTime<Utc>) -> EventStatus {
    status_at(event.start_time, event.end_time, now)
}
