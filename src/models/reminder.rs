//! Scheduled reminder model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Which of the three fixed reminders a scheduled notification represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReminderLabel {
    #[serde(rename = "in 1 day")]
    InOneDay,
    #[serde(rename = "in 1 hour")]
    InOneHour,
    #[serde(rename = "now")]
    Now,
}

impl ReminderLabel {
    pub const ALL: [ReminderLabel; 3] = [ReminderLabel::InOneDay, ReminderLabel::InOneHour, ReminderLabel::Now];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderLabel::InOneDay => "in 1 day",
            ReminderLabel::InOneHour => "in 1 hour",
            ReminderLabel::Now => "now",
        }
    }

    /// Offset from the event start at which the reminder fires.
    /// "now" fires at the start itself.
    pub fn offset(&self) -> Duration {
        match self {
            ReminderLabel::InOneDay => Duration::days(-1),
            ReminderLabel::InOneHour => Duration::hours(-1),
            ReminderLabel::Now => Duration::zero(),
        }
    }

    pub fn fire_at(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.offset()
    }
}

impl std::fmt::Display for ReminderLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReminderLabel {
    type Err = crate::utils::errors::UniHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in 1 day" => Ok(ReminderLabel::InOneDay),
            "in 1 hour" => Ok(ReminderLabel::InOneHour),
            "now" => Ok(ReminderLabel::Now),
            other => Err(crate::utils::errors::UniHubError::Validation(format!("Unknown reminder label: {}", other))),
        }
    }
}

/// Opaque scheduler-assigned identity of an armed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderHandle(pub Uuid);

impl ReminderHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReminderHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReminderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Work submitted to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderJob {
    pub account_id: i64,
    pub event_id: i64,
    pub label: ReminderLabel,
    pub fire_at: DateTime<Utc>,
}

impl ReminderJob {
    pub fn for_start(account_id: i64, event_id: i64, label: ReminderLabel, start: DateTime<Utc>) -> Self {
        Self {
            account_id,
            event_id,
            label,
            fire_at: label.fire_at(start),
        }
    }
}

/// An armed reminder persisted alongside its logical key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub handle: ReminderHandle,
    pub account_id: i64,
    pub event_id: i64,
    pub label: ReminderLabel,
    pub fire_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ScheduledReminder {
    pub fn from_job(job: &ReminderJob, handle: ReminderHandle, created_at: DateTime<Utc>) -> Self {
        Self {
            handle,
            account_id: job.account_id,
            event_id: job.event_id,
            label: job.label,
            fire_at: job.fire_at,
            created_at,
        }
    }

    pub fn job(&self) -> ReminderJob {
        ReminderJob {
            account_id: self.account_id,
            event_id: self.event_id,
            label: self.label,
            fire_at: self.fire_at,
        }
    }
}
