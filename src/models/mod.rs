//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod society;
pub mod reminder;
pub mod chat;
pub mod notification;

// Re-export commonly used models
pub use event::{Event, EngagementRelation, CreateEventRequest, UpdateEventRequest, EventStatus, DeletedEvent};
pub use society::{Society, SocietyMembership, Account};
pub use reminder::{ReminderLabel, ReminderHandle, ReminderJob, ScheduledReminder};
pub use chat::{LiveChatMessage, NewChatMessage};
pub use notification::Notification;
