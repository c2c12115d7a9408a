//! Event store abstraction
//!
//! The coordinator treats persistence as a transactional repository keyed by
//! event id and (event, account) pairs. `DatabaseService` implements it over
//! Postgres and `MemoryEventStore` keeps everything in process.

use async_trait::async_trait;
use crate::models::*;
use crate::utils::errors::Result;

#[async_trait]
pub trait EventStore: Send + Sync {
    // Events

    async fn insert_event(&self, request: CreateEventRequest) -> Result<Event>;

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>>;

    async fn update_event(&self, event_id: i64, request: UpdateEventRequest) -> Result<Event>;

    /// Remove the event row. Children must already be gone.
    async fn delete_event(&self, event_id: i64) -> Result<bool>;

    /// Atomically add `delta` to the interest count, flooring at zero, and
    /// return the new value.
    async fn adjust_interest_count(&self, event_id: i64, delta: i32) -> Result<i32>;

    // Engagement relations

    /// Fails with `AlreadyJoined` if the pair exists.
    async fn insert_relation(&self, event_id: i64, account_id: i64) -> Result<EngagementRelation>;

    async fn find_relation(&self, event_id: i64, account_id: i64) -> Result<Option<EngagementRelation>>;

    async fn delete_relation(&self, event_id: i64, account_id: i64) -> Result<bool>;

    async fn list_subscribers(&self, event_id: i64) -> Result<Vec<i64>>;

    async fn count_relations(&self, event_id: i64) -> Result<i64>;

    async fn delete_relations_for_event(&self, event_id: i64) -> Result<u64>;

    // Societies and accounts

    async fn find_society(&self, society_id: i64) -> Result<Option<Society>>;

    async fn find_membership(&self, society_id: i64, account_id: i64) -> Result<Option<SocietyMembership>>;

    async fn list_society_members(&self, society_id: i64) -> Result<Vec<i64>>;

    async fn find_account(&self, account_id: i64) -> Result<Option<Account>>;

    // Scheduled reminders

    /// Insert or replace the reminder for (account, event, label), returning
    /// the row it replaced.
    async fn upsert_reminder(&self, reminder: ScheduledReminder) -> Result<Option<ScheduledReminder>>;

    async fn list_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>>;

    async fn list_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>>;

    async fn list_all_reminders(&self) -> Result<Vec<ScheduledReminder>>;

    /// Remove and return the reminder armed under `handle`. A `None` means the
    /// reminder was cancelled or replaced and must not fire.
    async fn take_reminder_by_handle(&self, handle: ReminderHandle) -> Result<Option<ScheduledReminder>>;

    async fn delete_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>>;

    async fn delete_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>>;

    // Live chat

    /// Fails with `ChatEnded` if the event already has a final message.
    async fn insert_message(&self, message: NewChatMessage) -> Result<LiveChatMessage>;

    async fn find_message(&self, message_id: i64) -> Result<Option<LiveChatMessage>>;

    async fn find_final_message(&self, event_id: i64) -> Result<Option<LiveChatMessage>>;

    async fn list_messages(&self, event_id: i64, include_final: bool) -> Result<Vec<LiveChatMessage>>;

    async fn delete_message(&self, message_id: i64) -> Result<bool>;

    async fn delete_messages_for_event(&self, event_id: i64) -> Result<u64>;

    // Notifications

    async fn insert_notification(&self, recipient_id: i64, message: &str) -> Result<Notification>;

    async fn find_notification(&self, notification_id: i64) -> Result<Option<Notification>>;

    /// Newest first
    async fn list_notifications(&self, recipient_id: i64) -> Result<Vec<Notification>>;

    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64>;

    async fn mark_notification_read(&self, notification_id: i64) -> Result<Notification>;
}
