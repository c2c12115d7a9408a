//! Database service layer
//!
//! Postgres-backed `EventStore`, delegating to the per-table repositories.

use async_trait::async_trait;
use crate::database::{DatabasePool, EventRepository, SocietyRepository, ReminderRepository, ChatRepository, NotificationRepository};
use crate::database::store::EventStore;
use crate::models::*;
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub events: EventRepository,
    pub societies: SocietyRepository,
    pub reminders: ReminderRepository,
    pub chat: ChatRepository,
    pub notifications: NotificationRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            societies: SocietyRepository::new(pool.clone()),
            reminders: ReminderRepository::new(pool.clone()),
            chat: ChatRepository::new(pool.clone()),
            notifications: NotificationRepository::new(pool),
        }
    }
}

#[async_trait]
impl EventStore for DatabaseService {
    async fn insert_event(&self, request: CreateEventRequest) -> Result<Event> {
        self.events.create(request).await
    }

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(event_id).await
    }

    async fn update_event(&self, event_id: i64, request: UpdateEventRequest) -> Result<Event> {
        self.events.update(event_id, request).await
    }

    async fn delete_event(&self, event_id: i64) -> Result<bool> {
        self.events.delete(event_id).await
    }

    async fn adjust_interest_count(&self, event_id: i64, delta: i32) -> Result<i32> {
        self.events.adjust_interest_count(event_id, delta).await
    }

    async fn insert_relation(&self, event_id: i64, account_id: i64) -> Result<EngagementRelation> {
        self.events.insert_relation(event_id, account_id).await
    }

    async fn find_relation(&self, event_id: i64, account_id: i64) -> Result<Option<EngagementRelation>> {
        self.events.find_relation(event_id, account_id).await
    }

    async fn delete_relation(&self, event_id: i64, account_id: i64) -> Result<bool> {
        self.events.delete_relation(event_id, account_id).await
    }

    async fn list_subscribers(&self, event_id: i64) -> Result<Vec<i64>> {
        self.events.get_subscribers(event_id).await
    }

    async fn count_relations(&self, event_id: i64) -> Result<i64> {
        self.events.count_relations(event_id).await
    }

    async fn delete_relations_for_event(&self, event_id: i64) -> Result<u64> {
        self.events.delete_relations_for_event(event_id).await
    }

    async fn find_society(&self, society_id: i64) -> Result<Option<Society>> {
        self.societies.find_by_id(society_id).await
    }

    async fn find_membership(&self, society_id: i64, account_id: i64) -> Result<Option<SocietyMembership>> {
        self.societies.find_membership(society_id, account_id).await
    }

    async fn list_society_members(&self, society_id: i64) -> Result<Vec<i64>> {
        self.societies.get_member_ids(society_id).await
    }

    async fn find_account(&self, account_id: i64) -> Result<Option<Account>> {
        self.societies.find_account(account_id).await
    }

    async fn upsert_reminder(&self, reminder: ScheduledReminder) -> Result<Option<ScheduledReminder>> {
        self.reminders.upsert(reminder).await
    }

    async fn list_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>> {
        self.reminders.get_for_subscriber(event_id, account_id).await
    }

    async fn list_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>> {
        self.reminders.get_for_event(event_id).await
    }

    async fn list_all_reminders(&self) -> Result<Vec<ScheduledReminder>> {
        self.reminders.get_all().await
    }

    async fn take_reminder_by_handle(&self, handle: ReminderHandle) -> Result<Option<ScheduledReminder>> {
        self.reminders.take_by_handle(handle).await
    }

    async fn delete_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>> {
        self.reminders.delete_for_subscriber(event_id, account_id).await
    }

    async fn delete_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>> {
        self.reminders.delete_for_event(event_id).await
    }

    async fn insert_message(&self, message: NewChatMessage) -> Result<LiveChatMessage> {
        self.chat.create(message).await
    }

    async fn find_message(&self, message_id: i64) -> Result<Option<LiveChatMessage>> {
        self.chat.find_by_id(message_id).await
    }

    async fn find_final_message(&self, event_id: i64) -> Result<Option<LiveChatMessage>> {
        self.chat.find_final(event_id).await
    }

    async fn list_messages(&self, event_id: i64, include_final: bool) -> Result<Vec<LiveChatMessage>> {
        self.chat.list_for_event(event_id, include_final).await
    }

    async fn delete_message(&self, message_id: i64) -> Result<bool> {
        self.chat.delete(message_id).await
    }

    async fn delete_messages_for_event(&self, event_id: i64) -> Result<u64> {
        self.chat.delete_for_event(event_id).await
    }

    async fn insert_notification(&self, recipient_id: i64, message: &str) -> Result<Notification> {
        self.notifications.create(recipient_id, message).await
    }

    async fn find_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
        self.notifications.find_by_id(notification_id).await
    }

    async fn list_notifications(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        self.notifications.get_for_recipient(recipient_id).await
    }

    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64> {
        self.notifications.count_unread(recipient_id).await
    }

    async fn mark_notification_read(&self, notification_id: i64) -> Result<Notification> {
        self.notifications.mark_read(notification_id).await
    }
}
