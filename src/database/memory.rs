//! In-process event store
//!
//! Keeps every table in mutex-guarded maps. Used by tests and by embedders
//! that do not need durability. Also offers seeding helpers for the rows the
//! coordinator only reads (accounts, societies, memberships) and fault
//! injection for the interest counter and reminder removal.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use async_trait::async_trait;
use chrono::Utc;
use crate::database::store::EventStore;
use crate::models::*;
use crate::utils::errors::{UniHubError, Result};

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    events: HashMap<i64, Event>,
    relations: BTreeMap<(i64, i64), EngagementRelation>,
    societies: HashMap<i64, Society>,
    memberships: BTreeMap<(i64, i64), SocietyMembership>,
    accounts: HashMap<i64, Account>,
    reminders: BTreeMap<(i64, i64, ReminderLabel), ScheduledReminder>,
    messages: BTreeMap<i64, LiveChatMessage>,
    notifications: BTreeMap<i64, Notification>,
    failing_adjustments: u32,
    failing_reminder_deletes: bool,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    state: Mutex<MemoryState>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an account
    pub fn add_account(&self, display_name: &str, email: Option<&str>, is_admin: bool) -> Account {
        let mut state = self.state();
        let account = Account {
            id: state.next_id(),
            email: email.map(|e| e.to_string()),
            display_name: display_name.to_string(),
            is_admin,
        };
        state.accounts.insert(account.id, account.clone());
        account
    }

    /// Seed a society
    pub fn add_society(&self, name: &str) -> Society {
        let mut state = self.state();
        let society = Society {
            id: state.next_id(),
            name: name.to_string(),
            description: String::new(),
            created_at: Utc::now(),
        };
        state.societies.insert(society.id, society.clone());
        society
    }

    /// Seed a society membership
    pub fn add_member(&self, society_id: i64, account_id: i64, is_admin: bool) -> SocietyMembership {
        let membership = SocietyMembership {
            society_id,
            account_id,
            is_admin,
            joined_at: Utc::now(),
        };
        self.state().memberships.insert((society_id, account_id), membership.clone());
        membership
    }

    /// Make the next `count` counter adjustments fail with contention
    pub fn fail_next_adjustments(&self, count: u32) {
        self.state().failing_adjustments = count;
    }

    /// Make per-account reminder removal fail until switched off
    pub fn fail_reminder_deletes(&self, failing: bool) {
        self.state().failing_reminder_deletes = failing;
    }

    /// Number of persisted reminders across all events
    pub fn reminder_count(&self) -> usize {
        self.state().reminders.len()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert_event(&self, request: CreateEventRequest) -> Result<Event> {
        let mut state = self.state();
        let now = Utc::now();
        let event = Event {
            id: state.next_id(),
            society_id: request.society_id,
            name: request.name,
            details: request.details,
            location: request.location,
            start_time: request.start_time,
            end_time: request.end_time,
            online: request.online,
            interest_count: 0,
            interests: request.interests,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, event_id: i64) -> Result<Option<Event>> {
        Ok(self.state().events.get(&event_id).cloned())
    }

    async fn update_event(&self, event_id: i64, request: UpdateEventRequest) -> Result<Event> {
        let mut state = self.state();
        let event = state.events.get_mut(&event_id)
            .ok_or(UniHubError::EventNotFound { event_id })?;
        request.apply_to(event);
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, event_id: i64) -> Result<bool> {
        Ok(self.state().events.remove(&event_id).is_some())
    }

    async fn adjust_interest_count(&self, event_id: i64, delta: i32) -> Result<i32> {
        let mut state = self.state();
        if state.failing_adjustments > 0 {
            state.failing_adjustments -= 1;
            return Err(UniHubError::StoreContention(format!("interest count of event {} is locked", event_id)));
        }
        let event = state.events.get_mut(&event_id)
            .ok_or(UniHubError::EventNotFound { event_id })?;
        event.interest_count = event.interest_count.saturating_add(delta).max(0);
        Ok(event.interest_count)
    }

    async fn insert_relation(&self, event_id: i64, account_id: i64) -> Result<EngagementRelation> {
        let mut state = self.state();
        if state.relations.contains_key(&(event_id, account_id)) {
            return Err(UniHubError::AlreadyJoined { event_id, account_id });
        }
        let relation = EngagementRelation {
            event_id,
            account_id,
            joined_at: Utc::now(),
        };
        state.relations.insert((event_id, account_id), relation.clone());
        Ok(relation)
    }

    async fn find_relation(&self, event_id: i64, account_id: i64) -> Result<Option<EngagementRelation>> {
        Ok(self.state().relations.get(&(event_id, account_id)).cloned())
    }

    async fn delete_relation(&self, event_id: i64, account_id: i64) -> Result<bool> {
        Ok(self.state().relations.remove(&(event_id, account_id)).is_some())
    }

    async fn list_subscribers(&self, event_id: i64) -> Result<Vec<i64>> {
        Ok(self.state().relations.range((event_id, i64::MIN)..=(event_id, i64::MAX))
            .map(|(&(_, account_id), _)| account_id)
            .collect())
    }

    async fn count_relations(&self, event_id: i64) -> Result<i64> {
        Ok(self.state().relations.range((event_id, i64::MIN)..=(event_id, i64::MAX)).count() as i64)
    }

    async fn delete_relations_for_event(&self, event_id: i64) -> Result<u64> {
        let mut state = self.state();
        let before = state.relations.len();
        state.relations.retain(|&(event, _), _| event != event_id);
        Ok((before - state.relations.len()) as u64)
    }

    async fn find_society(&self, society_id: i64) -> Result<Option<Society>> {
        Ok(self.state().societies.get(&society_id).cloned())
    }

    async fn find_membership(&self, society_id: i64, account_id: i64) -> Result<Option<SocietyMembership>> {
        Ok(self.state().memberships.get(&(society_id, account_id)).cloned())
    }

    async fn list_society_members(&self, society_id: i64) -> Result<Vec<i64>> {
        Ok(self.state().memberships.range((society_id, i64::MIN)..=(society_id, i64::MAX))
            .map(|(&(_, account_id), _)| account_id)
            .collect())
    }

    async fn find_account(&self, account_id: i64) -> Result<Option<Account>> {
        Ok(self.state().accounts.get(&account_id).cloned())
    }

    async fn upsert_reminder(&self, reminder: ScheduledReminder) -> Result<Option<ScheduledReminder>> {
        let key = (reminder.account_id, reminder.event_id, reminder.label);
        Ok(self.state().reminders.insert(key, reminder))
    }

    async fn list_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>> {
        Ok(self.state().reminders.values()
            .filter(|r| r.event_id == event_id && r.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn list_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>> {
        Ok(self.state().reminders.values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn list_all_reminders(&self) -> Result<Vec<ScheduledReminder>> {
        Ok(self.state().reminders.values().cloned().collect())
    }

    async fn take_reminder_by_handle(&self, handle: ReminderHandle) -> Result<Option<ScheduledReminder>> {
        let mut state = self.state();
        let key = state.reminders.iter()
            .find(|(_, r)| r.handle == handle)
            .map(|(key, _)| *key);
        Ok(key.and_then(|key| state.reminders.remove(&key)))
    }

    async fn delete_reminders(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>> {
        let mut state = self.state();
        if state.failing_reminder_deletes {
            return Err(UniHubError::Transient("reminder store unavailable".to_string()));
        }
        let mut removed = Vec::new();
        for label in ReminderLabel::ALL {
            if let Some(reminder) = state.reminders.remove(&(account_id, event_id, label)) {
                removed.push(reminder);
            }
        }
        Ok(removed)
    }

    async fn delete_event_reminders(&self, event_id: i64) -> Result<Vec<ScheduledReminder>> {
        let mut state = self.state();
        let keys: Vec<_> = state.reminders.keys()
            .filter(|&&(_, event, _)| event == event_id)
            .copied()
            .collect();
        Ok(keys.into_iter().filter_map(|key| state.reminders.remove(&key)).collect())
    }

    async fn insert_message(&self, message: NewChatMessage) -> Result<LiveChatMessage> {
        let mut state = self.state();
        let closed = state.messages.values()
            .any(|m| m.event_id == message.event_id && m.is_final);
        if closed {
            return Err(UniHubError::ChatEnded { event_id: message.event_id });
        }
        let stored = LiveChatMessage {
            id: state.next_id(),
            event_id: message.event_id,
            sender_id: message.sender_id,
            text: message.text,
            is_final: message.is_final,
            created_at: Utc::now(),
        };
        state.messages.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_message(&self, message_id: i64) -> Result<Option<LiveChatMessage>> {
        Ok(self.state().messages.get(&message_id).cloned())
    }

    async fn find_final_message(&self, event_id: i64) -> Result<Option<LiveChatMessage>> {
        Ok(self.state().messages.values()
            .find(|m| m.event_id == event_id && m.is_final)
            .cloned())
    }

    async fn list_messages(&self, event_id: i64, include_final: bool) -> Result<Vec<LiveChatMessage>> {
        Ok(self.state().messages.values()
            .filter(|m| m.event_id == event_id && (include_final || !m.is_final))
            .cloned()
            .collect())
    }

    async fn delete_message(&self, message_id: i64) -> Result<bool> {
        let mut state = self.state();
        if state.messages.get(&message_id).is_some_and(|m| m.is_final) {
            return Err(UniHubError::ProtectedMessage { message_id });
        }
        Ok(state.messages.remove(&message_id).is_some())
    }

    async fn delete_messages_for_event(&self, event_id: i64) -> Result<u64> {
        let mut state = self.state();
        let before = state.messages.len();
        state.messages.retain(|_, m| m.event_id != event_id);
        Ok((before - state.messages.len()) as u64)
    }

    async fn insert_notification(&self, recipient_id: i64, message: &str) -> Result<Notification> {
        let mut state = self.state();
        let notification = Notification {
            id: state.next_id(),
            recipient_id,
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        state.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn find_notification(&self, notification_id: i64) -> Result<Option<Notification>> {
        Ok(self.state().notifications.get(&notification_id).cloned())
    }

    async fn list_notifications(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        // Ids grow monotonically, so reverse id order is newest first
        Ok(self.state().notifications.values()
            .rev()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect())
    }

    async fn count_unread_notifications(&self, recipient_id: i64) -> Result<i64> {
        Ok(self.state().notifications.values()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, notification_id: i64) -> Result<Notification> {
        let mut state = self.state();
        let notification = state.notifications.get_mut(&notification_id)
            .ok_or(UniHubError::NotificationNotFound { notification_id })?;
        notification.is_read = true;
        Ok(notification.clone())
    }
}
