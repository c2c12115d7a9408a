//! Engagement coordinator
//!
//! Owns every state change that touches an event's interest count or its
//! reminder set. Operations on one event are serialized through a per-event
//! async lock; operations on different events run in parallel.
//!
//! The interest count is only ever changed through the store's atomic
//! adjust primitive, one step per relation inserted or deleted, so at any
//! quiescent point it equals the number of engagement relations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use crate::config::EngagementConfig;
use crate::database::EventStore;
use crate::models::*;
use crate::services::auth::AuthContext;
use crate::services::clock::Clock;
use crate::services::notification::{NotificationSink, TemplateRegistry};
use crate::services::scheduler::ReminderScheduler;
use crate::services::status::event_status;
use crate::utils::errors::{UniHubError, Result};
use crate::utils::logging::{log_engagement_change, log_event_action, log_reminder_transition};

/// One async lock per event id. Entries live only while someone holds or
/// waits on them.
#[derive(Default)]
struct EventLocks {
    locks: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

impl EventLocks {
    fn map(&self) -> MutexGuard<'_, HashMap<i64, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, event_id: i64) -> EventLockGuard<'_> {
        let lock = self.map().entry(event_id).or_default().clone();
        // Built before waiting so a cancelled wait still releases the entry
        let mut held = EventLockGuard { locks: self, event_id, lock: lock.clone(), guard: None };
        let waiting = lock.lock_owned();
        held.guard = Some(waiting.await);
        held
    }

    fn release(&self, event_id: i64, lock: &Arc<AsyncMutex<()>>) {
        let mut map = self.map();
        // Map entry plus the releasing guard's own handle
        if Arc::strong_count(lock) == 2 {
            map.remove(&event_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

struct EventLockGuard<'a> {
    locks: &'a EventLocks,
    event_id: i64,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EventLockGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.release(self.event_id, &self.lock);
    }
}

pub struct EngagementCoordinator {
    store: Arc<dyn EventStore>,
    scheduler: Arc<dyn ReminderScheduler>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    templates: Arc<TemplateRegistry>,
    settings: EngagementConfig,
    locks: EventLocks,
}

impl EngagementCoordinator {
    pub fn new(
        store: Arc<dyn EventStore>,
        scheduler: Arc<dyn ReminderScheduler>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        templates: Arc<TemplateRegistry>,
        settings: EngagementConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            sink,
            clock,
            templates,
            settings,
            locks: EventLocks::default(),
        }
    }

    /// Create an event owned by `request.society_id`
    pub async fn create_event(&self, ctx: &AuthContext, request: CreateEventRequest) -> Result<Event> {
        ctx.require_society_admin(request.society_id)?;

        if request.name.trim().is_empty() {
            return Err(UniHubError::Validation("Event name cannot be empty".to_string()));
        }
        validate_window(request.start_time, request.end_time)?;

        self.store.find_society(request.society_id).await?
            .ok_or(UniHubError::SocietyNotFound { society_id: request.society_id })?;

        let event = self.store.insert_event(request).await?;
        log_event_action(event.id, "create", ctx.account_id, Some(&event.name));

        self.announce(&event, "event_created").await;
        Ok(event)
    }

    /// Update an event of `society_id`. A changed start time re-arms the
    /// reminders of every subscriber against the new start.
    pub async fn update_event(
        &self,
        ctx: &AuthContext,
        society_id: i64,
        event_id: i64,
        request: UpdateEventRequest,
    ) -> Result<Event> {
        ctx.require_society_admin(society_id)?;

        let _guard = self.locks.acquire(event_id).await;

        let event = self.owned_event(society_id, event_id).await?;

        let (start, end) = request.effective_window(&event);
        validate_window(start, end)?;
        if let Some(name) = &request.name {
            if name.trim().is_empty() {
                return Err(UniHubError::Validation("Event name cannot be empty".to_string()));
            }
        }

        let reschedule = request.changes_start(&event);
        let updated = self.store.update_event(event_id, request).await?;
        log_event_action(event_id, "update", ctx.account_id, reschedule.then_some("start time changed"));

        if reschedule {
            self.reschedule(&updated).await?;
        }

        self.announce(&updated, "event_updated").await;
        Ok(updated)
    }

    /// Delete an event with its relations, reminders and chat
    pub async fn delete_event(&self, ctx: &AuthContext, society_id: i64, event_id: i64) -> Result<DeletedEvent> {
        ctx.require_society_admin(society_id)?;

        let _guard = self.locks.acquire(event_id).await;

        let event = self.owned_event(society_id, event_id).await?;

        let reminders = self.store.delete_event_reminders(event_id).await?;
        for reminder in &reminders {
            self.cancel_quietly(reminder).await;
        }
        let relations_removed = self.store.delete_relations_for_event(event_id).await?;
        let messages_removed = self.store.delete_messages_for_event(event_id).await?;
        self.store.delete_event(event_id).await?;

        let summary = DeletedEvent {
            event_id,
            relations_removed,
            reminders_cancelled: reminders.len() as u64,
            messages_removed,
        };
        log_event_action(event_id, "delete", ctx.account_id, Some(&format!(
            "{} relations, {} reminders, {} messages",
            summary.relations_removed, summary.reminders_cancelled, summary.messages_removed
        )));

        self.announce(&event, "event_cancelled").await;

        Ok(summary)
    }

    /// Status of an event at `now`
    pub async fn get_status(&self, event_id: i64, now: DateTime<Utc>) -> Result<EventStatus> {
        let event = self.get_event(event_id).await?;
        Ok(event_status(&event, now))
    }

    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.store.find_event(event_id).await?
            .ok_or(UniHubError::EventNotFound { event_id })
    }

    /// Accounts currently engaged with the event
    pub async fn subscribers(&self, event_id: i64) -> Result<Vec<i64>> {
        self.get_event(event_id).await?;
        self.store.list_subscribers(event_id).await
    }

    /// Join an event. Returns the new interest count.
    pub async fn join(&self, event_id: i64, account_id: i64) -> Result<i32> {
        let _guard = self.locks.acquire(event_id).await;

        let event = self.get_event(event_id).await?;

        if self.store.find_membership(event.society_id, account_id).await?.is_none() {
            return Err(UniHubError::NotMemberOfSociety { society_id: event.society_id, account_id });
        }
        if self.store.find_relation(event_id, account_id).await?.is_some() {
            return Err(UniHubError::AlreadyJoined { event_id, account_id });
        }
        if event_status(&event, self.clock.now()) == EventStatus::Finished {
            return Err(UniHubError::EventFinished { event_id });
        }

        self.store.insert_relation(event_id, account_id).await?;

        let count = match self.adjust_count(event_id, 1).await {
            Ok(count) => count,
            Err(e) => {
                if let Err(undo) = self.store.delete_relation(event_id, account_id).await {
                    warn!(event_id = event_id, account_id = account_id, error = %undo,
                          "Failed to roll back relation after counter failure");
                }
                return Err(e);
            }
        };
        log_engagement_change(event_id, account_id, "join", count);

        self.arm_reminders(account_id, &event).await;
        Ok(count)
    }

    /// Leave an event. Returns the new interest count.
    pub async fn leave(&self, event_id: i64, account_id: i64) -> Result<i32> {
        let _guard = self.locks.acquire(event_id).await;

        self.get_event(event_id).await?;

        if !self.store.delete_relation(event_id, account_id).await? {
            return Err(UniHubError::NotJoined { event_id, account_id });
        }

        let count = match self.adjust_count(event_id, -1).await {
            Ok(count) => count,
            Err(e) => {
                if let Err(undo) = self.store.insert_relation(event_id, account_id).await {
                    warn!(event_id = event_id, account_id = account_id, error = %undo,
                          "Failed to restore relation after counter failure");
                }
                return Err(e);
            }
        };
        log_engagement_change(event_id, account_id, "leave", count);

        // The account has left; leftover rows are skipped when they fire
        match self.store.delete_reminders(event_id, account_id).await {
            Ok(reminders) => {
                for reminder in &reminders {
                    self.cancel_quietly(reminder).await;
                }
            }
            Err(e) => warn!(event_id = event_id, account_id = account_id, error = %e,
                            "Failed to remove reminders after leave"),
        }

        Ok(count)
    }

    /// Re-arm every persisted reminder. Called once at startup since timer
    /// tasks do not survive a restart.
    pub async fn restore_reminders(&self) -> Result<usize> {
        let reminders = self.store.list_all_reminders().await?;
        let mut restored = 0;

        for reminder in reminders {
            match self.scheduler.arm(reminder.handle, reminder.job()).await {
                Ok(()) => restored += 1,
                Err(e) => warn!(handle = %reminder.handle, error = %e, "Failed to restore reminder"),
            }
        }

        info!(restored = restored, "Restored persisted reminders");
        Ok(restored)
    }

    async fn owned_event(&self, society_id: i64, event_id: i64) -> Result<Event> {
        let event = self.get_event(event_id).await?;
        if event.society_id != society_id {
            // Hide events of other societies
            return Err(UniHubError::EventNotFound { event_id });
        }
        Ok(event)
    }

    /// Apply `delta` to the interest count, retrying on contention
    async fn adjust_count(&self, event_id: i64, delta: i32) -> Result<i32> {
        let attempts = self.settings.counter_retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.store.adjust_interest_count(event_id, delta).await {
                Ok(count) => return Ok(count),
                Err(e) if e.is_transient() => {
                    warn!(event_id = event_id, attempt = attempt, error = %e, "Interest count adjustment contended");
                    last_error = Some(e);
                    if attempt < attempts {
                        let backoff = self.settings.counter_retry_backoff_ms * u64::from(attempt);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(UniHubError::Transient(format!(
            "interest count of event {} not adjusted after {} attempts: {}",
            event_id,
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Arm all three labels for one subscriber. Failures are logged; the
    /// caller's state change is already committed.
    async fn arm_reminders(&self, account_id: i64, event: &Event) -> usize {
        let mut armed = 0;
        for label in ReminderLabel::ALL {
            match self.arm_reminder(account_id, event, label).await {
                Ok(()) => armed += 1,
                Err(e) => warn!(event_id = event.id, account_id = account_id, label = %label, error = %e,
                                "Failed to arm reminder"),
            }
        }
        armed
    }

    /// Persist the new reminder, arm it, then cancel whatever it replaced
    async fn arm_reminder(&self, account_id: i64, event: &Event, label: ReminderLabel) -> Result<()> {
        let job = ReminderJob::for_start(account_id, event.id, label, event.start_time);
        let handle = ReminderHandle::new();
        let reminder = ScheduledReminder::from_job(&job, handle, self.clock.now());

        let replaced = self.store.upsert_reminder(reminder).await?;
        self.scheduler.arm(handle, job).await?;
        log_reminder_transition(event.id, account_id, label.as_str(), "armed");

        if let Some(stale) = replaced {
            self.scheduler.cancel(stale.handle).await?;
            log_reminder_transition(event.id, account_id, label.as_str(), "replaced");
        }
        Ok(())
    }

    async fn reschedule(&self, event: &Event) -> Result<()> {
        let subscribers = self.store.list_subscribers(event.id).await?;
        debug!(event_id = event.id, subscribers = subscribers.len(), "Rescheduling reminders");

        for account_id in subscribers {
            self.arm_reminders(account_id, event).await;
        }
        Ok(())
    }

    async fn cancel_quietly(&self, reminder: &ScheduledReminder) {
        match self.scheduler.cancel(reminder.handle).await {
            Ok(_) => log_reminder_transition(reminder.event_id, reminder.account_id, reminder.label.as_str(), "cancelled"),
            Err(e) => warn!(handle = %reminder.handle, error = %e, "Failed to cancel reminder"),
        }
    }

    /// Tell every society member about an event change
    async fn announce(&self, event: &Event, template: &str) {
        let rendered = self.templates.event_message(template, event, self.clock.as_ref())
            .and_then(|message| Ok((self.templates.subject(template)?.to_string(), message)));
        let (subject, message) = match rendered {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(event_id = event.id, template = template, error = %e, "Failed to render announcement");
                return;
            }
        };

        let members = match self.store.list_society_members(event.society_id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(event_id = event.id, error = %e, "Failed to list society members");
                return;
            }
        };

        if let Err(e) = self.sink.broadcast(&members, &subject, &message).await {
            warn!(event_id = event.id, template = template, error = %e, "Failed to broadcast announcement");
        }
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(UniHubError::Validation("Event must end after it starts".to_string()));
    }
    Ok(())
}
