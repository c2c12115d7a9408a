//! Notification service implementation
//!
//! This service renders notification text from templates, persists the
//! in-app notification record and then attempts delivery by email. Email is
//! best effort: a mail failure is logged and counted but the record stays.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn, debug};
use crate::database::EventStore;
use crate::models::{Event, Notification, ReminderLabel};
use crate::services::clock::Clock;
use crate::services::mail::{MailSender, OutgoingMail};
use crate::utils::errors::{UniHubError, Result};

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub subject: String,
    pub content: String,
}

/// Registry of message templates keyed by name
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<String, MessageTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self { templates: Self::load_default_templates() }
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `{placeholder}` slots of the template `key`
    pub fn format_message(&self, key: &str, parameters: &HashMap<String, String>) -> Result<String> {
        let template = self.get(key)?;

        let mut formatted = template.content.clone();
        for (name, value) in parameters {
            let placeholder = format!("{{{}}}", name);
            formatted = formatted.replace(&placeholder, value);
        }

        Ok(formatted)
    }

    pub fn subject(&self, key: &str) -> Result<&str> {
        Ok(&self.get(key)?.subject)
    }

    fn get(&self, key: &str) -> Result<&MessageTemplate> {
        self.templates.get(key)
            .ok_or_else(|| UniHubError::Validation(format!("Template not found: {}", key)))
    }

    /// Render an event template with the event's name, location and local start time
    pub fn event_message(&self, key: &str, event: &Event, clock: &dyn Clock) -> Result<String> {
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event.name.clone());
        parameters.insert("event_location".to_string(), event.location.clone());
        parameters.insert(
            "start_time".to_string(),
            clock.to_local(event.start_time).format("%Y-%m-%d %H:%M %Z").to_string(),
        );
        self.format_message(key, &parameters)
    }

    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        let defaults = [
            ("event_reminder", "Event reminder",
             "The event '{event_name}' starts {label}!"),
            ("event_created", "New event",
             "New event '{event_name}' at {event_location}, starting {start_time}."),
            ("event_updated", "Event updated",
             "The event '{event_name}' has been updated. It now starts {start_time} at {event_location}."),
            ("event_cancelled", "Event cancelled",
             "The event '{event_name}' has been cancelled."),
        ];

        defaults.into_iter()
            .map(|(key, subject, content)| {
                (key.to_string(), MessageTemplate {
                    key: key.to_string(),
                    subject: subject.to_string(),
                    content: content.to_string(),
                })
            })
            .collect()
    }
}

/// Notification statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationStats {
    pub records_created: u64,
    pub mail_sent: u64,
    pub mail_failed: u64,
    pub mail_skipped: u64,
}

/// Delivery side of reminders and event announcements
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Record a reminder for `account_id` about `event`
    async fn notify(&self, account_id: i64, event: &Event, label: ReminderLabel) -> Result<Notification>;

    /// Record `message` for every recipient, returning how many records were created.
    /// `subject` heads the mail copy.
    async fn broadcast(&self, recipients: &[i64], subject: &str, message: &str) -> Result<usize>;
}

/// Notification service backed by the event store and a mail sender
pub struct NotificationService {
    store: Arc<dyn EventStore>,
    mailer: Arc<dyn MailSender>,
    templates: Arc<TemplateRegistry>,
    stats: Mutex<NotificationStats>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn EventStore>, mailer: Arc<dyn MailSender>, templates: Arc<TemplateRegistry>) -> Self {
        Self {
            store,
            mailer,
            templates,
            stats: Mutex::new(NotificationStats::default()),
        }
    }

    /// Persist the record, then try email
    async fn deliver(&self, recipient_id: i64, subject: &str, message: &str) -> Result<Notification> {
        let notification = self.store.insert_notification(recipient_id, message).await?;
        self.update_stats(|stats| stats.records_created += 1);

        let email = match self.store.find_account(recipient_id).await {
            Ok(Some(account)) => account.email,
            Ok(None) => None,
            Err(e) => {
                warn!(recipient_id = recipient_id, error = %e, "Could not look up recipient address");
                None
            }
        };

        let Some(to) = email else {
            debug!(recipient_id = recipient_id, "No email address, in-app notification only");
            self.update_stats(|stats| stats.mail_skipped += 1);
            return Ok(notification);
        };

        let mail = OutgoingMail {
            to,
            subject: subject.to_string(),
            text: message.to_string(),
        };

        match self.mailer.send(&mail).await {
            Ok(()) => self.update_stats(|stats| stats.mail_sent += 1),
            Err(e) => {
                warn!(recipient_id = recipient_id, notification_id = notification.id, error = %e,
                      "Email delivery failed, keeping notification record");
                self.update_stats(|stats| stats.mail_failed += 1);
            }
        }

        Ok(notification)
    }

    fn update_stats(&self, update: impl FnOnce(&mut NotificationStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    /// Get notification statistics
    pub fn get_stats(&self) -> NotificationStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Notifications of `recipient_id`, newest first
    pub async fn list_notifications(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        self.store.list_notifications(recipient_id).await
    }

    pub async fn unread_count(&self, recipient_id: i64) -> Result<i64> {
        self.store.count_unread_notifications(recipient_id).await
    }

    /// Mark a notification as read. Only its recipient may do so.
    pub async fn mark_as_read(&self, recipient_id: i64, notification_id: i64) -> Result<Notification> {
        let notification = self.store.find_notification(notification_id).await?
            .ok_or(UniHubError::NotificationNotFound { notification_id })?;

        if notification.recipient_id != recipient_id {
            return Err(UniHubError::PermissionDenied(format!(
                "Notification {} belongs to another account", notification_id
            )));
        }

        if notification.is_read {
            return Ok(notification);
        }

        self.store.mark_notification_read(notification_id).await
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn notify(&self, account_id: i64, event: &Event, label: ReminderLabel) -> Result<Notification> {
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event.name.clone());
        parameters.insert("label".to_string(), label.to_string());

        let message = self.templates.format_message("event_reminder", &parameters)?;
        let subject = self.templates.subject("event_reminder")?.to_string();

        let notification = self.deliver(account_id, &subject, &message).await?;
        info!(account_id = account_id, event_id = event.id, label = %label, "Reminder notification created");
        Ok(notification)
    }

    async fn broadcast(&self, recipients: &[i64], subject: &str, message: &str) -> Result<usize> {
        info!(count = recipients.len(), "Broadcasting notification");

        let mut delivered = 0;
        for &recipient_id in recipients {
            match self.deliver(recipient_id, subject, message).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!(recipient_id = recipient_id, error = %e, "Failed to record broadcast notification"),
            }
        }

        info!(total = recipients.len(), delivered = delivered, "Broadcast completed");
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use crate::database::MemoryEventStore;
    use crate::services::clock::ManualClock;
    use crate::services::mail::LogMailSender;
    use crate::utils::errors::MailResult;

    struct FailingMailer;

    #[async_trait]
    impl MailSender for FailingMailer {
        async fn send(&self, _mail: &OutgoingMail) -> MailResult<()> {
            Err(crate::utils::errors::MailError::RequestFailed("connection refused".to_string()))
        }
    }

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2025, 7, 1, 18, 0, 0).unwrap();
        Event {
            id: 7,
            society_id: 1,
            name: "Chess Night".to_string(),
            details: String::new(),
            location: "Room 4".to_string(),
            start_time: start,
            end_time: start + chrono::Duration::hours(2),
            online: false,
            interest_count: 0,
            interests: vec![],
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_format_message() {
        let templates = TemplateRegistry::new();
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), "Chess Night".to_string());
        parameters.insert("label".to_string(), ReminderLabel::InOneHour.to_string());

        let result = templates.format_message("event_reminder", &parameters).unwrap();
        assert_eq!(result, "The event 'Chess Night' starts in 1 hour!");
        assert!(templates.format_message("missing", &parameters).is_err());
    }

    #[test]
    fn test_event_message_uses_local_time() {
        let templates = TemplateRegistry::new();
        let clock = ManualClock::new(Utc::now()).with_timezone(chrono_tz::Europe::London);

        let message = templates.event_message("event_created", &event(), &clock).unwrap();
        assert!(message.contains("2025-07-01 19:00 BST"));
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_record() {
        let store = Arc::new(MemoryEventStore::new());
        let account = store.add_account("Ada", Some("ada@uni.test"), false);
        let service = NotificationService::new(store.clone(), Arc::new(FailingMailer), Arc::new(TemplateRegistry::new()));

        let notification = service.notify(account.id, &event(), ReminderLabel::Now).await.unwrap();
        assert_eq!(notification.message, "The event 'Chess Night' starts now!");
        assert_eq!(service.unread_count(account.id).await.unwrap(), 1);

        let stats = service.get_stats();
        assert_eq!(stats.records_created, 1);
        assert_eq!(stats.mail_failed, 1);
    }

    #[tokio::test]
    async fn test_mark_as_read_requires_recipient() {
        let store = Arc::new(MemoryEventStore::new());
        let owner = store.add_account("Ada", None, false);
        let other = store.add_account("Bob", None, false);
        let service = NotificationService::new(store.clone(), Arc::new(LogMailSender), Arc::new(TemplateRegistry::new()));

        let delivered = service.broadcast(&[owner.id], "Notice", "Hello").await.unwrap();
        assert_eq!(delivered, 1);
        let notification = service.list_notifications(owner.id).await.unwrap().remove(0);

        assert_matches!(
            service.mark_as_read(other.id, notification.id).await,
            Err(UniHubError::PermissionDenied(_))
        );
        assert!(service.mark_as_read(owner.id, notification.id).await.unwrap().is_read);
        assert_eq!(service.unread_count(owner.id).await.unwrap(), 0);
        assert_eq!(service.get_stats().mail_skipped, 1);
    }
}
