//! Services module
//!
//! This module contains the engagement business logic and its collaborators

pub mod auth;
pub mod clock;
pub mod coordinator;
pub mod live_chat;
pub mod mail;
pub mod notification;
pub mod scheduler;
pub mod status;

// Re-export commonly used services
pub use auth::{AuthService, AuthContext, Permission};
pub use clock::{Clock, SystemClock, ManualClock};
pub use coordinator::EngagementCoordinator;
pub use live_chat::LiveChatGate;
pub use mail::{MailSender, HttpMailSender, LogMailSender, OutgoingMail};
pub use notification::{NotificationService, NotificationSink, NotificationStats, MessageTemplate, TemplateRegistry};
pub use scheduler::{ReminderScheduler, ReminderCallback, TokioReminderScheduler, ReminderDispatcher};
pub use status::{event_status, status_at};

use std::sync::Arc;
use crate::config::settings::Settings;
use crate::database::EventStore;
use crate::utils::errors::Result;

/// Service factory wiring the coordinator to its collaborators
#[derive(Clone)]
pub struct ServiceFactory {
    pub store: Arc<dyn EventStore>,
    pub clock: Arc<dyn Clock>,
    pub auth_service: AuthService,
    pub notification_service: Arc<NotificationService>,
    pub scheduler: Arc<TokioReminderScheduler>,
    pub coordinator: Arc<EngagementCoordinator>,
    pub live_chat: Arc<LiveChatGate>,
    mail_enabled: bool,
}

impl ServiceFactory {
    /// Create a new ServiceFactory, picking the mail sender from settings
    pub fn new(settings: &Settings, store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let mailer: Arc<dyn MailSender> = if settings.mail.enabled {
            Arc::new(HttpMailSender::new(settings.mail.clone())?)
        } else {
            Arc::new(LogMailSender)
        };

        Ok(Self::with_mailer(settings, store, clock, mailer))
    }

    pub fn with_mailer(
        settings: &Settings,
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn MailSender>,
    ) -> Self {
        let templates = Arc::new(TemplateRegistry::new());
        let notification_service = Arc::new(NotificationService::new(store.clone(), mailer, templates.clone()));

        let dispatcher = Arc::new(ReminderDispatcher::new(store.clone(), notification_service.clone()));
        let scheduler = Arc::new(TokioReminderScheduler::new(clock.clone(), dispatcher));

        let coordinator = Arc::new(EngagementCoordinator::new(
            store.clone(),
            scheduler.clone(),
            notification_service.clone(),
            clock.clone(),
            templates,
            settings.engagement.clone(),
        ));
        let live_chat = Arc::new(LiveChatGate::new(store.clone(), clock.clone(), &settings.chat));
        let auth_service = AuthService::new(store.clone());

        Self {
            store,
            clock,
            auth_service,
            notification_service,
            scheduler,
            coordinator,
            live_chat,
            mail_enabled: settings.mail.enabled,
        }
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        ServiceHealthStatus {
            pending_reminders: self.scheduler.pending_count().await,
            mail_enabled: self.mail_enabled,
            notifications: self.notification_service.get_stats(),
        }
    }

    /// Stop all pending reminder timers
    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown().await
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub pending_reminders: usize,
    pub mail_enabled: bool,
    pub notifications: NotificationStats,
}

impl ServiceHealthStatus {
    /// Get list of degraded services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.mail_enabled && self.notifications.mail_failed > 0 {
            issues.push(format!("{} emails failed to send", self.notifications.mail_failed));
        }

        issues
    }
}
