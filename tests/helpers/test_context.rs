//! Test context for unified test setup

use std::sync::Arc;
use std::time::Duration as StdDuration;
use chrono::{DateTime, Duration, TimeZone, Utc};
use unihub::config::Settings;
use unihub::database::{EventStore, MemoryEventStore};
use unihub::models::{Account, CreateEventRequest, Event, Notification, Society};
use unihub::services::{AuthContext, EngagementCoordinator, LiveChatGate, MailSender, ManualClock, ServiceFactory};

/// Instant the manual clock starts at
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 8, 9, 0, 0).unwrap()
}

/// Start of the default test event
pub fn event_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap()
}

/// End of the default test event
pub fn event_end() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
}

/// Test configuration options
pub struct TestConfig {
    pub member_count: usize,
    pub with_emails: bool,
    pub counter_retry_attempts: u32,
    pub mailer: Option<Arc<dyn MailSender>>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            member_count: 3,
            with_emails: false,
            counter_retry_attempts: 3,
            mailer: None,
        }
    }
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub store: Arc<MemoryEventStore>,
    pub clock: Arc<ManualClock>,
    pub services: ServiceFactory,
    pub settings: Settings,
    pub society: Society,
    pub admin: Account,
    pub members: Vec<Account>,
    pub outsider: Account,
}

impl TestContext {
    pub fn new() -> Self {
        Self::new_with_config(TestConfig::default())
    }

    pub fn new_with_config(config: TestConfig) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut settings = Settings::default();
        settings.engagement.counter_retry_attempts = config.counter_retry_attempts;
        settings.engagement.counter_retry_backoff_ms = 0;

        let store = Arc::new(MemoryEventStore::new());
        let clock = Arc::new(ManualClock::new(test_now()));

        let email = |name: &str| config.with_emails.then(|| format!("{}@uni.test", name.to_lowercase()));

        let society = store.add_society("Chess Club");
        let admin = store.add_account("Admin", email("Admin").as_deref(), false);
        store.add_member(society.id, admin.id, true);

        let members = (0..config.member_count)
            .map(|i| {
                let name = format!("Member{}", i);
                let account = store.add_account(&name, email(&name).as_deref(), false);
                store.add_member(society.id, account.id, false);
                account
            })
            .collect();

        let outsider = store.add_account("Outsider", None, false);

        let services = match config.mailer {
            Some(mailer) => ServiceFactory::with_mailer(&settings, store.clone(), clock.clone(), mailer),
            None => ServiceFactory::new(&settings, store.clone(), clock.clone())
                .expect("Failed to build services"),
        };

        Self {
            store,
            clock,
            services,
            settings,
            society,
            admin,
            members,
            outsider,
        }
    }

    pub fn coordinator(&self) -> &EngagementCoordinator {
        &self.services.coordinator
    }

    pub fn live_chat(&self) -> &LiveChatGate {
        &self.services.live_chat
    }

    pub async fn admin_ctx(&self) -> AuthContext {
        self.services.auth_service.context(self.admin.id, self.society.id).await
            .expect("Failed to build admin context")
    }

    pub async fn member_ctx(&self, index: usize) -> AuthContext {
        self.services.auth_service.context(self.members[index].id, self.society.id).await
            .expect("Failed to build member context")
    }

    pub fn event_request(&self, online: bool) -> CreateEventRequest {
        CreateEventRequest {
            society_id: self.society.id,
            name: "Blitz Night".to_string(),
            details: "Five minute games".to_string(),
            location: "Union Room 2".to_string(),
            start_time: event_start(),
            end_time: event_end(),
            online,
            interests: vec!["chess".to_string()],
        }
    }

    /// Create the default event as the society admin
    pub async fn create_event(&self, online: bool) -> Event {
        let ctx = self.admin_ctx().await;
        self.coordinator().create_event(&ctx, self.event_request(online)).await
            .expect("Failed to create event")
    }

    /// Notifications of an account whose text contains `needle`
    pub async fn notifications_containing(&self, account_id: i64, needle: &str) -> Vec<Notification> {
        self.store.list_notifications(account_id).await
            .expect("Failed to list notifications")
            .into_iter()
            .filter(|n| n.message.contains(needle))
            .collect()
    }

    /// Poll until `account_id` has `expected` reminder notifications
    pub async fn wait_for_reminders(&self, account_id: i64, expected: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let found = self.notifications_containing(account_id, "' starts ").await;
            if found.len() >= expected {
                return found;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        self.notifications_containing(account_id, "' starts ").await
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }
}
