//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the engagement coordinator.

use tracing::{info, warn, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::{UniHubError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer when dropped and must be held
/// for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.directory, &config.file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking))
        .try_init()
        .map_err(|e| UniHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log event management actions
pub fn log_event_action(event_id: i64, action: &str, account_id: i64, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        account_id = account_id,
        details = details,
        "Event action performed"
    );
}

/// Log a join or leave together with the resulting interest count
pub fn log_engagement_change(event_id: i64, account_id: i64, action: &str, interest_count: i32) {
    info!(
        event_id = event_id,
        account_id = account_id,
        action = action,
        interest_count = interest_count,
        "Engagement changed"
    );
}

/// Log a reminder state transition (armed, fired, cancelled, replaced)
pub fn log_reminder_transition(event_id: i64, account_id: i64, label: &str, transition: &str) {
    debug!(
        event_id = event_id,
        account_id = account_id,
        label = label,
        transition = transition,
        "Reminder transition"
    );
}

/// Log live chat moderation and closing actions
pub fn log_chat_action(event_id: i64, account_id: i64, action: &str, message_id: Option<i64>) {
    warn!(
        event_id = event_id,
        account_id = account_id,
        action = action,
        message_id = message_id,
        "Chat action performed"
    );
}
