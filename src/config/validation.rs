//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use crate::utils::errors::{UniHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_engagement_config(&settings.engagement)?;
    validate_chat_config(&settings.chat)?;
    validate_mail_config(&settings.mail)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(UniHubError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(UniHubError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(UniHubError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate engagement configuration
fn validate_engagement_config(config: &super::EngagementConfig) -> Result<()> {
    if config.timezone.parse::<chrono_tz::Tz>().is_err() {
        return Err(UniHubError::Config(
            format!("Unknown timezone: {}", config.timezone)
        ));
    }

    if config.counter_retry_attempts == 0 {
        return Err(UniHubError::Config(
            "Counter retry attempts must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate live chat configuration
fn validate_chat_config(config: &super::ChatConfig) -> Result<()> {
    if config.final_message_text.trim().is_empty() {
        return Err(UniHubError::Config(
            "Final chat message text is required".to_string()
        ));
    }

    Ok(())
}

/// Validate mail relay configuration
fn validate_mail_config(config: &super::MailConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    url::Url::parse(&config.api_url)
        .map_err(|e| UniHubError::Config(format!("Invalid mail API URL '{}': {}", config.api_url, e)))?;

    if config.timeout_seconds == 0 {
        return Err(UniHubError::Config(
            "Mail timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(UniHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(UniHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
