//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub engagement: EngagementConfig,
    pub chat: ChatConfig,
    pub mail: MailConfig,
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Engagement coordinator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngagementConfig {
    /// IANA zone used to present event times to members
    pub timezone: String,
    /// Attempts made for an interest counter adjustment before giving up
    pub counter_retry_attempts: u32,
    pub counter_retry_backoff_ms: u64,
}

/// Live chat configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatConfig {
    pub final_message_text: String,
}

/// Mail relay configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
    pub timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("UNIHUB").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::UniHubError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/unihub".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            engagement: EngagementConfig {
                timezone: "Europe/London".to_string(),
                counter_retry_attempts: 3,
                counter_retry_backoff_ms: 25,
            },
            chat: ChatConfig {
                final_message_text: "The chat has ended".to_string(),
            },
            mail: MailConfig {
                enabled: false,
                api_url: String::new(),
                api_key: String::new(),
                from_address: "no-reply@unihub.local".to_string(),
                timeout_seconds: 10,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_prefix: "unihub.log".to_string(),
            },
        }
    }
}
