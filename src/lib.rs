//! UniHub engagement coordinator
//!
//! Event engagement and notification core of a campus community platform.
//! This library tracks which accounts are interested in society events,
//! keeps each event's interest count consistent with those relations,
//! schedules reminder notifications before an event starts, and gates the
//! live chat that online events open while they are running.

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{UniHubError, ErrorKind, Result};

// Re-export main components for easy access
pub use database::{DatabaseService, EventStore, MemoryEventStore};
pub use services::{ServiceFactory, EngagementCoordinator, LiveChatGate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
