//! Error handling for UniHub
//!
//! This module defines the main error type used throughout the engagement
//! coordinator and maps every variant onto a small, caller-facing taxonomy.

use thiserror::Error;

/// Main error type for UniHub operations
#[derive(Error, Debug)]
pub enum UniHubError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Mail delivery error: {0}")]
    Mail(#[from] MailError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Account {account_id} is not a member of society {society_id}")]
    NotMemberOfSociety { society_id: i64, account_id: i64 },

    #[error("Account {account_id} has not joined event {event_id}")]
    NotRegistered { event_id: i64, account_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Society not found: {society_id}")]
    SocietyNotFound { society_id: i64 },

    #[error("Account not found: {account_id}")]
    AccountNotFound { account_id: i64 },

    #[error("Chat message not found: {message_id}")]
    MessageNotFound { message_id: i64 },

    #[error("Notification not found: {notification_id}")]
    NotificationNotFound { notification_id: i64 },

    #[error("Account {account_id} already joined event {event_id}")]
    AlreadyJoined { event_id: i64, account_id: i64 },

    #[error("Account {account_id} is not part of event {event_id}")]
    NotJoined { event_id: i64, account_id: i64 },

    #[error("The chat for event {event_id} has ended")]
    ChatEnded { event_id: i64 },

    #[error("Message {message_id} closes the chat and cannot be deleted")]
    ProtectedMessage { message_id: i64 },

    #[error("Event {event_id} has already finished")]
    EventFinished { event_id: i64 },

    #[error("Event {event_id} has not started yet")]
    NotStarted { event_id: i64 },

    #[error("Event {event_id} has no live chat")]
    NoLiveChat { event_id: i64 },

    #[error("Store contention: {0}")]
    StoreContention(String),

    #[error("Transient failure, retry later: {0}")]
    Transient(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mail relay specific errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail relay rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Mail relay request failed: {0}")]
    RequestFailed(String),

    #[error("Recipient has no email address")]
    MissingAddress,
}

/// Result type alias for UniHub operations
pub type Result<T> = std::result::Result<T, UniHubError>;

/// Result type alias for mail operations
pub type MailResult<T> = std::result::Result<T, MailError>;

/// Caller-facing error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    State,
    Transient,
    Internal,
}

impl UniHubError {
    /// Category of the failure as seen by the calling layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            UniHubError::Validation(_) => ErrorKind::Validation,
            UniHubError::PermissionDenied(_)
            | UniHubError::NotMemberOfSociety { .. }
            | UniHubError::NotRegistered { .. } => ErrorKind::Authorization,
            UniHubError::EventNotFound { .. }
            | UniHubError::SocietyNotFound { .. }
            | UniHubError::AccountNotFound { .. }
            | UniHubError::MessageNotFound { .. }
            | UniHubError::NotificationNotFound { .. } => ErrorKind::NotFound,
            UniHubError::AlreadyJoined { .. }
            | UniHubError::NotJoined { .. }
            | UniHubError::ChatEnded { .. }
            | UniHubError::ProtectedMessage { .. } => ErrorKind::Conflict,
            UniHubError::EventFinished { .. }
            | UniHubError::NotStarted { .. }
            | UniHubError::NoLiveChat { .. } => ErrorKind::State,
            UniHubError::StoreContention(_) | UniHubError::Transient(_) => ErrorKind::Transient,
            _ => ErrorKind::Internal,
        }
    }

    /// Check if a store operation that failed with this error may be retried
    pub fn is_transient(&self) -> bool {
        match self {
            UniHubError::StoreContention(_) => true,
            UniHubError::Database(sqlx::Error::PoolTimedOut) => true,
            UniHubError::Database(sqlx::Error::Io(_)) => true,
            UniHubError::Database(sqlx::Error::Database(db)) => {
                // serialization_failure, deadlock_detected, lock_not_available
                matches!(db.code().as_deref(), Some("40001") | Some("40P01") | Some("55P03"))
            }
            _ => false,
        }
    }

    /// Check if the caller can recover from the error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Internal) || self.is_transient()
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            UniHubError::Database(_) => ErrorSeverity::Critical,
            UniHubError::Migration(_) => ErrorSeverity::Critical,
            UniHubError::Config(_) => ErrorSeverity::Critical,
            UniHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            UniHubError::NotMemberOfSociety { .. } => ErrorSeverity::Warning,
            UniHubError::StoreContention(_) => ErrorSeverity::Warning,
            UniHubError::Mail(_) => ErrorSeverity::Warning,
            _ => match self.kind() {
                ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Conflict | ErrorKind::State => ErrorSeverity::Info,
                _ => ErrorSeverity::Error,
            },
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
