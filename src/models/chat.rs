//! Live chat message model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LiveChatMessage {
    pub id: i64,
    pub event_id: i64,
    pub sender_id: i64,
    pub text: String,
    /// Set on the single message that closes the chat
    pub is_final: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub event_id: i64,
    pub sender_id: i64,
    pub text: String,
    pub is_final: bool,
}
