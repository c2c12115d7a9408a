//! Live chat repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::chat::{LiveChatMessage, NewChatMessage};
use crate::utils::errors::UniHubError;

const MESSAGE_COLUMNS: &str = "id, event_id, sender_id, text, is_final, created_at";

#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a message unless the event's chat has been closed
    pub async fn create(&self, message: NewChatMessage) -> Result<LiveChatMessage, UniHubError> {
        let event_id = message.event_id;
        // The partial unique index rejects a second concurrent final message
        let stored = sqlx::query_as::<_, LiveChatMessage>(&format!(
            r#"
            INSERT INTO live_chat_messages (event_id, sender_id, text, is_final, created_at)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM live_chat_messages WHERE event_id = $1 AND is_final)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.event_id)
        .bind(message.sender_id)
        .bind(message.text)
        .bind(message.is_final)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => UniHubError::ChatEnded { event_id },
            other => UniHubError::Database(other),
        })?;

        stored.ok_or(UniHubError::ChatEnded { event_id })
    }

    /// Find message by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<LiveChatMessage>, UniHubError> {
        let message = sqlx::query_as::<_, LiveChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM live_chat_messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// Find the message that closed an event's chat
    pub async fn find_final(&self, event_id: i64) -> Result<Option<LiveChatMessage>, UniHubError> {
        let message = sqlx::query_as::<_, LiveChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM live_chat_messages WHERE event_id = $1 AND is_final"
        ))
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// List an event's messages, oldest first
    pub async fn list_for_event(&self, event_id: i64, include_final: bool) -> Result<Vec<LiveChatMessage>, UniHubError> {
        let messages = sqlx::query_as::<_, LiveChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM live_chat_messages WHERE event_id = $1 AND ($2 OR NOT is_final) ORDER BY created_at ASC, id ASC"
        ))
        .bind(event_id)
        .bind(include_final)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Delete an ordinary message
    pub async fn delete(&self, id: i64) -> Result<bool, UniHubError> {
        let result = sqlx::query("DELETE FROM live_chat_messages WHERE id = $1 AND NOT is_final")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.find_by_id(id).await? {
            Some(message) if message.is_final => Err(UniHubError::ProtectedMessage { message_id: id }),
            _ => Ok(false),
        }
    }

    /// Delete every message of an event, including the final one
    pub async fn delete_for_event(&self, event_id: i64) -> Result<u64, UniHubError> {
        let result = sqlx::query("DELETE FROM live_chat_messages WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
