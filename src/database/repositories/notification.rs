//! Notification repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::notification::Notification;
use crate::utils::errors::UniHubError;

#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a notification
    pub async fn create(&self, recipient_id: i64, message: &str) -> Result<Notification, UniHubError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (recipient_id, message, is_read, created_at)
            VALUES ($1, $2, FALSE, $3)
            RETURNING id, recipient_id, message, is_read, created_at
            "#
        )
        .bind(recipient_id)
        .bind(message)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Find notification by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Notification>, UniHubError> {
        let notification = sqlx::query_as::<_, Notification>(
            "SELECT id, recipient_id, message, is_read, created_at FROM notifications WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    /// Get a recipient's notifications, newest first
    pub async fn get_for_recipient(&self, recipient_id: i64) -> Result<Vec<Notification>, UniHubError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT id, recipient_id, message, is_read, created_at FROM notifications WHERE recipient_id = $1 ORDER BY created_at DESC, id DESC"
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Count unread notifications
    pub async fn count_unread(&self, recipient_id: i64) -> Result<i64, UniHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT is_read"
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Mark notification as read
    pub async fn mark_read(&self, id: i64) -> Result<Notification, UniHubError> {
        let notification = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 RETURNING id, recipient_id, message, is_read, created_at"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        notification.ok_or(UniHubError::NotificationNotFound { notification_id: id })
    }
}
