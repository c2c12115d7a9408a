//! Scheduled reminder repository implementation

use sqlx::PgPool;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::models::reminder::{ReminderHandle, ScheduledReminder};
use crate::utils::errors::UniHubError;

const REMINDER_COLUMNS: &str = "handle, account_id, event_id, label, fire_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct ReminderRow {
    handle: Uuid,
    account_id: i64,
    event_id: i64,
    label: String,
    fire_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReminderRow> for ScheduledReminder {
    type Error = UniHubError;

    fn try_from(row: ReminderRow) -> Result<Self, Self::Error> {
        Ok(ScheduledReminder {
            handle: ReminderHandle(row.handle),
            account_id: row.account_id,
            event_id: row.event_id,
            label: row.label.parse()?,
            fire_at: row.fire_at,
            created_at: row.created_at,
        })
    }
}

fn convert(rows: Vec<ReminderRow>) -> Result<Vec<ScheduledReminder>, UniHubError> {
    rows.into_iter().map(ScheduledReminder::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct ReminderRepository {
    pool: PgPool,
}

impl ReminderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the reminder for its (account, event, label) key
    pub async fn upsert(&self, reminder: ScheduledReminder) -> Result<Option<ScheduledReminder>, UniHubError> {
        let mut tx = self.pool.begin().await?;

        let previous = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders WHERE account_id = $1 AND event_id = $2 AND label = $3 FOR UPDATE"
        ))
        .bind(reminder.account_id)
        .bind(reminder.event_id)
        .bind(reminder.label.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO scheduled_reminders (handle, account_id, event_id, label, fire_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (account_id, event_id, label)
            DO UPDATE SET handle = EXCLUDED.handle, fire_at = EXCLUDED.fire_at, created_at = EXCLUDED.created_at
            "#
        )
        .bind(reminder.handle.0)
        .bind(reminder.account_id)
        .bind(reminder.event_id)
        .bind(reminder.label.as_str())
        .bind(reminder.fire_at)
        .bind(reminder.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        previous.map(ScheduledReminder::try_from).transpose()
    }

    /// Get reminders for an (event, account) pair
    pub async fn get_for_subscriber(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>, UniHubError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders WHERE event_id = $1 AND account_id = $2 ORDER BY fire_at ASC"
        ))
        .bind(event_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        convert(rows)
    }

    /// Get reminders for event
    pub async fn get_for_event(&self, event_id: i64) -> Result<Vec<ScheduledReminder>, UniHubError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders WHERE event_id = $1 ORDER BY fire_at ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        convert(rows)
    }

    /// Get every persisted reminder
    pub async fn get_all(&self) -> Result<Vec<ScheduledReminder>, UniHubError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM scheduled_reminders ORDER BY fire_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        convert(rows)
    }

    /// Claim the reminder armed under `handle`
    pub async fn take_by_handle(&self, handle: ReminderHandle) -> Result<Option<ScheduledReminder>, UniHubError> {
        let row = sqlx::query_as::<_, ReminderRow>(&format!(
            "DELETE FROM scheduled_reminders WHERE handle = $1 RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(handle.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ScheduledReminder::try_from).transpose()
    }

    /// Delete reminders for an (event, account) pair
    pub async fn delete_for_subscriber(&self, event_id: i64, account_id: i64) -> Result<Vec<ScheduledReminder>, UniHubError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "DELETE FROM scheduled_reminders WHERE event_id = $1 AND account_id = $2 RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(event_id)
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        convert(rows)
    }

    /// Delete reminders for event
    pub async fn delete_for_event(&self, event_id: i64) -> Result<Vec<ScheduledReminder>, UniHubError> {
        let rows = sqlx::query_as::<_, ReminderRow>(&format!(
            "DELETE FROM scheduled_reminders WHERE event_id = $1 RETURNING {REMINDER_COLUMNS}"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        convert(rows)
    }
}
