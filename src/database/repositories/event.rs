//! Event repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::event::{Event, EngagementRelation, CreateEventRequest, UpdateEventRequest};
use crate::utils::errors::UniHubError;

const EVENT_COLUMNS: &str =
    "id, society_id, name, details, location, start_time, end_time, online, interest_count, interests, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, UniHubError> {
        let now = Utc::now();
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (society_id, name, details, location, start_time, end_time, online, interests, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(request.society_id)
        .bind(request.name)
        .bind(request.details)
        .bind(request.location)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.online)
        .bind(request.interests)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, UniHubError> {
        let event = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Update event
    pub async fn update(&self, id: i64, request: UpdateEventRequest) -> Result<Event, UniHubError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events
            SET name = COALESCE($2, name),
                details = COALESCE($3, details),
                location = COALESCE($4, location),
                start_time = COALESCE($5, start_time),
                end_time = COALESCE($6, end_time),
                online = COALESCE($7, online),
                interests = COALESCE($8, interests),
                updated_at = $9
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name)
        .bind(request.details)
        .bind(request.location)
        .bind(request.start_time)
        .bind(request.end_time)
        .bind(request.online)
        .bind(request.interests)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or(UniHubError::EventNotFound { event_id: id })
    }

    /// Delete event
    pub async fn delete(&self, id: i64) -> Result<bool, UniHubError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add `delta` to the interest count in a single statement, never going below zero
    pub async fn adjust_interest_count(&self, id: i64, delta: i32) -> Result<i32, UniHubError> {
        let count: Option<(i32,)> = sqlx::query_as(
            "UPDATE events SET interest_count = GREATEST(interest_count + $2, 0) WHERE id = $1 RETURNING interest_count"
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        count.map(|c| c.0).ok_or(UniHubError::EventNotFound { event_id: id })
    }

    /// Register an account's interest in an event
    pub async fn insert_relation(&self, event_id: i64, account_id: i64) -> Result<EngagementRelation, UniHubError> {
        let relation = sqlx::query_as::<_, EngagementRelation>(
            r#"
            INSERT INTO engagement_relations (event_id, account_id, joined_at)
            VALUES ($1, $2, $3)
            RETURNING event_id, account_id, joined_at
            "#
        )
        .bind(event_id)
        .bind(account_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                UniHubError::AlreadyJoined { event_id, account_id }
            }
            other => UniHubError::Database(other),
        })?;

        Ok(relation)
    }

    /// Find the relation for an (event, account) pair
    pub async fn find_relation(&self, event_id: i64, account_id: i64) -> Result<Option<EngagementRelation>, UniHubError> {
        let relation = sqlx::query_as::<_, EngagementRelation>(
            "SELECT event_id, account_id, joined_at FROM engagement_relations WHERE event_id = $1 AND account_id = $2"
        )
        .bind(event_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(relation)
    }

    /// Remove an account's interest in an event
    pub async fn delete_relation(&self, event_id: i64, account_id: i64) -> Result<bool, UniHubError> {
        let result = sqlx::query("DELETE FROM engagement_relations WHERE event_id = $1 AND account_id = $2")
            .bind(event_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get accounts subscribed to an event
    pub async fn get_subscribers(&self, event_id: i64) -> Result<Vec<i64>, UniHubError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT account_id FROM engagement_relations WHERE event_id = $1 ORDER BY account_id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Count relations for event
    pub async fn count_relations(&self, event_id: i64) -> Result<i64, UniHubError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM engagement_relations WHERE event_id = $1"
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    /// Delete every relation of an event
    pub async fn delete_relations_for_event(&self, event_id: i64) -> Result<u64, UniHubError> {
        let result = sqlx::query("DELETE FROM engagement_relations WHERE event_id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
