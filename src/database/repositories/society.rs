//! Society and account repository implementation
//!
//! Read-only: societies, accounts and memberships are managed elsewhere.

use sqlx::PgPool;
use crate::models::society::{Society, SocietyMembership, Account};
use crate::utils::errors::UniHubError;

#[derive(Debug, Clone)]
pub struct SocietyRepository {
    pool: PgPool,
}

impl SocietyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find society by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Society>, UniHubError> {
        let society = sqlx::query_as::<_, Society>(
            "SELECT id, name, description, created_at FROM societies WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(society)
    }

    /// Get an account's membership in a society
    pub async fn find_membership(&self, society_id: i64, account_id: i64) -> Result<Option<SocietyMembership>, UniHubError> {
        let membership = sqlx::query_as::<_, SocietyMembership>(
            "SELECT society_id, account_id, is_admin, joined_at FROM society_memberships WHERE society_id = $1 AND account_id = $2"
        )
        .bind(society_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    /// Get member account ids
    pub async fn get_member_ids(&self, society_id: i64) -> Result<Vec<i64>, UniHubError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT account_id FROM society_memberships WHERE society_id = $1 ORDER BY account_id ASC"
        )
        .bind(society_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    /// Find account by ID
    pub async fn find_account(&self, id: i64) -> Result<Option<Account>, UniHubError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, display_name, is_admin FROM accounts WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }
}
