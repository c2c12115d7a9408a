//! Postgres pool setup for the event store

use std::time::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::info;
use crate::utils::errors::UniHubError;

pub type DatabasePool = Pool<Postgres>;

/// Pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl PoolConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 1,
            // Joins wait on the pool while holding the per-event lock
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }

    /// Connection target with the password masked, for logs
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) => {
                if parsed.password().is_some() {
                    let _ = parsed.set_password(Some("***"));
                }
                parsed.to_string()
            }
            Err(_) => "<unparseable database url>".to_string(),
        }
    }
}

impl From<&crate::config::DatabaseConfig> for PoolConfig {
    fn from(settings: &crate::config::DatabaseConfig) -> Self {
        Self {
            max_connections: settings.max_connections,
            min_connections: settings.min_connections,
            ..Self::new(settings.url.clone())
        }
    }
}

/// Open the pool and make sure the server answers
pub async fn create_pool(config: &PoolConfig) -> Result<DatabasePool, UniHubError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .max_lifetime(config.max_lifetime)
        .connect(&config.url)
        .await?;

    health_check(&pool).await?;

    info!(target_db = %config.redacted_url(), max_connections = config.max_connections, "Event store pool ready");
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), UniHubError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Event store schema is up to date");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<(), UniHubError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
