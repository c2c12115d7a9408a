//! UniHub engagement coordinator
//!
//! Main application entry point. Connects the Postgres store, re-arms the
//! persisted reminders and keeps the scheduler running until interrupted.

use std::sync::Arc;
use tracing::{info, warn};

use unihub::{
    config::Settings,
    utils::logging,
    database::{DatabaseService, PoolConfig, create_pool, run_migrations},
    services::{ServiceFactory, SystemClock},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", unihub::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_config = PoolConfig::from(&settings.database);
    let db_pool = create_pool(&db_config).await?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&db_pool).await?;

    let store = Arc::new(DatabaseService::new(db_pool));
    let clock = Arc::new(SystemClock::new(&settings.engagement.timezone)?);

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings, store, clock)?;

    let restored = services.coordinator.restore_reminders().await?;
    info!(restored = restored, "UniHub coordinator is ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!(issue = %issue, "Service degraded at shutdown");
    }

    services.shutdown().await?;
    info!("UniHub coordinator has been shut down.");

    Ok(())
}
