//! Database module
//!
//! This module handles the event store abstraction and its implementations

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{DatabasePool, PoolConfig, create_pool, run_migrations, health_check};
pub use memory::MemoryEventStore;
pub use repositories::{EventRepository, SocietyRepository, ReminderRepository, ChatRepository, NotificationRepository};
pub use service::DatabaseService;
pub use store::EventStore;
