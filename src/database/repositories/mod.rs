//! Database repositories module
//!
//! This module contains all repository implementations for data access

pub mod event;
pub mod society;
pub mod reminder;
pub mod chat;
pub mod notification;

// Re-export repositories
pub use event::EventRepository;
pub use society::SocietyRepository;
pub use reminder::ReminderRepository;
pub use chat::ChatRepository;
pub use notification::NotificationRepository;
