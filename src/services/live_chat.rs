//! Live chat gate
//!
//! A chat is open while its event is ongoing and closes for good once an
//! admin posts the final message. The final message can never be deleted.

use std::sync::Arc;
use crate::config::ChatConfig;
use crate::database::EventStore;
use crate::models::{Event, EventStatus, LiveChatMessage, NewChatMessage};
use crate::services::auth::AuthContext;
use crate::services::clock::Clock;
use crate::services::status::event_status;
use crate::utils::errors::{UniHubError, Result};
use crate::utils::logging::log_chat_action;

pub struct LiveChatGate {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    final_message_text: String,
}

impl LiveChatGate {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>, config: &ChatConfig) -> Self {
        Self {
            store,
            clock,
            final_message_text: config.final_message_text.clone(),
        }
    }

    /// Post an ordinary message as a joined account
    pub async fn post_message(&self, event_id: i64, sender_id: i64, text: &str) -> Result<LiveChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return Err(UniHubError::Validation("Message text cannot be empty".to_string()));
        }

        let event = self.event(event_id).await?;
        self.check_open(&event, sender_id).await?;

        // The store rejects the insert if a final message landed meanwhile
        self.store.insert_message(NewChatMessage {
            event_id,
            sender_id,
            text: text.to_string(),
            is_final: false,
        }).await
    }

    /// Close the chat with the configured final message
    pub async fn post_final_message(&self, ctx: &AuthContext, event_id: i64) -> Result<LiveChatMessage> {
        let event = self.event(event_id).await?;
        ctx.require_society_admin(event.society_id)?;
        self.check_open(&event, ctx.account_id).await?;

        let message = self.store.insert_message(NewChatMessage {
            event_id,
            sender_id: ctx.account_id,
            text: self.final_message_text.clone(),
            is_final: true,
        }).await?;

        log_chat_action(event_id, ctx.account_id, "close", Some(message.id));
        Ok(message)
    }

    /// Remove a message from the chat of an event owned by `society_id`
    pub async fn delete_message(&self, ctx: &AuthContext, society_id: i64, event_id: i64, message_id: i64) -> Result<()> {
        ctx.require_society_admin(society_id)?;

        let event = self.event(event_id).await?;
        if event.society_id != society_id {
            return Err(UniHubError::EventNotFound { event_id });
        }

        let message = self.store.find_message(message_id).await?
            .filter(|m| m.event_id == event_id)
            .ok_or(UniHubError::MessageNotFound { message_id })?;
        if message.is_final {
            return Err(UniHubError::ProtectedMessage { message_id });
        }

        if !self.store.delete_message(message_id).await? {
            return Err(UniHubError::MessageNotFound { message_id });
        }

        log_chat_action(event_id, ctx.account_id, "delete", Some(message_id));
        Ok(())
    }

    /// Ordinary messages of the chat, oldest first
    pub async fn list_messages(&self, event_id: i64, viewer_id: i64) -> Result<Vec<LiveChatMessage>> {
        let event = self.event(event_id).await?;

        if self.store.find_relation(event_id, viewer_id).await?.is_none() {
            return Err(UniHubError::NotRegistered { event_id, account_id: viewer_id });
        }
        if event_status(&event, self.clock.now()) == EventStatus::Upcoming {
            return Err(UniHubError::NotStarted { event_id });
        }
        if !event.online {
            return Err(UniHubError::NoLiveChat { event_id });
        }

        self.store.list_messages(event_id, false).await
    }

    pub async fn has_chat_ended(&self, event_id: i64) -> Result<bool> {
        self.event(event_id).await?;
        Ok(self.store.find_final_message(event_id).await?.is_some())
    }

    async fn event(&self, event_id: i64) -> Result<Event> {
        self.store.find_event(event_id).await?
            .ok_or(UniHubError::EventNotFound { event_id })
    }

    /// Guards shared by ordinary and final messages: registration, status,
    /// closed chat, then online.
    async fn check_open(&self, event: &Event, sender_id: i64) -> Result<()> {
        let event_id = event.id;

        if self.store.find_relation(event_id, sender_id).await?.is_none() {
            return Err(UniHubError::NotRegistered { event_id, account_id: sender_id });
        }
        match event_status(event, self.clock.now()) {
            EventStatus::Upcoming => return Err(UniHubError::NotStarted { event_id }),
            EventStatus::Finished => return Err(UniHubError::ChatEnded { event_id }),
            EventStatus::Ongoing => {}
        }
        if self.store.find_final_message(event_id).await?.is_some() {
            return Err(UniHubError::ChatEnded { event_id });
        }
        if !event.online {
            return Err(UniHubError::NoLiveChat { event_id });
        }
        Ok(())
    }
}
