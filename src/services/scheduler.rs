//! Reminder scheduler
//!
//! Reminders are armed as one tokio task per handle. The coordinator persists
//! the reminder row before arming, and the firing callback claims that row by
//! handle before notifying. A reminder whose row was deleted or replaced in
//! the meantime is therefore never delivered, whichever side wins the race.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use crate::database::EventStore;
use crate::models::{ReminderHandle, ReminderJob};
use crate::services::clock::Clock;
use crate::services::notification::NotificationSink;
use crate::utils::errors::Result;
use crate::utils::logging::log_reminder_transition;

#[async_trait]
pub trait ReminderScheduler: Send + Sync {
    /// Arm `job` under `handle`. Arming an already armed handle replaces it.
    async fn arm(&self, handle: ReminderHandle, job: ReminderJob) -> Result<()>;

    /// Returns whether the reminder was still pending. Cancelling a reminder
    /// that already fired is a no-op.
    async fn cancel(&self, handle: ReminderHandle) -> Result<bool>;

    async fn pending_count(&self) -> usize;

    async fn shutdown(&self) -> Result<()>;
}

/// Invoked when an armed reminder comes due
#[async_trait]
pub trait ReminderCallback: Send + Sync {
    async fn fire(&self, handle: ReminderHandle, job: ReminderJob);
}

/// Timer tasks on the tokio runtime. Not durable across restarts; see
/// `EngagementCoordinator::restore_reminders`.
pub struct TokioReminderScheduler {
    clock: Arc<dyn Clock>,
    callback: Arc<dyn ReminderCallback>,
    /// Pending reminders (handle -> timer task)
    tasks: Arc<RwLock<HashMap<ReminderHandle, JoinHandle<()>>>>,
}

impl TokioReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>, callback: Arc<dyn ReminderCallback>) -> Self {
        Self {
            clock,
            callback,
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ReminderScheduler for TokioReminderScheduler {
    async fn arm(&self, handle: ReminderHandle, job: ReminderJob) -> Result<()> {
        // Past targets fire immediately
        let delay = (job.fire_at - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);

        debug!(handle = %handle, event_id = job.event_id, account_id = job.account_id,
               label = %job.label, delay_secs = delay.as_secs(), "Arming reminder");

        let tasks = self.tasks.clone();
        let callback = self.callback.clone();

        // The write guard is held across spawn and insert so the task cannot
        // deregister itself before it is registered.
        let mut pending = self.tasks.write().await;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Deregister first; once out of the map the task can no longer be aborted
            if tasks.write().await.remove(&handle).is_none() {
                return;
            }
            callback.fire(handle, job).await;
        });

        if let Some(previous) = pending.insert(handle, task) {
            previous.abort();
        }

        Ok(())
    }

    async fn cancel(&self, handle: ReminderHandle) -> Result<bool> {
        match self.tasks.write().await.remove(&handle) {
            Some(task) => {
                task.abort();
                debug!(handle = %handle, "Cancelled pending reminder");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn pending_count(&self) -> usize {
        self.tasks.read().await.len()
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down reminder scheduler");

        let mut tasks = self.tasks.write().await;
        for (handle, task) in tasks.drain() {
            debug!(handle = %handle, "Aborting reminder on shutdown");
            task.abort();
        }

        Ok(())
    }
}

/// Firing callback: claims the persisted reminder and hands it to the sink
pub struct ReminderDispatcher {
    store: Arc<dyn EventStore>,
    sink: Arc<dyn NotificationSink>,
}

impl ReminderDispatcher {
    pub fn new(store: Arc<dyn EventStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    async fn dispatch(&self, handle: ReminderHandle, job: &ReminderJob) -> Result<bool> {
        let claimed = self.store.take_reminder_by_handle(handle).await?;
        if claimed.is_none() {
            return Ok(false);
        }

        let event = match self.store.find_event(job.event_id).await? {
            Some(event) => event,
            None => return Ok(false),
        };
        if self.store.find_relation(job.event_id, job.account_id).await?.is_none() {
            return Ok(false);
        }

        self.sink.notify(job.account_id, &event, job.label).await?;
        Ok(true)
    }
}

#[async_trait]
impl ReminderCallback for ReminderDispatcher {
    async fn fire(&self, handle: ReminderHandle, job: ReminderJob) {
        match self.dispatch(handle, &job).await {
            Ok(true) => log_reminder_transition(job.event_id, job.account_id, job.label.as_str(), "fired"),
            Ok(false) => debug!(handle = %handle, "Reminder no longer current, skipping"),
            Err(e) => warn!(handle = %handle, event_id = job.event_id, account_id = job.account_id,
                            error = %e, "Failed to deliver reminder"),
        }
    }
}
