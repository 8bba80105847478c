//! Translation between the stored byte payload and reminder entities.

use crate::core::{ReminderError, Result};
use crate::features::reminders::model::{Reminder, ReminderStatus};
use crate::features::storage::FileStore;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Ordered id -> reminder mapping
pub type ReminderMap = BTreeMap<u64, Reminder>;

/// Predicate used by [`ReminderRepository::filter`]
pub type ReminderFilter<'a> = &'a (dyn Fn(&Reminder) -> bool + Send + Sync);

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    /// Persist the full reminder set, returning bytes written (0 if unchanged).
    async fn save(&self, reminders: &[Reminder]) -> Result<usize>;

    /// Decode every stored reminder and keep the ones matching `predicate`.
    async fn filter(&self, predicate: ReminderFilter<'_>) -> Result<ReminderMap>;

    async fn filter_all(&self) -> Result<ReminderMap> {
        self.filter(&|_: &Reminder| true).await
    }

    /// Next id from the durable counter.
    async fn next_id(&self) -> Result<u64>;
}

/// Repository backed by a [`FileStore`]
pub struct FileReminderRepository {
    store: Arc<FileStore>,
}

impl FileReminderRepository {
    pub fn new(store: Arc<FileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReminderRepository for FileReminderRepository {
    async fn save(&self, reminders: &[Reminder]) -> Result<usize> {
        let bytes = serde_json::to_vec(reminders)
            .map_err(|e| ReminderError::format("could not encode reminders", e))?;
        self.store.write(&bytes).await
    }

    async fn filter(&self, predicate: ReminderFilter<'_>) -> Result<ReminderMap> {
        let bytes = self.store.read().await;
        let reminders: Vec<Reminder> = serde_json::from_slice(&bytes)
            .map_err(|e| ReminderError::format("could not decode stored reminders", e))?;

        Ok(reminders
            .into_iter()
            .map(upgrade_legacy)
            .filter(|reminder| predicate(reminder))
            .map(|reminder| (reminder.id, reminder))
            .collect())
    }

    async fn next_id(&self) -> Result<u64> {
        self.store.generate_id().await
    }
}

/// Older data files marked completion with a negative duration.
fn upgrade_legacy(mut reminder: Reminder) -> Reminder {
    if reminder.duration < Duration::zero() {
        reminder.status = ReminderStatus::Completed;
    }
    reminder
}
