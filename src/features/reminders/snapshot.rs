//! In-memory working set: one id-keyed map plus a derived due-time index.
//!
//! The "uncompleted" view is never stored separately. A reminder is in it
//! exactly when its `(due_at, id)` pair is in the index, and the index is
//! maintained on every upsert/remove, so the two views cannot disagree.

use crate::features::reminders::model::Reminder;
use crate::features::reminders::repository::ReminderMap;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    reminders: ReminderMap,
    due_index: BTreeSet<(DateTime<Utc>, u64)>,
}

impl Snapshot {
    /// Build from a full set and the ids that should start out uncompleted.
    pub fn from_parts(all: ReminderMap, uncompleted: impl IntoIterator<Item = u64>) -> Self {
        let mut due_index = BTreeSet::new();
        for id in uncompleted {
            if let Some(reminder) = all.get(&id) {
                due_index.insert((reminder.due_at(), id));
            }
        }
        Snapshot {
            reminders: all,
            due_index,
        }
    }

    /// Every known reminder, ascending by id
    pub fn all(&self) -> &ReminderMap {
        &self.reminders
    }

    pub fn get(&self, id: u64) -> Option<&Reminder> {
        self.reminders.get(&id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.reminders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.reminders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reminders.is_empty()
    }

    /// Uncompleted reminders in due order
    pub fn uncompleted(&self) -> impl Iterator<Item = &Reminder> + '_ {
        self.due_index
            .iter()
            .filter_map(move |(_, id)| self.reminders.get(id))
    }

    pub fn uncompleted_len(&self) -> usize {
        self.due_index.len()
    }

    pub fn is_uncompleted(&self, id: u64) -> bool {
        self.reminders
            .get(&id)
            .map(|r| self.due_index.contains(&(r.due_at(), id)))
            .unwrap_or(false)
    }

    /// Uncompleted reminders with `due_at < until`, earliest first.
    ///
    /// Entries whose due time already passed are still undelivered (delivery
    /// outcomes always move a reminder out of its old index slot), so they are
    /// included rather than skipped.
    pub fn due_before(&self, until: DateTime<Utc>) -> Vec<&Reminder> {
        self.due_index
            .range(..(until, 0))
            .filter_map(|(_, id)| self.reminders.get(id))
            .collect()
    }

    /// Reminders in ascending id order, for persistence
    pub fn ordered(&self) -> Vec<Reminder> {
        self.reminders.values().cloned().collect()
    }

    /// Insert or replace, indexing it when it is pending and due after `now`.
    pub(crate) fn upsert(&mut self, reminder: Reminder, now: DateTime<Utc>) {
        if let Some(previous) = self.reminders.get(&reminder.id) {
            self.due_index.remove(&(previous.due_at(), previous.id));
        }
        if reminder.is_uncompleted_at(now) {
            self.due_index.insert((reminder.due_at(), reminder.id));
        }
        self.reminders.insert(reminder.id, reminder);
    }

    pub(crate) fn remove(&mut self, id: u64) -> Option<Reminder> {
        let removed = self.reminders.remove(&id)?;
        self.due_index.remove(&(removed.due_at(), id));
        Some(removed)
    }
}
