//! Reminder service: validated CRUD over the shared snapshot, plus the hooks
//! the background saver and notifier drive.
//!
//! Every operation goes through one `RwLock`. Mutations (create, edit, delete,
//! retry, groom) take the write half; fetch, snapshot and save take the read
//! half.

use crate::core::{ReminderError, Result};
use crate::features::reminders::model::{CreateReminder, EditReminder, Reminder, ReminderStatus};
use crate::features::reminders::repository::ReminderRepository;
use crate::features::reminders::snapshot::Snapshot;
use chrono::{Duration, Utc};
use log::{debug, info};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct ServiceState {
    ready: bool,
    snapshot: Snapshot,
}

pub struct ReminderService {
    repo: Arc<dyn ReminderRepository>,
    state: RwLock<ServiceState>,
}

impl ReminderService {
    pub fn new(repo: Arc<dyn ReminderRepository>) -> Self {
        ReminderService {
            repo,
            state: RwLock::new(ServiceState::default()),
        }
    }

    /// Load the persisted reminders. CRUD calls fail with `NotReady` until
    /// this has succeeded.
    pub async fn populate(&self) -> Result<()> {
        let now = Utc::now();
        let all = self.repo.filter_all().await?;
        let uncompleted = self
            .repo
            .filter(&|r: &Reminder| r.is_uncompleted_at(now))
            .await?;

        let snapshot = Snapshot::from_parts(all, uncompleted.into_keys());
        info!(
            "reminder service populated: {} reminder(s), {} uncompleted",
            snapshot.len(),
            snapshot.uncompleted_len()
        );

        let mut state = self.state.write().await;
        state.snapshot = snapshot;
        state.ready = true;
        Ok(())
    }

    pub async fn is_ready(&self) -> bool {
        self.state.read().await.ready
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.snapshot.len()
    }

    pub async fn create(&self, body: CreateReminder) -> Result<Reminder> {
        if body.title.trim().is_empty() {
            return Err(ReminderError::validation("title", "title cannot be empty"));
        }
        if body.message.trim().is_empty() {
            return Err(ReminderError::validation("message", "message cannot be empty"));
        }
        positive_span("duration", body.duration)?;
        positive_span("retry_period", body.retry_period)?;

        let mut state = self.state.write().await;
        ensure_ready(&state)?;

        let id = self.repo.next_id().await?;
        let now = Utc::now();
        let reminder = Reminder {
            id,
            title: body.title,
            message: body.message,
            duration: body.duration,
            retry_period: body.retry_period,
            created_at: now,
            modified_at: now,
            status: ReminderStatus::Pending,
        };
        state.snapshot.upsert(reminder.clone(), now);
        debug!("created reminder {id}, due at {}", reminder.due_at());
        Ok(reminder)
    }

    /// Apply a partial update. Blank strings and zero spans count as absent.
    pub async fn edit(&self, id: u64, body: EditReminder) -> Result<Reminder> {
        let mut state = self.state.write().await;
        ensure_ready(&state)?;

        let mut reminder = state
            .snapshot
            .get(id)
            .cloned()
            .ok_or(ReminderError::NotFound { ids: vec![id] })?;

        let mut changed = false;
        if let Some(title) = body.title.filter(|t| !t.trim().is_empty()) {
            reminder.title = title;
            changed = true;
        }
        if let Some(message) = body.message.filter(|m| !m.trim().is_empty()) {
            reminder.message = message;
            changed = true;
        }
        if let Some(duration) = supplied_span("duration", body.duration)? {
            reminder.duration = duration;
            changed = true;
        }
        if let Some(retry_period) = supplied_span("retry_period", body.retry_period)? {
            reminder.retry_period = retry_period;
            changed = true;
        }
        if !changed {
            return Err(ReminderError::Validation {
                field: None,
                message: "body must contain at least 1 of: 'title', 'message', 'duration', 'retry_period'"
                    .to_string(),
            });
        }

        let now = Utc::now();
        reminder.modified_at = now;
        reminder.status = ReminderStatus::Pending;
        state.snapshot.upsert(reminder.clone(), now);
        Ok(reminder)
    }

    /// All-or-nothing lookup, in request order.
    pub async fn fetch(&self, ids: &[u64]) -> Result<Vec<Reminder>> {
        let state = self.state.read().await;
        ensure_ready(&state)?;
        ensure_all_present(&state.snapshot, ids)?;

        Ok(ids
            .iter()
            .filter_map(|id| state.snapshot.get(*id).cloned())
            .collect())
    }

    /// All-or-nothing removal.
    pub async fn delete(&self, ids: &[u64]) -> Result<()> {
        let mut state = self.state.write().await;
        ensure_ready(&state)?;
        ensure_all_present(&state.snapshot, ids)?;

        for id in ids {
            state.snapshot.remove(*id);
        }
        Ok(())
    }

    /// Persist every reminder in ascending id order. Returns bytes written.
    pub(crate) async fn save(&self) -> Result<usize> {
        let reminders = {
            let state = self.state.read().await;
            ensure_ready(&state)?;
            state.snapshot.ordered()
        };

        let written = self.repo.save(&reminders).await?;
        if written > 0 && !reminders.is_empty() {
            info!("successfully saved snapshot: {} reminder(s)", reminders.len());
        }
        Ok(written)
    }

    /// Point-in-time copy for the notifier's scan.
    pub(crate) async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot.clone()
    }

    /// Whether `dispatched` is still the stored, uncompleted version.
    pub(crate) async fn is_current(&self, dispatched: &Reminder) -> bool {
        let state = self.state.read().await;
        current_version(&state.snapshot, dispatched).is_some()
    }

    /// Mark delivered reminders completed. Returns the ones actually groomed.
    pub(crate) async fn groom(&self, notified: &[Reminder]) -> Vec<Reminder> {
        if notified.is_empty() {
            return Vec::new();
        }

        let now = Utc::now();
        let mut state = self.state.write().await;
        let mut groomed = Vec::with_capacity(notified.len());
        for reminder in notified {
            let Some(mut current) = current_version(&state.snapshot, reminder) else {
                continue;
            };
            current.status = ReminderStatus::Completed;
            state.snapshot.upsert(current.clone(), now);
            groomed.push(current);
        }

        if !groomed.is_empty() {
            info!("snapshot grooming: {} record(s)", groomed.len());
        }
        groomed
    }

    /// Reschedule an unacknowledged reminder one retry period from now.
    pub(crate) async fn retry(&self, reminder: &Reminder) -> Option<Reminder> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let mut current = current_version(&state.snapshot, reminder)?;

        current.modified_at = now;
        current.duration = current.retry_period;
        current.status = ReminderStatus::Pending;
        info!(
            "retrying reminder {} after {}",
            current.id,
            format_span(current.duration)
        );
        state.snapshot.upsert(current.clone(), now);
        Some(current)
    }
}

fn ensure_ready(state: &ServiceState) -> Result<()> {
    if state.ready {
        Ok(())
    } else {
        Err(ReminderError::NotReady)
    }
}

fn ensure_all_present(snapshot: &Snapshot, ids: &[u64]) -> Result<()> {
    let mut seen = BTreeSet::new();
    let missing: Vec<u64> = ids
        .iter()
        .copied()
        .filter(|id| !snapshot.contains(*id) && seen.insert(*id))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReminderError::NotFound { ids: missing })
    }
}

fn supplied_span(field: &'static str, value: Option<Duration>) -> Result<Option<Duration>> {
    match value {
        Some(span) if span < Duration::zero() => Err(ReminderError::validation(
            field,
            format!("{} cannot be negative", field.replace('_', " ")),
        )),
        Some(span) if span > Duration::zero() => {
            storable_span(field, span)?;
            Ok(Some(span))
        }
        _ => Ok(None),
    }
}

fn positive_span(field: &'static str, span: Duration) -> Result<()> {
    if span <= Duration::zero() {
        return Err(ReminderError::validation(
            field,
            format!("{} must be positive", field.replace('_', " ")),
        ));
    }
    storable_span(field, span)
}

/// Spans are persisted as i64 nanoseconds; anything longer cannot be saved.
fn storable_span(field: &'static str, span: Duration) -> Result<()> {
    match span.num_nanoseconds() {
        Some(_) => Ok(()),
        None => Err(ReminderError::validation(
            field,
            format!("{} is too long", field.replace('_', " ")),
        )),
    }
}

/// The stored reminder, if the delivery outcome for `dispatched` still applies.
///
/// Outcomes for reminders deleted, edited or completed since dispatch are
/// dropped.
fn current_version(snapshot: &Snapshot, dispatched: &Reminder) -> Option<Reminder> {
    match snapshot.get(dispatched.id) {
        None => {
            debug!("reminder {} was deleted before its outcome arrived", dispatched.id);
            None
        }
        Some(current) if current.modified_at != dispatched.modified_at => {
            debug!("reminder {} changed after dispatch, dropping outcome", dispatched.id);
            None
        }
        Some(current) if current.is_completed() => None,
        Some(current) => Some(current.clone()),
    }
}

pub(crate) fn format_span(span: Duration) -> String {
    span.to_std()
        .map(|s| format!("{s:?}"))
        .unwrap_or_else(|_| span.to_string())
}
