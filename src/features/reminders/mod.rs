//! # Feature: Reminders
//!
//! Reminder entities, the repository that maps them onto the file store, and
//! the service that owns the in-memory working set. The transport layer talks
//! to [`ReminderService`] only.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod model;
pub mod repository;
pub mod service;
pub mod snapshot;

pub use model::{CreateReminder, EditReminder, Reminder, ReminderStatus};
pub use repository::{FileReminderRepository, ReminderMap, ReminderRepository};
pub use service::ReminderService;
pub use snapshot::Snapshot;
