// Core layer - shared types and configuration
pub mod core;

// Features layer - storage, reminders, delivery and background tasks
pub mod features;

pub use core::{Config, ReminderError, Result};
pub use features::{
    BackgroundNotifier, BackgroundSaver, CreateReminder, EditReminder, FileReminderRepository,
    FileStore, HttpNotifierClient, NotificationOutcome, NotifierClient, Reminder,
    ReminderRepository, ReminderService, ReminderStatus, TaskState,
};
