// Features layer - each feature is a self-contained module

pub mod background;
pub mod delivery;
pub mod reminders;
pub mod storage;

pub use background::{BackgroundNotifier, BackgroundSaver, TaskState};
pub use delivery::{HttpNotifierClient, NotificationOutcome, NotifierClient};
pub use reminders::{
    CreateReminder, EditReminder, FileReminderRepository, Reminder, ReminderRepository,
    ReminderService, ReminderStatus,
};
pub use storage::FileStore;
