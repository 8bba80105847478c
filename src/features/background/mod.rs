//! # Feature: Background Tasks
//!
//! The two periodic tasks driving the reminder service: the saver flushes the
//! snapshot to disk and the notifier delivers due reminders. Both follow the
//! same Idle → Running → Stopped lifecycle; a stopped task cannot restart.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

mod lifecycle;
pub mod notifier;
pub mod saver;

pub use lifecycle::TaskState;
pub use notifier::BackgroundNotifier;
pub use saver::BackgroundSaver;
