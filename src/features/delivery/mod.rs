//! # Feature: Delivery
//!
//! Client side of the downstream notifier. A reminder is posted as JSON and
//! the notifier answers with the user's action; only `dismissed` completes
//! the reminder.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod client;

pub use client::{HttpNotifierClient, NotificationOutcome, NotifierClient, DISMISSED_ACTION};
