//! HTTP client for the downstream notifier service.

use crate::core::{ReminderError, Result};
use crate::features::reminders::Reminder;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// Action the notifier reports when the user acknowledged the notification
pub const DISMISSED_ACTION: &str = "dismissed";

/// Result of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// Acknowledged; the reminder is done
    Completed,
    /// Shown but not acknowledged (or no action reported)
    NotCompleted,
}

impl NotificationOutcome {
    pub fn from_action(action: Option<&str>) -> Self {
        match action {
            Some(DISMISSED_ACTION) => NotificationOutcome::Completed,
            _ => NotificationOutcome::NotCompleted,
        }
    }
}

#[async_trait]
pub trait NotifierClient: Send + Sync {
    /// Push `reminder` to the notifier. Transport failures are errors; the
    /// caller treats them like `NotCompleted`.
    async fn notify(&self, reminder: &Reminder) -> Result<NotificationOutcome>;
}

#[derive(Debug, Deserialize)]
struct NotifierResponse {
    #[serde(default)]
    action: Option<String>,
}

/// Posts reminders to `{base_url}/notify`
#[derive(Clone)]
pub struct HttpNotifierClient {
    notify_url: String,
    client: reqwest::Client,
}

impl HttpNotifierClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReminderError::Transport(format!("could not build HTTP client: {e}")))?;

        Ok(HttpNotifierClient {
            notify_url: format!("{}/notify", base_url.trim_end_matches('/')),
            client,
        })
    }

    pub fn notify_url(&self) -> &str {
        &self.notify_url
    }
}

#[async_trait]
impl NotifierClient for HttpNotifierClient {
    async fn notify(&self, reminder: &Reminder) -> Result<NotificationOutcome> {
        let response = self
            .client
            .post(&self.notify_url)
            .json(reminder)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReminderError::Transport("notifier service timed out".to_string())
                } else {
                    ReminderError::Transport(format!("notifier service is unavailable: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReminderError::Transport(format!(
                "notifier returned HTTP {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ReminderError::Transport(format!("could not read notifier response: {e}")))?;
        if body.iter().all(u8::is_ascii_whitespace) {
            debug!("notifier sent an empty body for reminder {}", reminder.id);
            return Ok(NotificationOutcome::NotCompleted);
        }

        let parsed: NotifierResponse = serde_json::from_slice(&body).map_err(|e| {
            ReminderError::Transport(format!("could not decode notifier response: {e}"))
        })?;
        Ok(NotificationOutcome::from_action(parsed.action.as_deref()))
    }
}
