//! # Error Types
//!
//! Single error taxonomy shared by the store, the service and the background
//! tasks. The transport layer maps each variant to a status code through
//! [`ReminderError::status_code`] and [`ReminderError::error_type`].
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

use thiserror::Error;

/// Convenience result type for reminder operations.
pub type Result<T> = std::result::Result<T, ReminderError>;

#[derive(Debug, Error)]
pub enum ReminderError {
    /// Malformed or missing caller input.
    #[error("{message}")]
    Validation {
        field: Option<&'static str>,
        message: String,
    },

    /// One or more referenced reminders do not exist.
    #[error("could not find reminders with ids: {ids:?}")]
    NotFound { ids: Vec<u64> },

    /// CRUD call arrived before the service finished populating.
    #[error("reminder service is not ready")]
    NotReady,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Persisted data could not be decoded or encoded.
    #[error("{context}: {source}")]
    Format {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Downstream notifier unreachable or non-responsive.
    #[error("notifier transport error: {0}")]
    Transport(String),

    /// Background task lifecycle misuse (double start, stop after stop).
    #[error("invalid task state: {0}")]
    State(String),
}

impl ReminderError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ReminderError::Validation {
            field: Some(field),
            message: message.into(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReminderError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn format(context: impl Into<String>, source: serde_json::Error) -> Self {
        ReminderError::Format {
            context: context.into(),
            source,
        }
    }

    /// HTTP status the transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ReminderError::NotFound { .. } => 404,
            ReminderError::Validation { .. } => 400,
            _ => 500,
        }
    }

    /// Machine-readable error type for structured error bodies.
    pub fn error_type(&self) -> &'static str {
        match self {
            ReminderError::NotFound { .. } => "resource_not_found_error",
            ReminderError::Validation { field: Some(_), .. } => "data_validation_error",
            ReminderError::Validation { field: None, .. } => "format_validation_error",
            _ => "service_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ReminderError::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ReminderError::Validation { .. })
    }
}
