//! Reminder entity and request bodies.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Delivery status of a reminder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    /// Waiting for its due time or for a retry
    #[default]
    Pending,
    /// The notifier acknowledged delivery
    Completed,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderStatus::Pending => write!(f, "pending"),
            ReminderStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A reminder record as stored and as sent to the notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: u64,
    pub title: String,
    pub message: String,

    /// Time remaining until due, counted from `modified_at`
    #[serde(with = "duration_nanos")]
    pub duration: Duration,

    /// Delay applied after an unacknowledged delivery
    #[serde(with = "duration_nanos")]
    pub retry_period: Duration,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,

    #[serde(default)]
    pub status: ReminderStatus,
}

impl Reminder {
    /// The instant this reminder becomes eligible for notification
    pub fn due_at(&self) -> DateTime<Utc> {
        match self.modified_at.checked_add_signed(self.duration) {
            Some(due) => due,
            None if self.duration < Duration::zero() => DateTime::<Utc>::MIN_UTC,
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ReminderStatus::Completed
    }

    /// Pending and due strictly after `now`
    pub fn is_uncompleted_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed() && self.due_at() > now
    }
}

/// Body for creating a reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateReminder {
    pub title: String,
    pub message: String,
    pub duration: Duration,
    pub retry_period: Duration,
}

/// Partial update; `None`, blank strings and zero spans are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditReminder {
    pub title: Option<String>,
    pub message: Option<String>,
    pub duration: Option<Duration>,
    pub retry_period: Option<Duration>,
}

/// Time spans are stored as integer nanoseconds.
pub(crate) mod duration_nanos {
    use chrono::Duration;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.num_nanoseconds() {
            Some(nanos) => serializer.serialize_i64(nanos),
            None => Err(serde::ser::Error::custom("duration overflows i64 nanoseconds")),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = i64::deserialize(deserializer).map_err(de::Error::custom)?;
        Ok(Duration::nanoseconds(nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Reminder {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        Reminder {
            id: 7,
            title: "Pay rent".to_string(),
            message: "due today".to_string(),
            duration: Duration::seconds(2),
            retry_period: Duration::seconds(5),
            created_at: at,
            modified_at: at,
            status: ReminderStatus::Pending,
        }
    }

    #[test]
    fn test_due_at_is_modified_plus_duration() {
        let reminder = sample();
        assert_eq!(reminder.due_at(), reminder.modified_at + Duration::seconds(2));
        assert!(reminder.is_uncompleted_at(reminder.modified_at));
        assert!(!reminder.is_uncompleted_at(reminder.due_at()));
    }

    #[test]
    fn test_due_at_saturates_instead_of_overflowing() {
        let mut reminder = sample();
        reminder.duration = Duration::milliseconds(i64::MAX);
        assert_eq!(reminder.due_at(), DateTime::<Utc>::MAX_UTC);

        reminder.duration = Duration::milliseconds(-i64::MAX);
        assert_eq!(reminder.due_at(), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_durations_serialize_as_nanoseconds() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["duration"], 2_000_000_000i64);
        assert_eq!(json["retry_period"], 5_000_000_000i64);
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let raw = r#"{"id":1,"title":"t","message":"m","duration":1000,"retry_period":1000,
            "created_at":"2026-03-01T09:00:00Z","modified_at":"2026-03-01T09:00:00Z"}"#;
        let reminder: Reminder = serde_json::from_str(raw).unwrap();
        assert_eq!(reminder.status, ReminderStatus::Pending);
        assert_eq!(reminder.duration, Duration::microseconds(1));
    }
}
