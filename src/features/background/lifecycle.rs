//! Idle → Running → Stopped lifecycle shared by the periodic tasks.

use crate::core::{ReminderError, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    /// Terminal
    Stopped,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Idle => write!(f, "idle"),
            TaskState::Running => write!(f, "running"),
            TaskState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State, stop signal and join handle of one periodic task
pub(crate) struct TaskControl {
    name: &'static str,
    state: TaskState,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl TaskControl {
    pub(crate) fn new(name: &'static str) -> Self {
        TaskControl {
            name,
            state: TaskState::Idle,
            shutdown: None,
            handle: None,
        }
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    /// Idle → Running; returns the stop signal the loop should watch.
    pub(crate) fn begin(&mut self) -> Result<watch::Receiver<bool>> {
        if self.state != TaskState::Idle {
            return Err(ReminderError::State(format!(
                "cannot start {} while {}",
                self.name, self.state
            )));
        }
        let (tx, rx) = watch::channel(false);
        self.shutdown = Some(tx);
        self.state = TaskState::Running;
        Ok(rx)
    }

    pub(crate) fn attach(&mut self, handle: JoinHandle<()>) {
        self.handle = Some(handle);
    }

    /// Idle/Running → Stopped. Signals the loop and hands back its handle.
    pub(crate) fn finish(&mut self) -> Result<Option<JoinHandle<()>>> {
        if self.state == TaskState::Stopped {
            return Err(ReminderError::State(format!("{} already stopped", self.name)));
        }
        self.state = TaskState::Stopped;
        if let Some(tx) = self.shutdown.take() {
            // receiver gone means the loop already exited
            let _ = tx.send(true);
        }
        Ok(self.handle.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let mut control = TaskControl::new("saver");
        assert_eq!(control.state(), TaskState::Idle);

        let rx = control.begin().unwrap();
        assert_eq!(control.state(), TaskState::Running);
        assert!(matches!(control.begin(), Err(ReminderError::State(_))));

        assert!(control.finish().unwrap().is_none());
        assert!(*rx.borrow());
        assert_eq!(control.state(), TaskState::Stopped);

        assert!(matches!(control.finish(), Err(ReminderError::State(_))));
        assert!(matches!(control.begin(), Err(ReminderError::State(_))));
    }

    #[test]
    fn test_stop_from_idle_is_terminal() {
        let mut control = TaskControl::new("notifier");
        control.finish().unwrap();
        assert_eq!(control.state(), TaskState::Stopped);
        assert!(control.begin().is_err());
    }
}
