//! Periodic flush of the service snapshot to the file store.

use crate::core::Result;
use crate::features::background::lifecycle::{TaskControl, TaskState};
use crate::features::reminders::ReminderService;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub struct BackgroundSaver {
    service: Arc<ReminderService>,
    period: Duration,
    control: Mutex<TaskControl>,
}

impl BackgroundSaver {
    pub fn new(service: Arc<ReminderService>, period: Duration) -> Self {
        BackgroundSaver {
            service,
            period,
            control: Mutex::new(TaskControl::new("background saver")),
        }
    }

    pub async fn state(&self) -> TaskState {
        self.control.lock().await.state()
    }

    pub async fn start(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        let shutdown = control.begin()?;
        let handle = tokio::spawn(save_loop(self.service.clone(), self.period, shutdown));
        control.attach(handle);
        Ok(())
    }

    /// Stop ticking, then run one last save and report its outcome.
    pub async fn stop(&self) -> Result<usize> {
        let handle = self.control.lock().await.finish()?;
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("background saver task ended abnormally: {e}");
            }
        }

        let written = self.service.save().await?;
        info!("background saver stopped");
        Ok(written)
    }
}

async fn save_loop(
    service: Arc<ReminderService>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("background saver started (interval: {period:?})");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = service.save().await {
                    warn!("could not save records in background: {e}");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}
