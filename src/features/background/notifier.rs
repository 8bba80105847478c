//! Periodic scan for due reminders and their delivery to the notifier.
//!
//! Every tick takes a snapshot and dispatches each uncompleted reminder due
//! before the next tick. A dispatched reminder gets its own task that sleeps
//! until `due_at`, then notifies under a shared concurrency limit. The
//! outcome is applied back through the service: `Completed` grooms the
//! reminder, anything else reschedules it one retry period out.

use crate::core::Result;
use crate::features::background::lifecycle::{TaskControl, TaskState};
use crate::features::delivery::{NotificationOutcome, NotifierClient};
use crate::features::reminders::{Reminder, ReminderService};
use dashmap::DashSet;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex, Semaphore};
use tokio::time::{interval, MissedTickBehavior};

const COMPLETION_CHANNEL_CAPACITY: usize = 256;

struct NotifierInner {
    service: Arc<ReminderService>,
    client: Arc<dyn NotifierClient>,
    period: Duration,
    in_flight: DashSet<u64>,
    permits: Arc<Semaphore>,
    completed_tx: broadcast::Sender<Reminder>,
}

pub struct BackgroundNotifier {
    inner: Arc<NotifierInner>,
    control: Mutex<TaskControl>,
}

impl BackgroundNotifier {
    pub fn new(
        service: Arc<ReminderService>,
        client: Arc<dyn NotifierClient>,
        period: Duration,
        max_concurrent: usize,
    ) -> Self {
        let (completed_tx, _) = broadcast::channel(COMPLETION_CHANNEL_CAPACITY);
        BackgroundNotifier {
            inner: Arc::new(NotifierInner {
                service,
                client,
                period,
                in_flight: DashSet::new(),
                permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
                completed_tx,
            }),
            control: Mutex::new(TaskControl::new("background notifier")),
        }
    }

    /// Receive every reminder the notifier marks completed from now on.
    pub fn subscribe_completions(&self) -> broadcast::Receiver<Reminder> {
        self.inner.completed_tx.subscribe()
    }

    pub async fn state(&self) -> TaskState {
        self.control.lock().await.state()
    }

    /// Reminders dispatched but whose outcome has not been applied yet
    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub async fn start(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        let shutdown = control.begin()?;
        let handle = tokio::spawn(scan_loop(self.inner.clone(), shutdown));
        control.attach(handle);
        Ok(())
    }

    /// Stop scanning. Deliveries still waiting for their due time are
    /// abandoned; ones already talking to the notifier run to completion.
    pub async fn stop(&self) -> Result<()> {
        let handle = self.control.lock().await.finish()?;
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("background notifier task ended abnormally: {e}");
            }
        }
        info!("background notifier stopped");
        Ok(())
    }
}

async fn scan_loop(inner: Arc<NotifierInner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(inner.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("background notifier started (interval: {:?})", inner.period);
    let dispatch_signal = shutdown.clone();

    loop {
        tokio::select! {
            _ = ticker.tick() => scan(&inner, &dispatch_signal).await,
            _ = shutdown.changed() => break,
        }
    }
}

async fn scan(inner: &Arc<NotifierInner>, shutdown: &watch::Receiver<bool>) {
    let window = match chrono::Duration::from_std(inner.period) {
        Ok(window) => window,
        Err(e) => {
            error!("notify interval out of range: {e}");
            return;
        }
    };
    let until = chrono::Utc::now() + window;
    let snapshot = inner.service.snapshot().await;

    let mut dispatched = 0;
    for reminder in snapshot.due_before(until) {
        if !inner.in_flight.insert(reminder.id) {
            continue;
        }
        dispatched += 1;
        tokio::spawn(deliver(inner.clone(), reminder.clone(), shutdown.clone()));
    }

    if dispatched > 0 {
        debug!("dispatched {dispatched} reminder(s) due before {until}");
    }
}

async fn deliver(
    inner: Arc<NotifierInner>,
    reminder: Reminder,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = reminder.id;
    let wait = (reminder.due_at() - chrono::Utc::now())
        .to_std()
        .unwrap_or(Duration::ZERO);

    let cancelled = tokio::select! {
        _ = tokio::time::sleep(wait) => false,
        _ = shutdown.changed() => true,
    };

    if cancelled || *shutdown.borrow() {
        debug!("abandoning pending delivery of reminder {id}");
    } else {
        deliver_now(&inner, &reminder).await;
    }

    inner.in_flight.remove(&id);
}

async fn deliver_now(inner: &NotifierInner, reminder: &Reminder) {
    let _permit = match inner.permits.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            error!("delivery limiter closed: {e}");
            return;
        }
    };

    // checked under the permit so a wait for a free slot cannot go stale
    if !inner.service.is_current(reminder).await {
        debug!("reminder {} changed while waiting, skipping delivery", reminder.id);
        return;
    }

    match inner.client.notify(reminder).await {
        Ok(NotificationOutcome::Completed) => {
            for groomed in inner.service.groom(std::slice::from_ref(reminder)).await {
                info!("reminder {} completed: {}", groomed.id, groomed.title);
                // no subscribers is fine
                let _ = inner.completed_tx.send(groomed);
            }
        }
        Ok(NotificationOutcome::NotCompleted) => {
            warn!("reminder {} was not dismissed", reminder.id);
            inner.service.retry(reminder).await;
        }
        Err(e) => {
            warn!("could not deliver reminder {}: {e}", reminder.id);
            inner.service.retry(reminder).await;
        }
    }
}
