use anyhow::{Context, Result};
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use reminders::core::Config;
use reminders::features::background::{BackgroundNotifier, BackgroundSaver};
use reminders::features::delivery::HttpNotifierClient;
use reminders::features::reminders::{FileReminderRepository, ReminderService};
use reminders::features::storage::FileStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminders service...");

    let store = Arc::new(FileStore::new(
        config.db_path.clone(),
        config.db_config_path.clone(),
    ));
    store
        .start()
        .await
        .with_context(|| format!("could not open {}", config.db_path.display()))?;

    let repo = Arc::new(FileReminderRepository::new(store.clone()));
    let service = Arc::new(ReminderService::new(repo));
    service
        .populate()
        .await
        .context("could not populate reminders from storage")?;
    info!("📄 Loaded {} reminder(s)", service.len().await);

    let client = Arc::new(HttpNotifierClient::new(
        &config.notifier_url,
        config.notifier_timeout,
    )?);
    info!("🔔 Delivering notifications to {}", client.notify_url());

    let saver = BackgroundSaver::new(service.clone(), config.save_interval);
    let notifier = BackgroundNotifier::new(
        service.clone(),
        client,
        config.notify_interval,
        config.max_concurrent_deliveries,
    );
    saver.start().await?;
    notifier.start().await?;

    wait_for_shutdown().await;
    info!("Shutting down...");

    if let Err(e) = notifier.stop().await {
        error!("could not stop notifier: {e}");
    }
    let saved = saver.stop().await;
    if let Err(e) = store.stop().await {
        error!("could not flush storage: {e}");
    }

    match saved {
        Ok(written) => {
            info!("Final save complete ({written} bytes written)");
            Ok(())
        }
        Err(e) => {
            error!("final save failed: {e}");
            Err(anyhow::Error::new(e).context("final save failed"))
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("could not install SIGTERM handler: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("could not listen for ctrl-c: {e}");
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("could not listen for ctrl-c: {e}");
            }
        }
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("could not listen for ctrl-c: {e}");
    }
}
