//! Swapwatch binary.
//!
//! Entry point for the watcher that polls the contract's event log and
//! forwards new events to the configured webhooks.

use std::sync::Arc;

use anyhow::Context;
use swapwatch_ledger::JsonRpcLedgerReader;
use swapwatch_watcher::{
    FileCheckpointStore, LogNotifier, Notifier, WatcherConfig, WatcherService, WebhookNotifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,swapwatch_watcher=debug,swapwatch_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = WatcherConfig::from_env().context("failed to read configuration")?;
    config.validate().context("invalid configuration")?;

    tracing::info!("Starting Swapwatch");
    tracing::info!("RPC URL: {}", config.rpc_url);
    tracing::info!("Contract: {}", config.contract_address);
    tracing::info!("Checkpoint: {}", config.checkpoint_path.display());

    let reader = JsonRpcLedgerReader::new(config.rpc_config()?)
        .context("failed to create ledger reader")?;
    reader
        .verify_contract()
        .await
        .context("contract check failed")?;

    let routes = config.webhook_routes();
    let notifier: Arc<dyn Notifier> = if routes.is_empty() {
        tracing::warn!("No webhooks configured, notifications go to the log only");
        Arc::new(LogNotifier::new())
    } else {
        let webhooks = WebhookNotifier::new(routes, config.request_timeout())
            .context("failed to create webhook notifier")?;
        for channel in webhooks.unrouted() {
            tracing::warn!("No webhook for {} channel, its notifications go to the log", channel);
        }
        Arc::new(webhooks)
    };

    let store = Arc::new(FileCheckpointStore::new(config.checkpoint_path.clone()));
    let service = Arc::new(
        WatcherService::load(config, Arc::new(reader), store, notifier)
            .await
            .context("failed to load checkpoint")?,
    );

    // Stop between cycles on Ctrl-C
    {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    service.stop();
                }
                Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
            }
        });
    }

    let result = service.run().await;

    let snapshot = service.metrics().snapshot();
    tracing::info!(
        "Processed {} cycles, {} events, {} notifications ({} failed) in {:?}",
        snapshot.poll_cycles,
        snapshot.events_classified,
        snapshot.notifications_sent,
        snapshot.notifications_failed,
        snapshot.uptime
    );
    tracing::info!("Final status: {}", service.status());

    result.context("watcher stopped with a fatal error")
}
