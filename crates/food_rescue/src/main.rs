// Rust guideline compliant 2026-02-27

//! Food-rescue matching service entry point.
//!
//! Serves the REST API over either store:
//!
//! - `DATABASE_URL` unset: in-memory store, lost on exit.
//! - `DATABASE_URL=sqlite:food_rescue.db`: `SQLite` file, created on first run.
//!
//! SMS goes through Twilio when `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN` and
//! `TWILIO_PHONE_NUMBER` are all set; otherwise messages are only logged.
//!
//! # Usage
//!
//! ```text
//! RUST_LOG=info SEED_SAMPLE_DATA=true cargo run --bin food_rescue
//! RUST_LOG=info DATABASE_URL=sqlite:food_rescue.db cargo run --bin food_rescue
//! ```
//!
//! CTRL+C stops accepting requests, cancels pending notifications and exits.

mod adapters;
mod api;
mod config;
mod seed;

use std::sync::Arc;

use adapters::SmsGateway;
use adapters::log_notifier::LogNotifier;
use adapters::sqlite_store::SqliteStore;
use adapters::twilio_notifier::TwilioNotifier;
use anyhow::Context as _;
use api::AppState;
use config::Config;
use coordinator::{CoordinatorConfig, MatchCoordinator};
use domain::Store;
use impact::ImpactAccountant;
use memory_store::InMemoryStore;
use registry::RegistryConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the tracing subscriber before any async work.
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    // A missing .env file is normal.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("main.dotenv: {e}");
    }
    let config = Config::from_env().context("failed to read configuration")?;

    let mut registry_config = RegistryConfig::builder();
    if let Some(seed) = config.location_seed {
        registry_config = registry_config.seed(seed);
    }
    let registry_config = registry_config.build().context("failed to build registry config")?;
    let coordinator_config = CoordinatorConfig::builder()
        .notify_timeout(config.notify_timeout)
        .build()
        .context("failed to build coordinator config")?;
    let coordinator = MatchCoordinator::new(coordinator_config, &registry_config);

    let notifier = match config.twilio.clone() {
        Some(options) => SmsGateway::Twilio(
            TwilioNotifier::new(options, config.notify_timeout).context("failed to build SMS client")?,
        ),
        None => SmsGateway::Log(LogNotifier::new()),
    };
    tracing::info!(notifier = notifier.name(), "main.notifier.selected");

    match config.database_url.as_deref() {
        Some(url) => {
            let store = SqliteStore::connect(url).await.context("failed to open SQLite store")?;
            serve(store, notifier, coordinator, &config).await
        }
        None => {
            tracing::info!("main.store: in-memory");
            serve(InMemoryStore::new(), notifier, coordinator, &config).await
        }
    }
}

async fn serve<S: Store + 'static>(
    store: S,
    notifier: SmsGateway,
    coordinator: MatchCoordinator,
    config: &Config,
) -> anyhow::Result<()> {
    if config.seed_sample_data {
        seed::seed_sample_data(&store, coordinator.donations(), coordinator.shelters())
            .await
            .context("failed to seed sample data")?;
    }

    let state = Arc::new(AppState { store, notifier, coordinator, impact: ImpactAccountant::new() });
    let app = api::router(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("main.listening: http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    state.coordinator.shutdown().await;
    tracing::info!("main.stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler, run until killed.
        tracing::error!("main.shutdown: cannot listen for ctrl_c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("main.shutdown: ctrl_c received, draining");
}
