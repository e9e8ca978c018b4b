//! rowwatch - table row-count census
//!
//! Counts the rows of every base table in a PostgreSQL database, stores the
//! counts next to the previous run's, and posts the difference to a chat
//! channel. Runs once per invocation and exits; schedule it externally.
//!
//! Exit codes: 0 success, 2 configuration, 3 snapshot storage,
//! 4 database connection, 5 census query, 6 notification delivery.

mod census;
mod config;
mod db;
mod error;
mod notifier;
mod orchestrator;
mod snapshot;

use crate::config::Settings;
use crate::db::PostgresConnector;
use crate::error::AppResult;
use crate::notifier::ChannelNotifier;
use crate::orchestrator::{Orchestrator, RunSummary};
use crate::snapshot::SnapshotStore;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting row-count census...");

    match run().await {
        Ok(summary) => {
            debug!("Delivered report:\n{}", summary.report);
            info!(
                "👋 Run {} complete: {} tables",
                summary.timestamp, summary.table_count
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> AppResult<RunSummary> {
    let settings = Settings::load()?;
    info!(
        "📋 Configuration loaded: {}@{}:{}/{}",
        settings.database.user,
        settings.database.host,
        settings.database.port,
        settings.database.database
    );

    let store = SnapshotStore::from_config(&settings.storage);
    info!(
        "📁 Snapshot files: {} (latest), {} (log)",
        store.latest_path().display(),
        store.log_path().display()
    );
    let notifier = ChannelNotifier::from_config(&settings.notifier)?;

    let connector = PostgresConnector::new(settings.database);
    Orchestrator::new(store, notifier).run(&connector).await
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rowwatch=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}
