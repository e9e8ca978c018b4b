//! Orchestrator - one census run from start to finish
//!
//! LOAD_PREVIOUS → CONNECT_DB → CENSUS → PERSIST → LOG → FORMAT → NOTIFY →
//! CLOSE_DB. Any failing stage ends the run with its error. Once the
//! connection is open it is closed on every path. Nothing already written is
//! rolled back: if delivery fails, the snapshot and log entry stay.
//!
//! The log key is the time the run started; the report header is read from
//! the clock again when the report is formatted.

use crate::census::{CatalogConnector, CatalogSource, TableCensus};
use crate::error::AppResult;
use crate::notifier::Notifier;
use crate::snapshot::diff::{DeltaReport, Indicator, TIMESTAMP_FORMAT};
use crate::snapshot::{SnapshotStore, TableStats};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Log key of this run
    pub timestamp: String,
    pub table_count: usize,
    /// The message that was delivered
    pub report: String,
}

/// Wires the store, census, formatter and notifier together
pub struct Orchestrator<N> {
    store: SnapshotStore,
    notifier: N,
    clock: fn() -> DateTime<Utc>,
}

impl<N: Notifier> Orchestrator<N> {
    pub fn new(store: SnapshotStore, notifier: N) -> Self {
        Self {
            store,
            notifier,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, for reproducible timestamps
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Run against whatever `connector` opens
    pub async fn run<C: CatalogConnector>(&self, connector: &C) -> AppResult<RunSummary> {
        let previous = self.store.load_latest()?;
        if previous.is_empty() {
            info!("No previous snapshot, every table is compared against 0");
        }
        let started_at = (self.clock)();

        let source = connector.connect().await?;
        let outcome = self.run_with_source(&source, &previous, started_at).await;
        connector.close(source);

        outcome
    }

    /// Census through notification against any catalog source
    pub async fn run_with_source<S: CatalogSource>(
        &self,
        source: &S,
        previous: &TableStats,
        started_at: DateTime<Utc>,
    ) -> AppResult<RunSummary> {
        let current = TableCensus::collect(source).await?;

        self.store.save_latest(&current)?;

        let timestamp = started_at.format(TIMESTAMP_FORMAT).to_string();
        self.store.append_log(&timestamp, &current)?;

        let delta = DeltaReport::build(previous, &current);
        debug!(
            "Delta: {} up, {} down, {} unchanged, {} empty",
            delta.count(Indicator::Increase),
            delta.count(Indicator::Decrease),
            delta.count(Indicator::Unchanged),
            delta.count(Indicator::Empty)
        );
        let report = delta.render((self.clock)());

        self.notifier.send(&report).await?;
        info!("✅ Census of {} tables delivered", current.len());

        Ok(RunSummary {
            timestamp,
            table_count: current.len(),
            report,
        })
    }
}
