//! Sweep background worker.
//!
//! Runs one kind of engine sweep on a periodic interval.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use crate::queue::{Engine, SweepKind, Trigger};

/// Worker that runs one sweep kind until shutdown.
pub struct SweepWorker {
    engine: Engine,
    kind: SweepKind,
    interval: Duration,
}

impl SweepWorker {
    pub fn new(engine: Engine, kind: SweepKind, interval: Duration) -> Self {
        Self {
            engine,
            kind,
            interval,
        }
    }

    /// Run the sweep loop until shutdown is signaled.
    ///
    /// The first sweep runs immediately. A sweep that overruns its interval
    /// delays the next one instead of stacking ticks, so runs of the same
    /// kind never overlap within a process.
    #[instrument(skip(self, shutdown), fields(sweep = %self.kind))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting sweep worker"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Sweep worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn run_once(&self) {
        let report = self.engine.run_sweep(self.kind, Trigger::Scheduled).await;
        match &report.error {
            Some(err) => error!(
                message = %report.message,
                error = %err,
                processed = report.stats.processed,
                failed = report.stats.failed,
                "Scheduled sweep reported errors"
            ),
            None => info!(
                message = %report.message,
                processed = report.stats.processed,
                changed = report.stats.changed,
                "Scheduled sweep complete"
            ),
        }
    }
}
