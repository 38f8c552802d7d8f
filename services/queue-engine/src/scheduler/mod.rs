//! Periodic sweeps.
//!
//! [`SweepScheduler`] owns one [`SweepWorker`] task per [`SweepKind`]. The
//! process entry point starts it once and stops it on shutdown; tests drive
//! it under paused tokio time.

mod worker;

pub use worker::SweepWorker;

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::queue::{Engine, SweepKind};

/// How often each sweep runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepIntervals {
    pub timeouts: Duration,
    pub deployment_start: Duration,
    pub relationships: Duration,
}

impl Default for SweepIntervals {
    fn default() -> Self {
        Self {
            timeouts: Duration::from_secs(60),
            deployment_start: Duration::from_secs(120),
            relationships: Duration::from_secs(600),
        }
    }
}

impl SweepIntervals {
    pub fn for_kind(&self, kind: SweepKind) -> Duration {
        match kind {
            SweepKind::Timeouts => self.timeouts,
            SweepKind::DeploymentStart => self.deployment_start,
            SweepKind::Relationships => self.relationships,
        }
    }
}

/// Starts and stops the sweep workers.
pub struct SweepScheduler {
    engine: Engine,
    intervals: SweepIntervals,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SweepScheduler {
    pub fn new(engine: Engine, intervals: SweepIntervals) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            engine,
            intervals,
            shutdown,
            handles: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
    }

    /// Spawns one worker per sweep kind. Does nothing if already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.shutdown.send_replace(false);

        for kind in SweepKind::ALL {
            let worker = SweepWorker::new(self.engine.clone(), kind, self.intervals.for_kind(kind));
            let shutdown = self.shutdown.subscribe();
            self.handles
                .push(tokio::spawn(async move { worker.run(shutdown).await }));
        }
        info!(workers = self.handles.len(), "Sweep scheduler started");
    }

    /// Signals every worker to stop and waits for them to exit.
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.shutdown.send_replace(true);

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sweep worker task failed");
            }
        }
        info!("Sweep scheduler stopped");
    }
}
