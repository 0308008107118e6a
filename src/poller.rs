//! The per-service polling loop. This module contains the [`Poller`] struct.

use crate::{Batch, CloudClient, ServiceExporter};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc,
    time::{Instant, MissedTickBehavior},
};
use tracing::{Instrument, info, info_span, trace, warn};

/// How often to collect, and how long a cycle may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    /// Deadline for a whole cycle, measured from its start.
    pub timeout: Duration,
}

/// Runs one exporter's collection cycle at a fixed interval and sends the
/// resulting batches to the recorder.
pub struct Poller {
    exporter: ServiceExporter,
    client: Arc<dyn CloudClient>,
    schedule: Schedule,
    cycle: u64,

    outbound: mpsc::Sender<Batch>,
}

impl Poller {
    pub fn new(
        exporter: ServiceExporter,
        client: Arc<dyn CloudClient>,
        schedule: Schedule,
        outbound: mpsc::Sender<Batch>,
    ) -> Self {
        Self {
            exporter,
            client,
            schedule,
            cycle: 0,
            outbound,
        }
    }

    /// Run a single cycle and forward its batches. Returns `false` once the
    /// recorder is gone.
    async fn poll_once(&mut self) -> bool {
        let service = self.exporter.service().name;
        let span = info_span!("cycle", service, cycle = self.cycle);
        self.cycle = self.cycle.wrapping_add(1);

        let deadline = Instant::now() + self.schedule.timeout;
        let started = Instant::now();
        let report = self
            .exporter
            .collect(self.client.as_ref(), deadline)
            .instrument(span.clone())
            .await;
        crate::metrics::record_cycle(service);

        span.in_scope(|| {
            if report.is_healthy() {
                info!(
                    samples = report.sample_count(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cycle complete"
                );
            } else {
                warn!(
                    samples = report.sample_count(),
                    failed = report.failures.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cycle complete with failures"
                );
            }
        });

        for batch in report.batches {
            if self.outbound.send(batch).await.is_err() {
                return false;
            }
        }
        true
    }

    /// Poll until the recorder is gone.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.schedule.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if !self.poll_once().await {
                trace!("SampleRecorder dropped, exiting");
                break;
            }
        }
    }

    /// Spawn the poller in a new task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
