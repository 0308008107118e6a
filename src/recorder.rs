//! The [`SampleRecorder`] publishes batches to the [`Exposition`].

use crate::{Batch, Exposition};
use tokio::sync::mpsc;
use tracing::{debug, instrument, trace};

/// Consumes batches from every poller and publishes each one as its group's
/// latest snapshot.
pub struct SampleRecorder {
    inbound: mpsc::Receiver<Batch>,
    exposition: Exposition,
    outbound: Option<mpsc::Sender<Batch>>,

    recorded: u64,
}

impl SampleRecorder {
    /// Create a recorder. Batches are forwarded to `outbound` after being
    /// recorded, if given.
    pub fn new(
        inbound: mpsc::Receiver<Batch>,
        exposition: Exposition,
        outbound: Option<mpsc::Sender<Batch>>,
    ) -> Self {
        Self {
            inbound,
            exposition,
            outbound,
            recorded: 0,
        }
    }

    #[instrument(skip_all, fields(service = batch.service(), group = batch.group()))]
    fn record(&mut self, batch: &Batch) {
        self.exposition.publish(batch);
        self.recorded += batch.len() as u64;
        if batch.is_empty() {
            debug!("group withdrawn");
        } else {
            trace!(samples = batch.len(), total = self.recorded, "recorded batch");
        }
    }

    /// Spawn the recorder task. It runs until every sender is gone.
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(batch) = self.inbound.recv().await {
                batch.span().in_scope(|| self.record(&batch));

                let forward_failed = match &self.outbound {
                    Some(outbound) => outbound.send(batch).await.is_err(),
                    None => false,
                };
                if forward_failed {
                    debug!("Outbound receiver dropped, stopping forwarding");
                    self.outbound = None;
                }
            }
            debug!(recorded = self.recorded, "all pollers gone, recorder exiting");
        })
    }
}
