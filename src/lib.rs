//! Prometheus exporter for cloud control plane resources.
//!
//! Each enabled cloud service (DNS, bare metal, networking, compute, images,
//! placement) gets a [`ServiceExporter`]: a registry of metric definitions
//! grouped into collection units. A [`Poller`] runs the exporter's collection cycle on a
//! [`Schedule`], listing every resource through the paginated API behind a
//! [`CloudClient`], and sends the resulting [`Batch`]es over an [`mpsc`]
//! channel to the [`SampleRecorder`]. The recorder publishes each batch to
//! the [`Exposition`] as its group's latest snapshot, which the Prometheus
//! endpoint started by [`init_metrics`] serves.
//!
//! A group either produces all of its samples or none of them. A failed
//! group is logged and counted, its previous samples are withdrawn, and the
//! exporter's `up` gauge drops to 0; other groups are unaffected.
//!
//! [`run_exporters`] wires pollers and the recorder together and returns a
//! [`JoinHandle`] that resolves when any of the tasks exits. An optional
//! outbound channel receives every batch after it is recorded.
//!
//! [`mpsc`]: tokio::sync::mpsc

pub mod aggregate;

pub mod client;
pub use client::{CloudClient, HttpCloudClient};

pub mod config;
pub use config::{Args, Config};

mod error;
pub use error::{Error, Result};

pub mod exporter;
pub use exporter::{Filter, MetricDef, Policy, ServiceExporter};

mod exposition;
pub use exposition::Exposition;

pub(crate) mod metrics;
pub use metrics::init_metrics;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub mod paginate;

mod poller;
pub use poller::{Poller, Schedule};

mod recorder;
pub use recorder::SampleRecorder;

pub mod resources;

mod sample;
pub use sample::{Batch, MetricDesc, MetricSample, Samples};

pub mod services;

pub mod status;

mod trace;
pub use trace::{LogFormat, init_tracing};

use std::sync::Arc;
use tokio::{
    sync::mpsc,
    task::{JoinHandle, JoinSet},
};

/// Start one poller per exporter and a shared recorder publishing to
/// `exposition`. If an outbound channel is provided, batches are sent to it
/// after being recorded.
pub fn run_exporters(
    exporters: Vec<ServiceExporter>,
    client: Arc<dyn CloudClient>,
    schedule: Schedule,
    exposition: Exposition,
    outbound: Option<mpsc::Sender<Batch>>,
) -> JoinHandle<()> {
    let (tx, rx) = mpsc::channel(64);

    let mut pollers = JoinSet::new();
    for exporter in exporters {
        exposition.describe(exporter.active_metrics());
        let poller = Poller::new(exporter, client.clone(), schedule, tx.clone());
        pollers.spawn(poller.run());
    }
    drop(tx);

    let recorder_handle = SampleRecorder::new(rx, exposition, outbound).spawn();

    tokio::spawn(async move {
        tokio::select! {
            _ = pollers.join_next() => {
                tracing::debug!("Poller task exited");
            }
            _ = recorder_handle => {
                tracing::debug!("Recorder task exited");
            }
        }
    })
}
