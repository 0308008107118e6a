//! Self metrics and the Prometheus endpoint. Start with [`init_metrics`].

use crate::{Error, Exposition, Result};
use axum::{
    Router, extract::State, http::header::CONTENT_TYPE, response::IntoResponse, routing::get,
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::{net::SocketAddr, sync::LazyLock};
use tokio::{net::TcpListener, task::JoinHandle};
use tracing::{error, info};

const CYCLES: &str = "cloud_exporter_cycles_total";
const CYCLES_DESC: &str = "Collection cycles run, per service";

const GROUP_FAILURES: &str = "cloud_exporter_group_failures_total";
const GROUP_FAILURES_DESC: &str = "Metric groups that failed to collect, per service and group";

const SAMPLES: &str = "cloud_exporter_samples_total";
const SAMPLES_DESC: &str = "Samples collected, per service";

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    metrics::describe_counter!(CYCLES, CYCLES_DESC);
    metrics::describe_counter!(GROUP_FAILURES, GROUP_FAILURES_DESC);
    metrics::describe_counter!(SAMPLES, SAMPLES_DESC);
});

pub(crate) fn record_cycle(service: &'static str) {
    counter!(CYCLES, "service" => service).increment(1);
}

pub(crate) fn record_failure(service: &'static str, group: &'static str) {
    counter!(GROUP_FAILURES, "service" => service, "group" => group).increment(1);
}

pub(crate) fn record_batch(service: &'static str, samples: usize) {
    counter!(SAMPLES, "service" => service).increment(samples as u64);
}

/// What a scrape sees: collected series first, then the exporter's own
/// counters.
#[derive(Clone)]
struct Scrape {
    exposition: Exposition,
    handle: PrometheusHandle,
}

impl Scrape {
    fn render(&self) -> String {
        let mut body = self.exposition.render();
        body.push_str(&self.handle.render());
        body
    }
}

async fn scrape(State(scrape): State<Scrape>) -> impl IntoResponse {
    ([(CONTENT_TYPE, TEXT_FORMAT)], scrape.render())
}

/// Install the recorder for the exporter's own counters and serve
/// `exposition` on `listen` at `/metrics`.
///
/// Returns the handle of the server task.
pub async fn init_metrics(listen: SocketAddr, exposition: Exposition) -> Result<JoinHandle<()>> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    LazyLock::force(&DESCRIBE);

    let app = Router::new()
        .route("/metrics", get(scrape))
        .with_state(Scrape { exposition, handle });

    let listener = TcpListener::bind(listen).await.map_err(Error::Io)?;
    info!(%listen, "serving metrics");

    Ok(tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(%err, "metrics server failed");
        }
    }))
}
