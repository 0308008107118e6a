use clap::Parser;
use cloud_exporter::{
    Args, Exposition, HttpCloudClient, ServiceExporter, init_metrics, init_tracing, run_exporters,
};
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let config = Args::parse().load()?;

    let provider = init_tracing(config.log_format)?;
    let exposition = Exposition::new();
    let server = init_metrics(config.listen, exposition.clone()).await?;

    let client = HttpCloudClient::new(
        config.token()?,
        config.endpoint_type.clone(),
        config.endpoints.clone(),
        config.request_timeout(),
    )?;
    let exporters = ServiceExporter::for_services(
        &config.services,
        &config.prefix,
        &config.policy(),
        config.collect_time,
    )?;
    info!(
        listen = %config.listen,
        services = ?config.services,
        interval_secs = config.interval_secs,
        "starting exporter"
    );

    let jh = run_exporters(
        exporters,
        Arc::new(client),
        config.schedule(),
        exposition,
        None,
    );
    tokio::pin!(jh);

    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
        res = &mut jh => {
            if let Err(err) = res {
                error!(%err, "exporter task failed");
            }
            info!("Exporter tasks exited");
        }
    }
    server.abort();

    // Flush any buffered spans to the collector.
    if let Some(provider) = provider {
        provider.shutdown()?;
    }
    Ok(())
}
