//! ERA5 exporter.
//!
//! Streams an ERA5 NetCDF file into VictoriaMetrics.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use era5_reader::Scanner;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;
use vm_client::VmClient;

use exporter::config::parse_level;
use exporter::{pipeline, Args};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args
        .into_config()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))
        .context("Invalid configuration")?;

    if let Some(port) = config.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus metrics exporter initialized");
    }

    let client = VmClient::new(
        &config.vm_insert_url,
        config.pipeline.concurrency,
        &config.metric_prefix,
    )
    .inspect_err(|e| error!(error = %e, "Could not create new VM client"))
    .context("Could not create new VM client")?;
    info!(url = %client.insert_url(), encoding = client.encoding(), "VM client ready");

    let mut scanner = Scanner::open(&config.file, config.limit_hours)
        .inspect_err(|e| error!(error = %e, "Could not create an ERA5 scanner"))
        .with_context(|| format!("Could not create an ERA5 scanner for {}", config.file.display()))?;

    let summary = scanner.summary();
    info!(
        file = %config.file.display(),
        dimensions = ?summary.dimensions,
        metrics = ?summary.metrics,
        timestamps = summary.timestamps,
        latitudes = summary.latitudes,
        longitudes = summary.longitudes,
        total_records = summary.total_records,
        first_time = ?summary.first_time.map(|t| t.to_rfc3339()),
        last_time = ?summary.last_time.map(|t| t.to_rfc3339()),
        "ERA5 summary"
    );

    let report = pipeline::run(&mut scanner, Arc::new(client), config.pipeline).await?;
    scanner.close();

    if let Some(e) = &report.scan_error {
        warn!(error = %e, "Export stopped early");
    }
    info!(
        batches = report.batches,
        records = report.records,
        elapsed_secs = report.elapsed.as_secs(),
        "Export finished"
    );

    Ok(())
}
