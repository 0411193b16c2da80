//! End-to-end export into a mock VictoriaMetrics server.

use std::collections::HashSet;
use std::sync::Arc;

use era5_reader::{hours_to_epoch_millis, Metric, Scanner};
use exporter::{run, PipelineConfig};
use test_utils::{
    era5_netcdf_file, synthetic_source, synthetic_value, MockVmServer, BASE_HOURS, CSV_PATH,
    PREFIX,
};
use vm_client::VmClient;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_netcdf_to_line_protocol() {
    let (_dir, path) = era5_netcdf_file(4, 6, 5);
    let server = MockVmServer::start().await;
    let client = VmClient::new(&server.url("/write"), 3, PREFIX).unwrap();
    let mut scanner = Scanner::open(&path, None).unwrap();

    let report = run(&mut scanner, Arc::new(client), PipelineConfig::new(3, 7).unwrap())
        .await
        .unwrap();
    scanner.close();

    assert_eq!(report.records, 4 * 6 * 5);
    assert_eq!(report.reported, report.records);

    let lines = server.received_lines();
    assert_eq!(lines.len(), 120);
    // 30 records per batch in chunks of 7 -> 5 requests per batch
    assert_eq!(server.requests().len(), 4 * 5);

    let unique: HashSet<&String> = lines.iter().collect();
    assert_eq!(unique.len(), 120, "every record is inserted exactly once");

    let first_ts = hours_to_epoch_millis(BASE_HOURS);
    let expected_first = format!(
        "era5,la=60.00,lo=-10.00 u10={},v10={},t2m={},sf={},tcc={},tp={} {}",
        synthetic_value(Metric::ZonalWind10m, 0, 0, 0),
        synthetic_value(Metric::MeridionalWind10m, 0, 0, 0),
        synthetic_value(Metric::Temperature2m, 0, 0, 0),
        synthetic_value(Metric::Snowfall, 0, 0, 0),
        synthetic_value(Metric::TotalCloudCover, 0, 0, 0),
        synthetic_value(Metric::TotalPrecipitation, 0, 0, 0),
        first_ts,
    );
    assert!(lines.contains(&expected_first), "missing {expected_first}");
}

#[tokio::test]
async fn test_memory_source_to_csv() {
    let server = MockVmServer::start().await;
    let client = VmClient::new(&server.url(CSV_PATH), 2, PREFIX).unwrap();
    let mut scanner = Scanner::new(synthetic_source(3, 4, 4), Some(2)).unwrap();

    let report = run(&mut scanner, Arc::new(client), PipelineConfig::new(2, 500).unwrap())
        .await
        .unwrap();

    assert_eq!(report.batches, 2);
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.path, CSV_PATH);
        assert!(request.query.as_deref().unwrap_or("").starts_with("format="));
        assert_eq!(request.body.lines().count(), 16);
        assert!(request.body.ends_with('\n'));
    }
}

#[tokio::test]
async fn test_rejecting_server_still_drains() {
    let server = MockVmServer::start_with_status(503).await;
    let client = VmClient::new(&server.url("/influx/api/v2/write"), 2, PREFIX).unwrap();
    let mut scanner = Scanner::new(synthetic_source(5, 2, 2), None).unwrap();

    let report = run(&mut scanner, Arc::new(client), PipelineConfig::new(2, 3).unwrap())
        .await
        .unwrap();

    assert_eq!(report.reported, 20);
    assert!(report.scan_error.is_none());
    assert_eq!(server.received_lines().len(), 20);
}

#[tokio::test]
async fn test_scan_failure_is_reported_not_raised() {
    let server = MockVmServer::start().await;
    let client = VmClient::new(&server.url("/write"), 1, PREFIX).unwrap();
    let source = synthetic_source(4, 2, 3).fail_reads_from(1);
    let mut scanner = Scanner::new(source, None).unwrap();

    let report = run(&mut scanner, Arc::new(client), PipelineConfig::new(1, 500).unwrap())
        .await
        .unwrap();

    assert_eq!(report.batches, 1);
    assert!(report.scan_error.is_some());
    assert_eq!(server.received_lines().len(), 6);
}
