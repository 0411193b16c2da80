//! Pooled HTTP insert client.

use std::time::{Duration, Instant};

use era5_reader::Record;
use metrics::{counter, histogram};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use tracing::{debug, error, warn};

use crate::encoding::{self, RecordEncoder};
use crate::error::{ClientError, Result};
use crate::prefix::MetricPrefix;

/// Idle pooled connections are closed after this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Connection establishment timeout.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// What happened to one insert request.
///
/// Purely informational: failed inserts are logged and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The server answered 204 No Content
    Accepted,
    /// The server answered with another status code
    Rejected(u16),
    /// The request could not be sent or the response could not be read
    Failed,
}

/// VictoriaMetrics client inserting ERA5 records via one of the supported
/// text protocols.
///
/// Safe to share between tasks; every [`VmClient::insert`] is independent.
#[derive(Debug)]
pub struct VmClient {
    http: reqwest::Client,
    insert_url: Url,
    encoder: Box<dyn RecordEncoder>,
}

impl VmClient {
    /// Creates a client for `insert_url`.
    ///
    /// The URL path selects the wire encoding; any query parameters that
    /// encoding needs are appended to the URL. The connection pool keeps at
    /// most `max_connections` idle connections to the server.
    pub fn new(insert_url: &str, max_connections: usize, metric_prefix: &str) -> Result<Self> {
        let mut url = Url::parse(insert_url).map_err(|e| ClientError::InvalidUrl {
            url: insert_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: insert_url.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }

        let prefix = MetricPrefix::new(metric_prefix)?;

        if max_connections == 0 {
            return Err(ClientError::InvalidConfig(
                "max_connections must be at least 1".to_string(),
            ));
        }

        let encoder = encoding::resolve(url.path(), prefix)?;
        let params = encoder.query_params();
        if !params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &params {
                query.append_pair(name, value);
            }
        }

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(max_connections)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .connect_timeout(DIAL_TIMEOUT)
            .tcp_keepalive(DIAL_TIMEOUT)
            .build()?;

        debug!(url = %url, encoding = encoder.name(), max_connections, "Created VM client");

        Ok(Self {
            http,
            insert_url: url,
            encoder,
        })
    }

    /// Final insert URL, including injected query parameters.
    pub fn insert_url(&self) -> &Url {
        &self.insert_url
    }

    pub fn encoding(&self) -> &'static str {
        self.encoder.name()
    }

    /// Posts `records` in a single request.
    ///
    /// Failures are logged and reported through the returned outcome only.
    /// The response body is always drained so the connection can be reused.
    pub async fn insert(&self, records: &[Record]) -> InsertOutcome {
        let body = self.encoder.encode_batch(records);
        let started = Instant::now();
        counter!("vm_insert_requests_total").increment(1);

        let response = match self
            .http
            .post(self.insert_url.clone())
            .header(CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                counter!("vm_insert_failures_total").increment(1);
                error!(error = %e, records = records.len(), "Could not post data");
                return InsertOutcome::Failed;
            }
        };

        let status = response.status();
        let drained = response.bytes().await;
        histogram!("vm_insert_duration_ms").record(started.elapsed().as_secs_f64() * 1000.0);

        if status != StatusCode::NO_CONTENT {
            counter!("vm_insert_rejected_total").increment(1);
            warn!(code = status.as_u16(), records = records.len(), "Unexpected status");
            return InsertOutcome::Rejected(status.as_u16());
        }
        if let Err(e) = drained {
            counter!("vm_insert_failures_total").increment(1);
            error!(error = %e, "Failed to drain response body");
            return InsertOutcome::Failed;
        }

        counter!("vm_insert_records_total").increment(records.len() as u64);
        InsertOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_protocol_url_unchanged() {
        let client = VmClient::new("http://localhost:8428/write", 4, "era5").unwrap();
        assert_eq!(client.insert_url().as_str(), "http://localhost:8428/write");
        assert_eq!(client.encoding(), "influx-line-protocol");
    }

    #[test]
    fn test_csv_url_gets_format_param() {
        let client =
            VmClient::new("http://localhost:8428/api/v1/import/csv?extra_label=src=era5", 2, "era5")
                .unwrap();
        let query: Vec<(String, String)> = client.insert_url().query_pairs().into_owned().collect();

        assert_eq!(query[0], ("extra_label".to_string(), "src=era5".to_string()));
        assert_eq!(query[1].0, "format");
        assert!(query[1].1.starts_with("1:time:unix_ms,2:label:la,3:label:lo,4:metric:era5_u10"));
        assert_eq!(client.encoding(), "csv");
    }

    #[test]
    fn test_rejects_unsupported_endpoint() {
        let err = VmClient::new("http://localhost:8428/api/v1/import", 2, "era5").unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedEndpoint { .. }));
    }

    #[test]
    fn test_rejects_malformed_url() {
        let err = VmClient::new("not a url", 2, "era5").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));

        let err = VmClient::new("ftp://localhost/write", 2, "era5").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn test_rejects_invalid_prefix() {
        let err = VmClient::new("http://localhost:8428/write", 2, "era-5").unwrap_err();
        assert!(matches!(err, ClientError::InvalidMetricPrefix(_)));
    }

    #[test]
    fn test_rejects_zero_connections() {
        let err = VmClient::new("http://localhost:8428/write", 0, "era5").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig(_)));
    }
}
