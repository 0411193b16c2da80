//! VictoriaMetrics insert client for ERA5 records.
//!
//! The insert URL decides how records are serialized: InfluxDB line protocol
//! for the `/write` family of endpoints, CSV for `/api/v1/import/csv`.
//! Encoding is chosen once in [`VmClient::new`]; unsupported endpoints are
//! rejected there rather than at insert time.
//!
//! Inserts are best effort. A failed request is logged and counted, never
//! retried, and never surfaced as an error to the caller.

pub mod client;
pub mod encoding;
pub mod error;
pub mod prefix;

pub use client::{InsertOutcome, VmClient, DIAL_TIMEOUT, IDLE_TIMEOUT};
pub use encoding::{resolve, supported_paths, CsvEncoder, LineProtocolEncoder, RecordEncoder};
pub use error::{ClientError, Result};
pub use prefix::MetricPrefix;
