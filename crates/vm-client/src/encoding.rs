//! Wire encodings for ERA5 records.
//!
//! VictoriaMetrics accepts several text formats; the insert URL path decides
//! which one is spoken. [`resolve`] maps a path to a [`RecordEncoder`] once,
//! at client construction time.
//!
//! | Path | Encoding |
//! |------|----------|
//! | `/influx/write`, `/influx/api/v2/write`, `/write`, `/api/v2/write` | InfluxDB line protocol |
//! | `/api/v1/import/csv` | CSV with a `format` column mapping |

use std::fmt::{self, Write};

use era5_reader::{Metric, Record};

use crate::error::{ClientError, Result};
use crate::prefix::MetricPrefix;

/// Serializes records into one wire format.
pub trait RecordEncoder: Send + Sync + fmt::Debug {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Appends one record, without a trailing newline.
    fn encode(&self, out: &mut String, record: &Record);

    /// Query parameters the endpoint needs to understand this encoding.
    fn query_params(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Encodes a batch as a request body, one newline-terminated line per record.
    fn encode_batch(&self, records: &[Record]) -> String {
        let mut out = String::with_capacity(records.len() * 96);
        for record in records {
            self.encode(&mut out, record);
            out.push('\n');
        }
        out
    }
}

/// InfluxDB line protocol:
/// `<prefix>,la=<lat>,lo=<lon> u10=<i>,v10=<i>,t2m=<i>,sf=<i>,tcc=<i>,tp=<i> <ms>`
#[derive(Debug, Clone)]
pub struct LineProtocolEncoder {
    prefix: MetricPrefix,
}

impl LineProtocolEncoder {
    pub fn new(prefix: MetricPrefix) -> Self {
        Self { prefix }
    }
}

impl RecordEncoder for LineProtocolEncoder {
    fn name(&self) -> &'static str {
        "influx-line-protocol"
    }

    fn encode(&self, out: &mut String, record: &Record) {
        out.push_str(self.prefix.as_str());
        out.push_str(",la=");
        push_coordinate(out, record.latitude);
        out.push_str(",lo=");
        push_coordinate(out, record.longitude);
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            out.push(if i == 0 { ' ' } else { ',' });
            let _ = write!(out, "{}={}", metric.short_name(), record.metric(metric));
        }
        let _ = write!(out, " {}", record.timestamp);
    }
}

/// CSV: `<ms>,<lat>,<lon>,<u10>,<v10>,<t2m>,<sf>,<tcc>,<tp>`
///
/// Column meaning is passed to VictoriaMetrics in the `format` query parameter.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    prefix: MetricPrefix,
}

impl CsvEncoder {
    pub fn new(prefix: MetricPrefix) -> Self {
        Self { prefix }
    }

    /// Column mapping for `/api/v1/import/csv`.
    pub fn format_param(&self) -> String {
        let mut format = String::from("1:time:unix_ms,2:label:la,3:label:lo");
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            let _ = write!(format, ",{}:metric:{}_{}", i + 4, self.prefix, metric.short_name());
        }
        format
    }
}

impl RecordEncoder for CsvEncoder {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn encode(&self, out: &mut String, record: &Record) {
        let _ = write!(out, "{},", record.timestamp);
        push_coordinate(out, record.latitude);
        out.push(',');
        push_coordinate(out, record.longitude);
        for metric in Metric::ALL {
            let _ = write!(out, ",{}", record.metric(metric));
        }
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![("format", self.format_param())]
    }
}

type EncoderFactory = fn(MetricPrefix) -> Box<dyn RecordEncoder>;

const ENDPOINTS: &[(&str, EncoderFactory)] = &[
    ("/influx/write", line_protocol),
    ("/influx/api/v2/write", line_protocol),
    ("/write", line_protocol),
    ("/api/v2/write", line_protocol),
    ("/api/v1/import/csv", csv),
];

fn line_protocol(prefix: MetricPrefix) -> Box<dyn RecordEncoder> {
    Box::new(LineProtocolEncoder::new(prefix))
}

fn csv(prefix: MetricPrefix) -> Box<dyn RecordEncoder> {
    Box::new(CsvEncoder::new(prefix))
}

/// Insert URL paths with a known encoding.
pub fn supported_paths() -> impl Iterator<Item = &'static str> {
    ENDPOINTS.iter().map(|(path, _)| *path)
}

/// Selects the encoder for an insert URL path.
pub fn resolve(path: &str, prefix: MetricPrefix) -> Result<Box<dyn RecordEncoder>> {
    ENDPOINTS
        .iter()
        .find(|(candidate, _)| *candidate == path)
        .map(|(_, factory)| factory(prefix))
        .ok_or_else(|| ClientError::UnsupportedEndpoint {
            path: path.to_string(),
            supported: supported_paths().collect::<Vec<_>>().join(", "),
        })
}

/// Appends `value` with exactly two decimal digits.
///
/// Rounds the shortest decimal representation of the `f32` half away from
/// zero, so `-98.765` is written as `-98.77` although its binary value lies
/// slightly closer to zero.
fn push_coordinate(out: &mut String, value: f32) {
    match round_hundredths(value) {
        Some((negative, hundredths)) => {
            let sign = if negative { "-" } else { "" };
            let _ = write!(out, "{}{}.{:02}", sign, hundredths / 100, hundredths % 100);
        }
        None => {
            let _ = write!(out, "{:.2}", value);
        }
    }
}

/// Sign and magnitude of `value` in hundredths, or `None` when it does not fit.
fn round_hundredths(value: f32) -> Option<(bool, u128)> {
    if !value.is_finite() {
        return None;
    }

    // Display for floats never switches to exponent notation.
    let repr = value.to_string();
    let (negative, digits) = match repr.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, repr.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));

    let mut fraction = fraction.bytes().map(|b| u128::from(b - b'0'));
    let tenths = fraction.next().unwrap_or(0);
    let hundredths = fraction.next().unwrap_or(0);
    let round_up = fraction.next().is_some_and(|d| d >= 5);

    let scaled = whole.parse::<u128>().ok()?.checked_mul(100)?;
    Some((negative, scaled + tenths * 10 + hundredths + u128::from(round_up)))
}
