//! Sequential, one-timestamp-at-a-time decoding of an ERA5 source.

use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::error::{ReaderError, ReaderResult};
use crate::native::{NetCdfSource, LATITUDE_VAR, LONGITUDE_VAR, TIME_VAR};
use crate::record::{Metric, Record, METRIC_COUNT};
use crate::source::GridSource;

/// Seconds from 1970-01-01T00:00:00Z back to 1900-01-01T00:00:00Z.
///
/// `TZ=UTC date --date="1900-01-01 00:00:00" +%s`
pub const UNIX_SECS_1900: i64 = -2_208_988_800;

/// Converts ERA5 "hours since 1900-01-01" to Unix epoch milliseconds.
pub fn hours_to_epoch_millis(hours: i64) -> i64 {
    (hours * 3600 + UNIX_SECS_1900) * 1000
}

/// Dataset overview suitable for logging at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub dimensions: [&'static str; 3],
    pub metrics: [&'static str; METRIC_COUNT],
    pub timestamps: usize,
    pub latitudes: usize,
    pub longitudes: usize,
    pub total_records: u64,
    pub first_time: Option<DateTime<Utc>>,
    pub last_time: Option<DateTime<Utc>>,
}

/// Reads all grid cells of a source one timestamp per [`Scanner::scan`] call.
pub struct Scanner<S> {
    source: S,
    latitudes: Vec<f32>,
    longitudes: Vec<f32>,
    timestamps: Vec<i64>,
    pos: usize,
    records: Vec<Record>,
    error: Option<ReaderError>,
}

impl Scanner<NetCdfSource> {
    /// Opens an ERA5 NetCDF file for scanning.
    ///
    /// With `limit` set, only the first `limit` timestamps are scanned.
    pub fn open<P: AsRef<Path>>(path: P, limit: Option<usize>) -> ReaderResult<Self> {
        Self::new(NetCdfSource::open(path)?, limit)
    }
}

impl<S: GridSource> Scanner<S> {
    /// Wraps a source, reading its coordinate axes up front.
    pub fn new(source: S, limit: Option<usize>) -> ReaderResult<Self> {
        let latitudes = source.latitudes()?;
        let longitudes = source.longitudes()?;
        let mut timestamps: Vec<i64> = source
            .time_hours()?
            .into_iter()
            .map(hours_to_epoch_millis)
            .collect();

        if let Some(limit) = limit {
            timestamps.truncate(limit);
        }

        Ok(Self {
            source,
            latitudes,
            longitudes,
            timestamps,
            pos: 0,
            records: Vec::new(),
            error: None,
        })
    }

    /// Decodes the next timestamp.
    ///
    /// Returns `Ok(true)` when a new batch is available from [`Scanner::records`],
    /// `Ok(false)` once the source is exhausted. A read failure is returned and
    /// also retained in [`Scanner::error`]; every later call returns `Ok(false)`.
    pub fn scan(&mut self) -> ReaderResult<bool> {
        if self.error.is_some() || self.pos >= self.timestamps.len() {
            return Ok(false);
        }

        let slices = match self.read_slices() {
            Ok(slices) => slices,
            Err(e) => {
                self.error = Some(e.clone());
                return Err(e);
            }
        };

        let timestamp = self.timestamps[self.pos];
        let n_lon = self.longitudes.len();
        let mut records = Vec::with_capacity(self.latitudes.len() * n_lon);
        for (i, &latitude) in self.latitudes.iter().enumerate() {
            for (j, &longitude) in self.longitudes.iter().enumerate() {
                let k = i * n_lon + j;
                records.push(Record::new(
                    timestamp,
                    latitude,
                    longitude,
                    [
                        slices[0][k],
                        slices[1][k],
                        slices[2][k],
                        slices[3][k],
                        slices[4][k],
                        slices[5][k],
                    ],
                ));
            }
        }

        self.records = records;
        self.pos += 1;
        Ok(true)
    }

    fn read_slices(&self) -> ReaderResult<[Vec<i16>; METRIC_COUNT]> {
        let cells = self.latitudes.len() * self.longitudes.len();
        let mut slices: [Vec<i16>; METRIC_COUNT] = Default::default();

        for (slot, metric) in slices.iter_mut().zip(Metric::ALL) {
            let values = self.source.read_slice(metric, self.pos)?;
            if values.len() != cells {
                return Err(ReaderError::SliceRead {
                    metric: metric.short_name(),
                    index: self.pos,
                    reason: format!("got {} values, expected {}", values.len(), cells),
                });
            }
            *slot = values;
        }
        Ok(slices)
    }

    /// Takes the batch produced by the last successful [`Scanner::scan`].
    ///
    /// Ownership moves to the caller; a second call without an intervening
    /// scan returns an empty batch.
    pub fn records(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records)
    }

    /// The read failure that stopped scanning, if any.
    pub fn error(&self) -> Option<&ReaderError> {
        self.error.as_ref()
    }

    /// Number of timestamps already decoded.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total number of metric values in the scanned range.
    ///
    /// Counts every metric of every record, so it is [`METRIC_COUNT`] times the
    /// number of records. Used for progress reporting only.
    pub fn total_record_count(&self) -> u64 {
        (self.timestamps.len() * self.latitudes.len() * self.longitudes.len() * METRIC_COUNT)
            as u64
    }

    pub fn summary(&self) -> ScanSummary {
        let to_time = |ms: &i64| Utc.timestamp_millis_opt(*ms).single();
        ScanSummary {
            dimensions: [TIME_VAR, LONGITUDE_VAR, LATITUDE_VAR],
            metrics: Metric::ALL.map(Metric::short_name),
            timestamps: self.timestamps.len(),
            latitudes: self.latitudes.len(),
            longitudes: self.longitudes.len(),
            total_records: self.total_record_count(),
            first_time: self.timestamps.first().and_then(to_time),
            last_time: self.timestamps.last().and_then(to_time),
        }
    }

    /// Releases the underlying source.
    pub fn close(self) {
        debug!(scanned = self.pos, total = self.timestamps.len(), "Closing ERA5 scanner");
        drop(self.source);
    }
}
