//! Gridded data sources.
//!
//! A [`GridSource`] exposes the three coordinate axes of an ERA5 dataset and
//! a per-timestamp slice read for each [`Metric`]. [`NetCdfSource`](crate::NetCdfSource)
//! reads real files; [`MemorySource`] holds everything in memory and is used
//! for synthetic data and tests.

use std::collections::HashMap;

use crate::error::{ReaderError, ReaderResult};
use crate::record::Metric;

/// Source of ERA5 grids indexed by (time, latitude, longitude).
pub trait GridSource {
    /// Latitude axis in degrees.
    fn latitudes(&self) -> ReaderResult<Vec<f32>>;

    /// Longitude axis in degrees.
    fn longitudes(&self) -> ReaderResult<Vec<f32>>;

    /// Time axis as hours since 1900-01-01T00:00:00Z.
    fn time_hours(&self) -> ReaderResult<Vec<i64>>;

    /// Reads one latitude x longitude grid for `metric` at `time_index`.
    ///
    /// Values are returned in row-major order (latitude outer, longitude inner).
    fn read_slice(&self, metric: Metric, time_index: usize) -> ReaderResult<Vec<i16>>;
}

/// In-memory [`GridSource`].
#[derive(Debug, Clone)]
pub struct MemorySource {
    latitudes: Vec<f32>,
    longitudes: Vec<f32>,
    time_hours: Vec<i64>,
    /// Per metric: `time * lat * lon` values, time outermost
    values: HashMap<Metric, Vec<i16>>,
    fail_from: Option<usize>,
}

impl MemorySource {
    /// Creates a source whose metric values are all zero.
    pub fn new(latitudes: Vec<f32>, longitudes: Vec<f32>, time_hours: Vec<i64>) -> Self {
        Self::from_fn(latitudes, longitudes, time_hours, |_, _, _, _| 0)
    }

    /// Creates a source where each value is `f(metric, time, lat_index, lon_index)`.
    pub fn from_fn<F>(latitudes: Vec<f32>, longitudes: Vec<f32>, time_hours: Vec<i64>, f: F) -> Self
    where
        F: Fn(Metric, usize, usize, usize) -> i16,
    {
        let mut values = HashMap::with_capacity(Metric::ALL.len());
        for metric in Metric::ALL {
            let mut data =
                Vec::with_capacity(time_hours.len() * latitudes.len() * longitudes.len());
            for t in 0..time_hours.len() {
                for i in 0..latitudes.len() {
                    for j in 0..longitudes.len() {
                        data.push(f(metric, t, i, j));
                    }
                }
            }
            values.insert(metric, data);
        }

        Self {
            latitudes,
            longitudes,
            time_hours,
            values,
            fail_from: None,
        }
    }

    /// Makes every slice read at or after `time_index` fail.
    pub fn fail_reads_from(mut self, time_index: usize) -> Self {
        self.fail_from = Some(time_index);
        self
    }

    fn cells(&self) -> usize {
        self.latitudes.len() * self.longitudes.len()
    }
}

impl GridSource for MemorySource {
    fn latitudes(&self) -> ReaderResult<Vec<f32>> {
        Ok(self.latitudes.clone())
    }

    fn longitudes(&self) -> ReaderResult<Vec<f32>> {
        Ok(self.longitudes.clone())
    }

    fn time_hours(&self) -> ReaderResult<Vec<i64>> {
        Ok(self.time_hours.clone())
    }

    fn read_slice(&self, metric: Metric, time_index: usize) -> ReaderResult<Vec<i16>> {
        if self.fail_from.is_some_and(|from| time_index >= from) {
            return Err(ReaderError::SliceRead {
                metric: metric.short_name(),
                index: time_index,
                reason: "injected read failure".to_string(),
            });
        }
        if time_index >= self.time_hours.len() {
            return Err(ReaderError::SliceRead {
                metric: metric.short_name(),
                index: time_index,
                reason: "time index out of range".to_string(),
            });
        }

        let cells = self.cells();
        let start = time_index * cells;
        let data = self
            .values
            .get(&metric)
            .ok_or_else(|| ReaderError::MissingData(format!("{} variable", metric)))?;
        Ok(data[start..start + cells].to_vec())
    }
}
