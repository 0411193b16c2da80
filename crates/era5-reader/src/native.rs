//! Native NetCDF access using the netcdf library.
//!
//! ERA5 single-level files from the Copernicus Climate Data Store store
//! coordinate variables `latitude`, `longitude` and `time` (hours since
//! 1900-01-01) and one packed `short` variable per metric, shaped
//! `(time, latitude, longitude)`.

use std::path::Path;
use std::sync::Once;

use tracing::debug;

use crate::error::{ReaderError, ReaderResult};
use crate::record::Metric;
use crate::source::GridSource;

pub const LATITUDE_VAR: &str = "latitude";
pub const LONGITUDE_VAR: &str = "longitude";
pub const TIME_VAR: &str = "time";

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose diagnostics to stderr even when the
/// error is handled on the Rust side, e.g. when a variable lookup misses.
/// Safe to call multiple times; only the first call has an effect.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// An open ERA5 NetCDF file.
///
/// The file handle is released when the source is dropped.
pub struct NetCdfSource {
    file: netcdf::File,
    n_time: usize,
    n_lat: usize,
    n_lon: usize,
}

impl NetCdfSource {
    /// Opens `path` and checks that all coordinate and metric variables exist
    /// with the expected shapes.
    pub fn open<P: AsRef<Path>>(path: P) -> ReaderResult<Self> {
        silence_hdf5_errors();

        let path = path.as_ref();
        let file = netcdf::open(path).map_err(|e| ReaderError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let n_lat = axis_len(&file, LATITUDE_VAR)?;
        let n_lon = axis_len(&file, LONGITUDE_VAR)?;
        let n_time = axis_len(&file, TIME_VAR)?;

        for metric in Metric::ALL {
            let var = file
                .variable(metric.short_name())
                .ok_or_else(|| ReaderError::MissingData(format!("{} variable", metric)))?;
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            if shape != [n_time, n_lat, n_lon] {
                return Err(ReaderError::InvalidFormat(format!(
                    "{} has shape {:?}, expected [{}, {}, {}]",
                    metric, shape, n_time, n_lat, n_lon
                )));
            }
        }

        debug!(
            path = %path.display(),
            time = n_time,
            latitude = n_lat,
            longitude = n_lon,
            "Opened ERA5 NetCDF file"
        );

        Ok(Self {
            file,
            n_time,
            n_lat,
            n_lon,
        })
    }

    fn variable(&self, name: &str) -> ReaderResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| ReaderError::MissingData(format!("{} variable", name)))
    }
}

impl GridSource for NetCdfSource {
    fn latitudes(&self) -> ReaderResult<Vec<f32>> {
        self.variable(LATITUDE_VAR)?
            .get_values::<f32, _>(..)
            .map_err(|e| ReaderError::InvalidFormat(format!("Failed to read latitude: {}", e)))
    }

    fn longitudes(&self) -> ReaderResult<Vec<f32>> {
        self.variable(LONGITUDE_VAR)?
            .get_values::<f32, _>(..)
            .map_err(|e| ReaderError::InvalidFormat(format!("Failed to read longitude: {}", e)))
    }

    fn time_hours(&self) -> ReaderResult<Vec<i64>> {
        let hours: Vec<i32> = self
            .variable(TIME_VAR)?
            .get_values(..)
            .map_err(|e| ReaderError::InvalidFormat(format!("Failed to read time: {}", e)))?;
        Ok(hours.into_iter().map(i64::from).collect())
    }

    fn read_slice(&self, metric: Metric, time_index: usize) -> ReaderResult<Vec<i16>> {
        let slice_error = |reason: String| ReaderError::SliceRead {
            metric: metric.short_name(),
            index: time_index,
            reason,
        };

        if time_index >= self.n_time {
            return Err(slice_error(format!(
                "time index out of range (file has {})",
                self.n_time
            )));
        }

        let values: Vec<i16> = self
            .variable(metric.short_name())?
            .get_values([time_index..time_index + 1, 0..self.n_lat, 0..self.n_lon])
            .map_err(|e| slice_error(e.to_string()))?;

        if values.len() != self.n_lat * self.n_lon {
            return Err(slice_error(format!(
                "got {} values, expected {}",
                values.len(),
                self.n_lat * self.n_lon
            )));
        }
        Ok(values)
    }
}

/// Length of a one-dimensional coordinate variable.
fn axis_len(file: &netcdf::File, name: &str) -> ReaderResult<usize> {
    let var = file
        .variable(name)
        .ok_or_else(|| ReaderError::MissingData(format!("{} dimension", name)))?;
    match var.dimensions() {
        [dim] => Ok(dim.len()),
        dims => Err(ReaderError::InvalidFormat(format!(
            "{} should be one-dimensional, found {} dimensions",
            name,
            dims.len()
        ))),
    }
}
