//! Synthetic ERA5-shaped data.
//!
//! Every generated value is a pure function of its (metric, time, latitude,
//! longitude) indices, so tests can check any record against
//! [`synthetic_value`] without keeping the whole grid around.

use std::path::{Path, PathBuf};

use era5_reader::{MemorySource, Metric};

/// 2024-01-01T00:00:00Z in hours since 1900-01-01.
pub const BASE_HOURS: i64 = 1_086_960;

/// First latitude of generated grids (ERA5 runs north to south).
pub const FIRST_LATITUDE: f32 = 60.0;
/// First longitude of generated grids.
pub const FIRST_LONGITUDE: f32 = -10.0;
/// ERA5 single-level grid spacing in degrees.
pub const GRID_STEP: f32 = 0.25;

/// An axis of `count` values starting at `start`, `step` apart.
pub fn axis(start: f32, step: f32, count: usize) -> Vec<f32> {
    (0..count).map(|i| start + step * i as f32).collect()
}

/// Hourly time axis starting at [`BASE_HOURS`].
pub fn hourly_axis(count: usize) -> Vec<i64> {
    (0..count as i64).map(|h| BASE_HOURS + h).collect()
}

/// Packed value generated for one cell.
///
/// Stays well inside the `i16` range and differs between neighbouring
/// cells, timestamps and metrics.
pub fn synthetic_value(metric: Metric, t: usize, i: usize, j: usize) -> i16 {
    let m = Metric::ALL
        .iter()
        .position(|&candidate| candidate == metric)
        .unwrap_or(0);
    let raw = (m * 4099 + t * 307 + i * 31 + j) % 30_000;
    raw as i16 - 15_000
}

/// In-memory source with `times` hourly steps over a `lats` x `lons` grid.
pub fn synthetic_source(times: usize, lats: usize, lons: usize) -> MemorySource {
    MemorySource::from_fn(
        axis(FIRST_LATITUDE, -GRID_STEP, lats),
        axis(FIRST_LONGITUDE, GRID_STEP, lons),
        hourly_axis(times),
        synthetic_value,
    )
}

/// Writes an ERA5-shaped NetCDF file filled with [`synthetic_value`]s.
pub fn write_era5_netcdf(
    path: &Path,
    times: usize,
    lats: usize,
    lons: usize,
) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("time", times)?;
    file.add_dimension("latitude", lats)?;
    file.add_dimension("longitude", lons)?;

    let mut var = file.add_variable::<f32>("latitude", &["latitude"])?;
    var.put_attribute("units", "degrees_north")?;
    var.put_values(&axis(FIRST_LATITUDE, -GRID_STEP, lats), ..)?;

    let mut var = file.add_variable::<f32>("longitude", &["longitude"])?;
    var.put_attribute("units", "degrees_east")?;
    var.put_values(&axis(FIRST_LONGITUDE, GRID_STEP, lons), ..)?;

    let hours: Vec<i32> = hourly_axis(times).into_iter().map(|h| h as i32).collect();
    let mut var = file.add_variable::<i32>("time", &["time"])?;
    var.put_attribute("units", "hours since 1900-01-01 00:00:00.0")?;
    var.put_values(&hours, ..)?;

    for metric in Metric::ALL {
        let mut data = Vec::with_capacity(times * lats * lons);
        for t in 0..times {
            for i in 0..lats {
                for j in 0..lons {
                    data.push(synthetic_value(metric, t, i, j));
                }
            }
        }
        let mut var =
            file.add_variable::<i16>(metric.short_name(), &["time", "latitude", "longitude"])?;
        var.put_values(&data, ..)?;
    }

    Ok(())
}

/// Writes a NetCDF file whose `tp` variable lacks the time dimension.
pub fn write_malformed_netcdf(path: &Path, lats: usize, lons: usize) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    file.add_dimension("time", 1)?;
    file.add_dimension("latitude", lats)?;
    file.add_dimension("longitude", lons)?;

    let mut var = file.add_variable::<f32>("latitude", &["latitude"])?;
    var.put_values(&axis(FIRST_LATITUDE, -GRID_STEP, lats), ..)?;
    let mut var = file.add_variable::<f32>("longitude", &["longitude"])?;
    var.put_values(&axis(FIRST_LONGITUDE, GRID_STEP, lons), ..)?;
    let mut var = file.add_variable::<i32>("time", &["time"])?;
    var.put_values(&[BASE_HOURS as i32], ..)?;

    for metric in Metric::ALL {
        let dims: &[&str] = if metric == Metric::TotalPrecipitation {
            &["latitude", "longitude"]
        } else {
            &["time", "latitude", "longitude"]
        };
        let mut var = file.add_variable::<i16>(metric.short_name(), dims)?;
        var.put_values(&vec![0i16; lats * lons], ..)?;
    }

    Ok(())
}

/// Creates a synthetic ERA5 NetCDF file in a fresh temporary directory.
///
/// Keep the returned `TempDir` alive for as long as the file is needed.
pub fn era5_netcdf_file(times: usize, lats: usize, lons: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = crate::temp_test_dir();
    let path = dir.path().join("era5_synthetic.nc");
    write_era5_netcdf(&path, times, lats, lons).expect("Failed to write synthetic ERA5 file");
    (dir, path)
}
