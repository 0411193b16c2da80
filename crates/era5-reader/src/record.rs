//! Flattened ERA5 observations and the metrics they carry.

use std::fmt;

/// Number of metrics carried by every [`Record`].
pub const METRIC_COUNT: usize = 6;

/// ERA5 single-level variables exported by this crate.
///
/// The order of [`Metric::ALL`] is the order metrics appear in records and
/// in every wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// 10 metre U wind component
    ZonalWind10m,
    /// 10 metre V wind component
    MeridionalWind10m,
    /// 2 metre temperature
    Temperature2m,
    Snowfall,
    TotalCloudCover,
    TotalPrecipitation,
}

impl Metric {
    pub const ALL: [Metric; METRIC_COUNT] = [
        Metric::ZonalWind10m,
        Metric::MeridionalWind10m,
        Metric::Temperature2m,
        Metric::Snowfall,
        Metric::TotalCloudCover,
        Metric::TotalPrecipitation,
    ];

    /// Short name used both as the NetCDF variable name and the exported field name.
    pub fn short_name(self) -> &'static str {
        match self {
            Metric::ZonalWind10m => "u10",
            Metric::MeridionalWind10m => "v10",
            Metric::Temperature2m => "t2m",
            Metric::Snowfall => "sf",
            Metric::TotalCloudCover => "tcc",
            Metric::TotalPrecipitation => "tp",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Readings taken at one grid cell at one point in time.
///
/// Metric values are the packed 16-bit integers stored in the source file;
/// no scale factor or offset is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Record {
    /// Milliseconds since the Unix epoch (UTC)
    pub timestamp: i64,
    pub latitude: f32,
    pub longitude: f32,

    pub zonal_wind_10m: i16,
    pub meridional_wind_10m: i16,
    pub temperature_2m: i16,
    pub snowfall: i16,
    pub total_cloud_cover: i16,
    pub total_precipitation: i16,
}

impl Record {
    /// Builds a record from metric values given in [`Metric::ALL`] order.
    pub fn new(timestamp: i64, latitude: f32, longitude: f32, values: [i16; METRIC_COUNT]) -> Self {
        let [u10, v10, t2m, sf, tcc, tp] = values;
        Self {
            timestamp,
            latitude,
            longitude,
            zonal_wind_10m: u10,
            meridional_wind_10m: v10,
            temperature_2m: t2m,
            snowfall: sf,
            total_cloud_cover: tcc,
            total_precipitation: tp,
        }
    }

    pub fn metric(&self, metric: Metric) -> i16 {
        match metric {
            Metric::ZonalWind10m => self.zonal_wind_10m,
            Metric::MeridionalWind10m => self.meridional_wind_10m,
            Metric::Temperature2m => self.temperature_2m,
            Metric::Snowfall => self.snowfall,
            Metric::TotalCloudCover => self.total_cloud_cover,
            Metric::TotalPrecipitation => self.total_precipitation,
        }
    }
}
