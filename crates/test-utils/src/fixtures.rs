//! Known records and their exact wire encodings.

use era5_reader::Record;

/// Metric prefix used by the encoding fixtures.
pub const PREFIX: &str = "era5";

/// A single record with coordinates that need rounding.
pub fn sample_record() -> Record {
    Record::new(1000, 12.345, -98.765, [1, 2, 3, 4, 5, 6])
}

/// Line-protocol encoding of [`sample_record`] with [`PREFIX`].
pub const SAMPLE_LINE: &str = "era5,la=12.35,lo=-98.77 u10=1,v10=2,t2m=3,sf=4,tcc=5,tp=6 1000";

/// CSV encoding of [`sample_record`].
pub const SAMPLE_CSV: &str = "1000,12.35,-98.77,1,2,3,4,5,6";

/// CSV column mapping for [`PREFIX`].
pub const SAMPLE_CSV_FORMAT: &str = "1:time:unix_ms,2:label:la,3:label:lo,\
4:metric:era5_u10,5:metric:era5_v10,6:metric:era5_t2m,\
7:metric:era5_sf,8:metric:era5_tcc,9:metric:era5_tp";

/// Insert paths served as line protocol.
pub const LINE_PROTOCOL_PATHS: [&str; 4] =
    ["/influx/write", "/influx/api/v2/write", "/write", "/api/v2/write"];

/// Insert path served as CSV.
pub const CSV_PATH: &str = "/api/v1/import/csv";

/// `count` records with distinct timestamps on a fixed coordinate.
pub fn record_batch(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let v = i as i16;
            Record::new(i as i64 * 3_600_000, 45.0, 7.5, [v, -v, v, 0, 1, 2])
        })
        .collect()
}
