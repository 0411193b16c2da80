//! ERA5 reanalysis reader.
//!
//! Reads ERA5 single-level NetCDF files (as downloaded from the Copernicus
//! Climate Data Store) and flattens them into [`Record`]s, one batch per
//! timestamp.
//!
//! # Data Layout
//!
//! Each metric variable (`u10`, `v10`, `t2m`, `sf`, `tcc`, `tp`) is a packed
//! `short` array shaped `(time, latitude, longitude)`. The time axis counts
//! hours since 1900-01-01T00:00:00Z and is converted to Unix epoch
//! milliseconds. Packed values are passed through untouched.
//!
//! # Usage
//!
//! ```ignore
//! use era5_reader::Scanner;
//!
//! let mut scanner = Scanner::open("era5.nc", None)?;
//! while scanner.scan()? {
//!     let batch = scanner.records();
//!     // one record per (latitude, longitude) cell
//! }
//! scanner.close();
//! ```

pub mod error;
pub mod native;
pub mod record;
pub mod scanner;
pub mod source;

pub use error::{ReaderError, ReaderResult};
pub use native::{silence_hdf5_errors, NetCdfSource};
pub use record::{Metric, Record, METRIC_COUNT};
pub use scanner::{hours_to_epoch_millis, ScanSummary, Scanner, UNIX_SECS_1900};
pub use source::{GridSource, MemorySource};
