//! Shared test utilities for the era5-export workspace.
//!
//! This crate provides:
//! - Test data path helpers and skip macros for optional sample files
//! - Synthetic ERA5 grids, in memory or written to NetCDF
//! - Known records with their exact wire encodings
//! - A mock VictoriaMetrics insert server
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{require_test_file, synthetic_source, MockVmServer};
//! ```

pub mod fixtures;
pub mod generators;
pub mod mock_vm;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use mock_vm::{MockVmServer, ReceivedRequest};
pub use paths::*;

/// Skips the current test if the named file cannot be found.
///
/// Real ERA5 extracts are not committed; point `TEST_DATA_DIR` at a
/// directory holding them to run the tests that need one.
///
/// ```ignore
/// #[test]
/// fn test_real_file() {
///     let path = require_test_file!("era5_sample.nc");
///     // ...
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Download test data or set TEST_DATA_DIR.",
                    $name
                );
                return;
            }
        }
    }};
}

/// Approximate floating-point equality.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
