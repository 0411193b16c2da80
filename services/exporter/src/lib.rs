//! ERA5 to VictoriaMetrics export pipeline.
//!
//! One producer scans an ERA5 file a timestamp at a time, a pool of workers
//! inserts the resulting batches, and an aggregator logs progress.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use config::{Args, ExporterConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{chunk_ranges, run, PipelineConfig, PipelineReport, RecordSink};
pub use progress::ProgressTracker;
