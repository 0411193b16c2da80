//! Progress aggregation.
//!
//! Workers report the size of every batch they finish; a single aggregator
//! task folds those counts into a [`ProgressTracker`] and logs after each one.

use std::time::{Duration, Instant};

use metrics::{counter, gauge};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

/// Running totals for one export.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    /// Total record count reported by the scanner
    total: u64,
    records: u64,
    batches: u64,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(total_record_count: u64) -> Self {
        Self {
            total: total_record_count,
            records: 0,
            batches: 0,
            started: Instant::now(),
        }
    }

    /// Adds one finished batch of `records` records.
    pub fn record(&mut self, records: usize) {
        self.records += records as u64;
        self.batches += 1;
    }

    /// Records reported so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// `100 * inserted / total`, with the scanner's total record count as
    /// the denominator. An empty export reports 0.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.records as f64 / self.total as f64
    }

    /// Wall-clock time since the tracker was created, rounded to whole seconds.
    pub fn elapsed(&self) -> Duration {
        let elapsed = self.started.elapsed();
        Duration::from_secs((elapsed.as_millis() as u64 + 500) / 1000)
    }
}

/// Drains `counts` until every sender is dropped, logging after each batch.
pub async fn aggregate(
    mut counts: UnboundedReceiver<usize>,
    mut tracker: ProgressTracker,
) -> ProgressTracker {
    while let Some(n) = counts.recv().await {
        tracker.record(n);
        let percent = tracker.percent();

        counter!("era5_export_batches_total").increment(1);
        gauge!("era5_export_progress_percent").set(percent);
        info!(
            rows = %format!("{:.2}%", percent),
            elapsed = ?tracker.elapsed(),
            "inserted"
        );
    }
    tracker
}
