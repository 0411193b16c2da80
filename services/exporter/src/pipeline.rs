//! Producer / worker pool / aggregator pipeline.
//!
//! The caller's task scans the source and hands each timestamp's batch to a
//! pool of insert workers over a single-slot channel. The producer reserves
//! that slot before decoding the next timestamp, so no more than
//! `concurrency + 1` decoded batches exist at once. Workers split batches
//! into chunks of at most `records_per_insert`, insert each chunk, and report
//! the batch size to the progress aggregator.

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use era5_reader::{GridSource, ReaderError, ReaderResult, Record, Scanner};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{self, Receiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use vm_client::{InsertOutcome, VmClient};

use crate::error::{PipelineError, Result};
use crate::progress::{self, ProgressTracker};

/// Default number of records per insert request.
pub const DEFAULT_RECORDS_PER_INSERT: usize = 500;

/// Destination for record chunks.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert(&self, records: &[Record]) -> InsertOutcome;
}

#[async_trait]
impl RecordSink for VmClient {
    async fn insert(&self, records: &[Record]) -> InsertOutcome {
        VmClient::insert(self, records).await
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub concurrency: usize,
    pub records_per_insert: usize,
}

impl PipelineConfig {
    pub fn new(concurrency: usize, records_per_insert: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if records_per_insert == 0 {
            return Err(PipelineError::InvalidConfig(
                "records per insert must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            concurrency,
            records_per_insert,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().max(1),
            records_per_insert: DEFAULT_RECORDS_PER_INSERT,
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Batches handed to workers
    pub batches: u64,
    /// Records handed to workers
    pub records: u64,
    /// Records reported back by workers
    pub reported: u64,
    pub elapsed: Duration,
    /// Read failure that ended scanning early
    pub scan_error: Option<ReaderError>,
}

/// Contiguous ranges of at most `size` covering `0..len`; the last may be shorter.
pub fn chunk_ranges(len: usize, size: usize) -> impl Iterator<Item = Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(move |start| start..(start + size).min(len))
}

/// Scans `scanner` to exhaustion, inserting every record into `sink`.
///
/// Insert failures never stop the run. A scan failure stops production;
/// batches already handed over are still inserted and the error is returned
/// in the report.
pub async fn run<S, K>(
    scanner: &mut Scanner<S>,
    sink: Arc<K>,
    config: PipelineConfig,
) -> Result<PipelineReport>
where
    S: GridSource,
    K: RecordSink + ?Sized + 'static,
{
    let started = Instant::now();

    let (batch_tx, batch_rx) = mpsc::channel::<Vec<Record>>(1);
    let batch_rx = Arc::new(Mutex::new(batch_rx));
    let (loaded_tx, loaded_rx) = mpsc::unbounded_channel::<usize>();

    let aggregator = tokio::spawn(progress::aggregate(
        loaded_rx,
        ProgressTracker::new(scanner.total_record_count()),
    ));

    let workers: Vec<_> = (0..config.concurrency)
        .map(|id| {
            tokio::spawn(insert_worker(
                id,
                batch_rx.clone(),
                sink.clone(),
                loaded_tx.clone(),
                config.records_per_insert,
            ))
        })
        .collect();
    drop(loaded_tx);

    info!(
        workers = config.concurrency,
        records_per_insert = config.records_per_insert,
        "Starting export"
    );

    let mut batches = 0u64;
    let mut records = 0u64;
    let mut scan_error = None;
    loop {
        let Ok(slot) = batch_tx.reserve().await else {
            // Every worker is gone; only possible if they panicked.
            break;
        };
        match scan_off_runtime(scanner) {
            Ok(true) => {
                let batch = scanner.records();
                batches += 1;
                records += batch.len() as u64;
                slot.send(batch);
            }
            Ok(false) => break,
            Err(e) => {
                error!(error = %e, position = scanner.position(), "Could not read ERA5 records");
                scan_error = Some(e);
                break;
            }
        }
    }
    drop(batch_tx);
    debug!(batches, records, "Production finished");

    for worker in workers {
        worker.await.map_err(|source| PipelineError::Task {
            task: "insert worker",
            source,
        })?;
    }
    let tracker = aggregator.await.map_err(|source| PipelineError::Task {
        task: "progress aggregator",
        source,
    })?;

    Ok(PipelineReport {
        batches,
        records,
        reported: tracker.records(),
        elapsed: started.elapsed(),
        scan_error,
    })
}

/// Runs one blocking scan step.
///
/// On a multi-thread runtime the current worker thread is handed over to
/// the blocking read so insert workers keep running. A current-thread
/// runtime has nothing to hand over to, so the read runs in place.
fn scan_off_runtime<S: GridSource>(scanner: &mut Scanner<S>) -> ReaderResult<bool> {
    match Handle::current().runtime_flavor() {
        RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| scanner.scan()),
        _ => scanner.scan(),
    }
}

async fn insert_worker<K>(
    id: usize,
    batches: Arc<Mutex<Receiver<Vec<Record>>>>,
    sink: Arc<K>,
    loaded: UnboundedSender<usize>,
    records_per_insert: usize,
) where
    K: RecordSink + ?Sized,
{
    loop {
        let batch = batches.lock().await.recv().await;
        let Some(batch) = batch else {
            break;
        };

        for range in chunk_ranges(batch.len(), records_per_insert) {
            sink.insert(&batch[range]).await;
        }
        if loaded.send(batch.len()).is_err() {
            break;
        }
    }
    debug!(worker = id, "Insert worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use era5_reader::{MemorySource, Metric};
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct CountingSink {
        records: AtomicU64,
        calls: AtomicUsize,
        largest: AtomicUsize,
    }

    #[async_trait]
    impl RecordSink for CountingSink {
        async fn insert(&self, records: &[Record]) -> InsertOutcome {
            self.records.fetch_add(records.len() as u64, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.largest.fetch_max(records.len(), Ordering::SeqCst);
            tokio::task::yield_now().await;
            InsertOutcome::Accepted
        }
    }

    fn source(times: usize, lats: usize, lons: usize) -> MemorySource {
        let lat = (0..lats).map(|i| 50.0 - i as f32 * 0.25).collect();
        let lon = (0..lons).map(|j| j as f32 * 0.25).collect();
        let hours = (0..times as i64).map(|h| 1_086_960 + h).collect();
        MemorySource::from_fn(lat, lon, hours, |_, t, i, j| (t + i + j) as i16)
    }

    #[test]
    fn test_chunk_ranges() {
        let ranges: Vec<_> = chunk_ranges(1234, 500).collect();
        assert_eq!(ranges, vec![0..500, 500..1000, 1000..1234]);
    }

    #[test]
    fn test_chunk_ranges_edges() {
        assert_eq!(chunk_ranges(0, 500).count(), 0);
        assert_eq!(chunk_ranges(500, 500).collect::<Vec<_>>(), vec![0..500]);
        assert_eq!(chunk_ranges(3, 1).collect::<Vec<_>>(), vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::new(0, 500).is_err());
        assert!(PipelineConfig::new(4, 0).is_err());
        assert_eq!(
            PipelineConfig::new(4, 500).unwrap(),
            PipelineConfig {
                concurrency: 4,
                records_per_insert: 500
            }
        );
        assert!(PipelineConfig::default().concurrency >= 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_record_is_inserted_once() {
        let mut scanner = Scanner::new(source(7, 13, 11), None).unwrap();
        let sink = Arc::new(CountingSink::default());
        let config = PipelineConfig::new(4, 50).unwrap();

        let report = run(&mut scanner, sink.clone(), config).await.unwrap();

        assert_eq!(report.batches, 7);
        assert_eq!(report.records, 7 * 13 * 11);
        assert_eq!(report.reported, report.records);
        assert!(report.scan_error.is_none());
        assert_eq!(sink.records.load(Ordering::SeqCst), report.records);
        // 143 records per batch -> 50, 50, 43
        assert_eq!(sink.calls.load(Ordering::SeqCst), 7 * 3);
        assert_eq!(sink.largest.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn test_single_worker() {
        let mut scanner = Scanner::new(source(3, 2, 2), None).unwrap();
        let sink = Arc::new(CountingSink::default());

        let report = run(&mut scanner, sink.clone(), PipelineConfig::new(1, 500).unwrap())
            .await
            .unwrap();

        assert_eq!(report.records, 12);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_scan_error_keeps_produced_batches() {
        let failing = source(5, 2, 3).fail_reads_from(2);
        let mut scanner = Scanner::new(failing, None).unwrap();
        let sink = Arc::new(CountingSink::default());

        let report = run(&mut scanner, sink.clone(), PipelineConfig::new(2, 4).unwrap())
            .await
            .unwrap();

        assert_eq!(report.batches, 2);
        assert_eq!(report.records, 12);
        assert_eq!(report.reported, 12);
        assert_eq!(sink.records.load(Ordering::SeqCst), 12);
        assert!(matches!(
            report.scan_error,
            Some(ReaderError::SliceRead { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_source() {
        let mut scanner = Scanner::new(source(0, 2, 2), None).unwrap();
        let sink = Arc::new(CountingSink::default());

        let report = run(&mut scanner, sink.clone(), PipelineConfig::new(3, 10).unwrap())
            .await
            .unwrap();

        assert_eq!(report.batches, 0);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_inserts_do_not_stop_the_run() {
        struct RejectingSink(AtomicUsize);

        #[async_trait]
        impl RecordSink for RejectingSink {
            async fn insert(&self, _records: &[Record]) -> InsertOutcome {
                self.0.fetch_add(1, Ordering::SeqCst);
                InsertOutcome::Rejected(500)
            }
        }

        let mut scanner = Scanner::new(source(4, 1, 3), None).unwrap();
        let sink = Arc::new(RejectingSink(AtomicUsize::new(0)));

        let report = run(&mut scanner, sink.clone(), PipelineConfig::new(2, 2).unwrap())
            .await
            .unwrap();

        assert_eq!(report.batches, 4);
        assert_eq!(report.reported, 12);
        assert_eq!(sink.0.load(Ordering::SeqCst), 8);
    }

    /// Remembers the highest timestamp index read so far.
    struct TrackedSource {
        inner: MemorySource,
        scanned: Arc<AtomicUsize>,
    }

    impl GridSource for TrackedSource {
        fn latitudes(&self) -> ReaderResult<Vec<f32>> {
            self.inner.latitudes()
        }

        fn longitudes(&self) -> ReaderResult<Vec<f32>> {
            self.inner.longitudes()
        }

        fn time_hours(&self) -> ReaderResult<Vec<i64>> {
            self.inner.time_hours()
        }

        fn read_slice(&self, metric: Metric, time_index: usize) -> ReaderResult<Vec<i16>> {
            self.scanned.fetch_max(time_index + 1, Ordering::SeqCst);
            self.inner.read_slice(metric, time_index)
        }
    }

    /// Parks every insert until a permit is released.
    struct GatedSink {
        gate: Semaphore,
        entered: AtomicUsize,
    }

    #[async_trait]
    impl RecordSink for GatedSink {
        async fn insert(&self, _records: &[Record]) -> InsertOutcome {
            self.entered.fetch_add(1, Ordering::SeqCst);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            InsertOutcome::Accepted
        }
    }

    async fn scanned_settles(scanned: &AtomicUsize) -> usize {
        let mut last = scanned.load(Ordering::SeqCst);
        loop {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let now = scanned.load(Ordering::SeqCst);
            if now == last {
                return now;
            }
            last = now;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_producer_stays_one_batch_ahead_of_blocked_workers() {
        const WORKERS: usize = 3;
        const TIMESTAMPS: usize = 12;

        let scanned = Arc::new(AtomicUsize::new(0));
        let tracked = TrackedSource {
            inner: source(TIMESTAMPS, 2, 2),
            scanned: scanned.clone(),
        };
        let mut scanner = Scanner::new(tracked, None).unwrap();
        let sink = Arc::new(GatedSink {
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
        });

        let pipeline = run(
            &mut scanner,
            sink.clone(),
            PipelineConfig::new(WORKERS, 500).unwrap(),
        );
        let observe = async {
            while sink.entered.load(Ordering::SeqCst) < WORKERS {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            let held = scanned_settles(&scanned).await;
            sink.gate.add_permits(TIMESTAMPS);
            held
        };

        let (report, held) = tokio::join!(pipeline, observe);
        let report = report.unwrap();

        // One batch parked in each worker, one waiting in the handoff slot
        assert_eq!(held, WORKERS + 1);
        assert_eq!(report.batches, TIMESTAMPS as u64);
        assert_eq!(report.reported, (TIMESTAMPS * 4) as u64);
        assert_eq!(sink.entered.load(Ordering::SeqCst), TIMESTAMPS);
    }
}
