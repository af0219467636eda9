//! Throughput counters for monitored nodes.
//!
//! Counters live on the plan (`Arc<NodeMetrics>`) and are updated by the
//! runtime through atomics, so a plan can be dumped while a run is in flight.
//! They accumulate across runs of the same plan.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Capability of reporting how many rows a node processed and how long it took.
pub trait Monitored {
    /// Cumulative processing time in milliseconds.
    fn total_time(&self) -> u64;

    /// Number of rows processed.
    fn count(&self) -> u64;

    /// Rows per second. `+Infinity` when rows were processed in no measurable
    /// time, `0` when no row was processed.
    fn throughput(&self) -> f64 {
        let count = self.count();
        let total_time = self.total_time();
        if count == 0 {
            0.0
        } else if total_time == 0 {
            f64::INFINITY
        } else {
            count as f64 / (total_time as f64 / 1000.0)
        }
    }
}

/// Atomic row/time counters shared between a plan node and its runtimes.
#[derive(Debug, Default)]
pub struct NodeMetrics {
    count: AtomicU64,
    total_nanos: AtomicU64,
}

impl NodeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one row processed in `elapsed`.
    pub fn record(&self, elapsed: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.add_time(elapsed);
    }

    /// Add time spent outside row processing (e.g. flushing on a signal).
    pub fn add_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Start timing a row; the row is recorded when the guard drops, on every
    /// exit path.
    pub fn time_row(&self) -> RowTimer<'_> {
        RowTimer {
            metrics: self,
            start: Instant::now(),
            counts: true,
        }
    }

    /// Like [`NodeMetrics::time_row`] but only adds time.
    pub fn time_signal(&self) -> RowTimer<'_> {
        RowTimer {
            metrics: self,
            start: Instant::now(),
            counts: false,
        }
    }
}

impl Monitored for NodeMetrics {
    fn total_time(&self) -> u64 {
        self.total_nanos.load(Ordering::Relaxed) / 1_000_000
    }

    fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Drop guard returned by [`NodeMetrics::time_row`].
pub struct RowTimer<'a> {
    metrics: &'a NodeMetrics,
    start: Instant,
    counts: bool,
}

impl Drop for RowTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if self.counts {
            self.metrics.record(elapsed);
        } else {
            self.metrics.add_time(elapsed);
        }
    }
}

/// Render a throughput value, `+Infinity` included.
pub fn format_throughput(throughput: f64) -> String {
    if throughput.is_infinite() {
        "+Infinity".to_string()
    } else {
        format!("{:.1}", throughput)
    }
}

/// `(total: <ms> ms, count: <n>, <t> rows/s)`
pub fn format_metrics(monitored: &dyn Monitored) -> String {
    format!(
        "(total: {} ms, count: {}, {} rows/s)",
        monitored.total_time(),
        monitored.count(),
        format_throughput(monitored.throughput())
    )
}
