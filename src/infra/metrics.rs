//! Lock-free metrics collection and batch reporting
//!
//! Counters are plain atomics updated from worker threads; `report()` swaps
//! the periodic ones to zero and returns a summary.
//!
//! NOTE: All atomics use Relaxed ordering. These are statistical counters
//! only and must not be used for coordination.

use crate::domain::types::SymbolKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Resolution latency bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

const NUM_KINDS: usize = SymbolKind::ALL.len();

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

fn swap_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Upper bound of the bucket containing the percentile. The target rank is
/// rounded up, so the median of three samples is the second one.
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile).ceil() as u64;
    let mut cumulative = 0u64;

    // Last bucket reports twice the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Lock-free metrics collector shared by the pipeline workers
pub struct Metrics {
    /// Scans resolved to a determination (monotonic)
    scans_resolved: AtomicU64,
    /// Scans that failed resolution (monotonic)
    scans_failed: AtomicU64,
    /// Scans since last report (reset on report)
    scans_since_report: AtomicU64,
    /// Panels built from clusters (monotonic)
    panels_built: AtomicU64,
    /// Classified lines per symbol kind, indexed by `SymbolKind::index` (monotonic)
    lines_by_kind: [AtomicU64; NUM_KINDS],
    /// Weekday rules turned into holiday rules by red ink (monotonic)
    red_ink_upgrades: AtomicU64,
    /// Determinations that allow parking (monotonic)
    parking_allowed: AtomicU64,
    /// Pipeline latency histogram (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    latency_sum_us: AtomicU64,
    latency_max_us: AtomicU64,
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scans_resolved: AtomicU64::new(0),
            scans_failed: AtomicU64::new(0),
            scans_since_report: AtomicU64::new(0),
            panels_built: AtomicU64::new(0),
            lines_by_kind: std::array::from_fn(|_| AtomicU64::new(0)),
            red_ink_upgrades: AtomicU64::new(0),
            parking_allowed: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_line_classified(&self, kind: SymbolKind) {
        self.lines_by_kind[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_red_ink_upgrade(&self) {
        self.red_ink_upgrades.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_panels(&self, count: usize) {
        self.panels_built.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a scan that produced a determination
    #[inline]
    pub fn record_scan_resolved(&self, allowed_to_park: bool, latency_us: u64) {
        self.scans_resolved.fetch_add(1, Ordering::Relaxed);
        if allowed_to_park {
            self.parking_allowed.fetch_add(1, Ordering::Relaxed);
        }
        self.record_latency(latency_us);
    }

    #[inline]
    pub fn record_scan_failed(&self, latency_us: u64) {
        self.scans_failed.fetch_add(1, Ordering::Relaxed);
        self.record_latency(latency_us);
    }

    fn record_latency(&self, latency_us: u64) {
        self.scans_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn scans_resolved(&self) -> u64 {
        self.scans_resolved.load(Ordering::Relaxed)
    }

    pub fn scans_failed(&self) -> u64 {
        self.scans_failed.load(Ordering::Relaxed)
    }

    pub fn lines_classified(&self, kind: SymbolKind) -> u64 {
        self.lines_by_kind[kind.index()].load(Ordering::Relaxed)
    }

    /// Summarise and reset the periodic counters
    pub fn report(&self) -> MetricsSummary {
        let scans_count = self.scans_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let scans_per_sec = if elapsed.as_secs_f64() > 0.0 {
            scans_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let avg_latency = if scans_count > 0 { latency_sum / scans_count } else { 0 };

        let mut lines_by_kind = [0u64; NUM_KINDS];
        for (slot, counter) in lines_by_kind.iter_mut().zip(self.lines_by_kind.iter()) {
            *slot = counter.load(Ordering::Relaxed);
        }

        MetricsSummary {
            scans_resolved: self.scans_resolved.load(Ordering::Relaxed),
            scans_failed: self.scans_failed.load(Ordering::Relaxed),
            scans_per_sec,
            panels_built: self.panels_built.load(Ordering::Relaxed),
            lines_by_kind,
            red_ink_upgrades: self.red_ink_upgrades.load(Ordering::Relaxed),
            parking_allowed: self.parking_allowed.load(Ordering::Relaxed),
            avg_latency_us: avg_latency,
            max_latency_us: max_latency,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct MetricsSummary {
    pub scans_resolved: u64,
    pub scans_failed: u64,
    pub scans_per_sec: f64,
    pub panels_built: u64,
    pub lines_by_kind: [u64; NUM_KINDS],
    pub red_ink_upgrades: u64,
    pub parking_allowed: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
}

impl MetricsSummary {
    pub fn lines_classified(&self, kind: SymbolKind) -> u64 {
        self.lines_by_kind[kind.index()]
    }

    pub fn log(&self) {
        info!(
            scans_resolved = %self.scans_resolved,
            scans_failed = %self.scans_failed,
            scans_per_sec = format!("{:.1}", self.scans_per_sec),
            panels = %self.panels_built,
            allowed = %self.parking_allowed,
            red_ink_upgrades = %self.red_ink_upgrades,
            paid = %self.lines_classified(SymbolKind::Paid),
            weekday = %self.lines_classified(SymbolKind::Weekday),
            pre_holiday = %self.lines_classified(SymbolKind::PreHoliday),
            holiday = %self.lines_classified(SymbolKind::Holiday),
            time_range = %self.lines_classified(SymbolKind::TimeRange),
            unknown = %self.lines_classified(SymbolKind::Unknown),
            avg_latency_us = %self.avg_latency_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.scans_resolved(), 0);
        assert_eq!(metrics.scans_failed(), 0);
        assert_eq!(metrics.lines_classified(SymbolKind::Paid), 0);
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(100), 0);
        assert_eq!(bucket_index(101), 1);
        assert_eq!(bucket_index(51200), 9);
        assert_eq!(bucket_index(60000), 10);
    }

    #[test]
    fn test_lines_counted_per_kind() {
        let metrics = Metrics::new();
        metrics.record_line_classified(SymbolKind::Weekday);
        metrics.record_line_classified(SymbolKind::Weekday);
        metrics.record_line_classified(SymbolKind::Unknown);
        assert_eq!(metrics.lines_classified(SymbolKind::Weekday), 2);
        assert_eq!(metrics.lines_classified(SymbolKind::Unknown), 1);
        assert_eq!(metrics.lines_classified(SymbolKind::Paid), 0);
    }

    #[test]
    fn test_report() {
        let metrics = Metrics::new();
        metrics.record_scan_resolved(true, 100);
        metrics.record_scan_resolved(false, 200);
        metrics.record_scan_failed(300);
        metrics.record_panels(4);
        metrics.record_red_ink_upgrade();

        let summary = metrics.report();
        assert_eq!(summary.scans_resolved, 2);
        assert_eq!(summary.scans_failed, 1);
        assert_eq!(summary.parking_allowed, 1);
        assert_eq!(summary.panels_built, 4);
        assert_eq!(summary.red_ink_upgrades, 1);
        assert_eq!(summary.avg_latency_us, 200);
        assert_eq!(summary.max_latency_us, 300);
        assert_eq!(summary.lat_p50_us, 200);
    }

    #[test]
    fn test_percentile_target_rounds_up() {
        let mut buckets = [0u64; NUM_BUCKETS];
        buckets[0] = 1;
        buckets[1] = 1;
        buckets[2] = 1;
        assert_eq!(percentile_from_buckets(&buckets, 0.50), 200);
        assert_eq!(percentile_from_buckets(&buckets, 0.99), 400);

        let mut single = [0u64; NUM_BUCKETS];
        single[3] = 1;
        assert_eq!(percentile_from_buckets(&single, 0.50), 800);
    }

    #[test]
    fn test_report_resets_periodic_counters() {
        let metrics = Metrics::new();
        metrics.record_scan_resolved(true, 500);
        metrics.report();

        let summary = metrics.report();
        assert_eq!(summary.scans_resolved, 1);
        assert_eq!(summary.avg_latency_us, 0);
        assert_eq!(summary.max_latency_us, 0);
        assert_eq!(summary.lat_p99_us, 0);
    }
}
