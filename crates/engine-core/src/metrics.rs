use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_skipped: AtomicU64,
    records_committed: AtomicU64,
    chunks_committed: AtomicU64,
    loop_iterations: AtomicU64,
    failure_count: AtomicU64,
}

/// Run-wide counters, cheap to clone and share between operations.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub records_skipped: u64,
    pub records_committed: u64,
    pub chunks_committed: u64,
    pub loop_iterations: u64,
    pub failure_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_skipped(&self, count: u64) {
        self.inner
            .records_skipped
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_chunk(&self, rows: u64) {
        self.inner
            .records_committed
            .fetch_add(rows, Ordering::Relaxed);
        self.inner.chunks_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_iterations(&self) {
        self.inner.loop_iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failures(&self) {
        self.inner.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_skipped: self.inner.records_skipped.load(Ordering::Relaxed),
            records_committed: self.inner.records_committed.load(Ordering::Relaxed),
            chunks_committed: self.inner.chunks_committed.load(Ordering::Relaxed),
            loop_iterations: self.inner.loop_iterations.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
        }
    }
}
