//! Buffering cache statistics.
//!
//! Counters are bumped from both contexts with relaxed atomics and read as
//! a consistent-enough [`MetricsSnapshot`].

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for fragment reads and render-side cache activity.
#[derive(Debug, Default)]
pub struct BufferingMetrics {
    /// Fragments successfully loaded into an element
    fragments_read: AtomicU64,
    /// Signal record bytes read from disk
    bytes_read: AtomicU64,
    /// Element writes that failed and will be retried
    read_failures: AtomicU64,
    /// Render reads with no readable element covering the frame
    cache_misses: AtomicU64,
    /// Fragment boundaries crossed on render
    advances: AtomicU64,
    /// Overwrite requests applied on render
    overwrites: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub fragments_read: u64,
    pub bytes_read: u64,
    pub read_failures: u64,
    pub cache_misses: u64,
    pub advances: u64,
    pub overwrites: u64,
}

impl BufferingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fragment_read(&self, bytes: u64) {
        self.fragments_read.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_read_failure(&self) {
        self.read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_advance(&self) {
        self.advances.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overwrite(&self) {
        self.overwrites.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fragments_read: self.fragments_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            advances: self.advances.load(Ordering::Relaxed),
            overwrites: self.overwrites.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.fragments_read,
            &self.bytes_read,
            &self.read_failures,
            &self.cache_misses,
            &self.advances,
            &self.overwrites,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = BufferingMetrics::new();
        metrics.record_fragment_read(100);
        metrics.record_fragment_read(50);
        metrics.record_cache_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fragments_read, 2);
        assert_eq!(snapshot.bytes_read, 150);
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.advances, 0);
    }

    #[test]
    fn test_reset() {
        let metrics = BufferingMetrics::new();
        metrics.record_advance();
        metrics.record_overwrite();
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = BufferingMetrics::new();
        metrics.record_read_failure();
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"read_failures\":1"));
    }
}
