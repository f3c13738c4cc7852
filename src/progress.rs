//! Shared progress record for the Parallel Indexing Coordinator (§4.4).
//!
//! Written after each completed file, polled by the Engine State Machine.
//! Never pushed synchronously to callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A point-in-time snapshot of indexing progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub indexed_files: u64,
    pub total_files: u64,
    pub completion_percentage: f64,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
}

/// Atomic counters backing the progress record; cheap to update from a
/// worker-result-handling loop, cheap to poll from anywhere else.
pub struct ProgressRecord {
    indexed_files: AtomicU64,
    total_files: AtomicU64,
    started_at: Instant,
}

impl ProgressRecord {
    pub fn new(total_files: u64) -> Self {
        Self {
            indexed_files: AtomicU64::new(0),
            total_files: AtomicU64::new(total_files),
            started_at: Instant::now(),
        }
    }

    pub fn record_completed_file(&self) {
        self.indexed_files.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let indexed = self.indexed_files.load(Ordering::SeqCst);
        let total = self.total_files.load(Ordering::SeqCst);
        let elapsed = self.started_at.elapsed();

        let completion_percentage = if total == 0 {
            100.0
        } else {
            (indexed as f64 / total as f64) * 100.0
        };

        let eta = if indexed == 0 || total == 0 || indexed >= total {
            None
        } else {
            let per_file = elapsed.as_secs_f64() / indexed as f64;
            let remaining = (total - indexed) as f64 * per_file;
            Some(Duration::from_secs_f64(remaining.max(0.0)))
        };

        ProgressSnapshot {
            indexed_files: indexed,
            total_files: total,
            completion_percentage,
            elapsed,
            eta,
        }
    }
}
