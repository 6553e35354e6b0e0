//! Download statistics shared by fetch workers

use crate::fetch::{FetchError, FetchRecord};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated concurrently by fetch workers
///
/// Workers only add; totals are read once every worker has been joined.
#[derive(Debug, Default)]
pub struct FetchStats {
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    success_millis: AtomicU64,
}

/// Final figures for one fetch stage run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchSummary {
    pub succeeded: u64,
    pub failed: u64,
    /// Requests cut short by cancellation; neither succeeded nor failed
    pub cancelled: u64,
    /// Mean duration of successful downloads, 0 when there were none
    pub mean_millis: f64,
}

impl FetchStats {
    pub fn record(&self, record: &FetchRecord) {
        match &record.outcome {
            Ok(_) => {
                self.succeeded.fetch_add(1, Ordering::Relaxed);
                self.success_millis
                    .fetch_add(record.duration_millis, Ordering::Relaxed);
            }
            Err(FetchError::Cancelled) => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn summary(&self) -> FetchSummary {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let total = self.success_millis.load(Ordering::Relaxed);

        let mean_millis = if succeeded > 0 {
            total as f64 / succeeded as f64
        } else {
            0.0
        };

        FetchSummary {
            succeeded,
            failed,
            cancelled,
            mean_millis,
        }
    }
}
