//! Status - dispatcher counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of the dispatcher's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCounts {
    pub pool_size: usize,
    /// Jobs accepted into the queue.
    pub submitted: u64,
    /// Jobs whose response was attached.
    pub completed: u64,
    /// Jobs abandoned after a failed pipeline step.
    pub failed: u64,
}

impl DispatchCounts {
    /// Accepted but not finished yet (queued or in a worker).
    pub fn pending(&self) -> u64 {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}

#[derive(Debug, Default)]
pub(crate) struct DispatchStats {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl DispatchStats {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, pool_size: usize) -> DispatchCounts {
        DispatchCounts {
            pool_size,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
