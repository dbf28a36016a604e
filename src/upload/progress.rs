//! Upload progress counters.
//!
//! Counters are atomics behind an `Arc` so an observer task can read the
//! fraction while the upload runs elsewhere.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Completed/total unit counters for one attachment
#[derive(Debug, Default)]
pub struct UploadProgress {
    completed: AtomicU64,
    total: AtomicU64,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// `completed / total`, 0.0 before an upload starts
    pub fn fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.completed() as f64 / total as f64
    }

    pub fn is_complete(&self) -> bool {
        let total = self.total();
        total > 0 && self.completed() >= total
    }

    /// Start a new run with a fixed budget and nothing completed
    pub(crate) fn reset(&self, total: u64) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Add `units`, never exceeding the total
    pub(crate) fn add(&self, units: u64) {
        let total = self.total();
        let _ = self
            .completed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |done| {
                Some(done.saturating_add(units).min(total))
            });
    }

    /// Raise completed to at least `units`; lower values are ignored
    pub(crate) fn advance_to(&self, units: u64) {
        self.completed
            .fetch_max(units.min(self.total()), Ordering::SeqCst);
    }

    /// Snap to 100%
    pub(crate) fn complete(&self) {
        self.completed.store(self.total(), Ordering::SeqCst);
    }
}

/// Maps byte-level transfer progress onto a slice of the unit budget.
///
/// Handed to the transport for the duration of one media submission.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    progress: Arc<UploadProgress>,
    base: u64,
    units: u64,
}

impl ProgressReporter {
    pub fn new(progress: Arc<UploadProgress>, base: u64, units: u64) -> Self {
        Self {
            progress,
            base,
            units,
        }
    }

    /// Record that `sent` of `total_bytes` have been handed to the network
    pub fn report(&self, sent: u64, total_bytes: u64) {
        let done = if total_bytes == 0 {
            self.units
        } else {
            let scaled = u128::from(self.units) * u128::from(sent.min(total_bytes))
                / u128::from(total_bytes);
            scaled as u64
        };
        self.progress.advance_to(self.base + done);
    }
}
