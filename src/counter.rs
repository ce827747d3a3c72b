use std::sync::atomic::{AtomicU64, Ordering};

/// The tree-wide monotonic version counter updates handshake against and
/// scans snapshot via a single `fetch_add`.
#[derive(Default)]
pub(crate) struct Counter(AtomicU64);

impl Counter {
    pub(crate) fn load(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Atomically reads the current value and advances it by one, returning
    /// the pre-increment value. A `rangeScan` uses that value as its
    /// snapshot sequence: every node created afterward is guaranteed to
    /// carry a strictly greater `version_seq`.
    pub(crate) fn fetch_advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel)
    }
}
