//! Logical modification clock for dirty tracking.

use std::sync::atomic::{AtomicU64, Ordering};

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// An opaque, strictly-increasing modification timestamp.
///
/// Cached GPU resources compare the timestamp of their source data
/// against the timestamp recorded at their last successful build to
/// decide whether a rebuild is needed. Only ordering is meaningful;
/// there is no wall-clock relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The lowest possible timestamp. Never returned by [`Timestamp::tick`],
    /// so a resource whose build time is `ZERO` is stale against any
    /// modified input — first build and stale build share one comparison.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Draws the next value from the process-wide clock.
    #[must_use]
    pub fn tick() -> Timestamp {
        Timestamp(CLOCK.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::ZERO
    }
}
