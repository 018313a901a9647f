//! Counters describing routing activity.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of routing counters for one [`HalDevice`](crate::HalDevice).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HalStats {
    /// Streams opened (reused streams are not counted).
    pub streams_opened: u64,
    /// Streams closed.
    pub streams_closed: u64,
    /// Patches created.
    pub patches_created: u64,
    /// Successful patch updates.
    pub patches_updated: u64,
    /// Patches released.
    pub patches_released: u64,
    /// Failed stream or voice routing calls.
    pub routing_failures: u64,
}

/// Live counters shared between the facade and the coordinator.
#[derive(Debug, Default)]
pub(crate) struct StatsState {
    pub streams_opened: AtomicU64,
    pub streams_closed: AtomicU64,
    pub patches_created: AtomicU64,
    pub patches_updated: AtomicU64,
    pub patches_released: AtomicU64,
    pub routing_failures: AtomicU64,
}

impl StatsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HalStats {
        HalStats {
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            streams_closed: self.streams_closed.load(Ordering::Relaxed),
            patches_created: self.patches_created.load(Ordering::Relaxed),
            patches_updated: self.patches_updated.load(Ordering::Relaxed),
            patches_released: self.patches_released.load(Ordering::Relaxed),
            routing_failures: self.routing_failures.load(Ordering::Relaxed),
        }
    }
}
