// src/pool/stats.rs
//! Statistics tracking for connection pools.

use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) struct StatsInner {
    pub(crate) acquired: AtomicUsize,
    pub(crate) created: AtomicUsize,
    pub(crate) reused: AtomicUsize,
    pub(crate) returned: AtomicUsize,
    pub(crate) discarded: AtomicUsize,
}

impl StatsInner {
    pub(crate) fn new() -> Self {
        Self {
            acquired: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            returned: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, idle: usize, max_cap: usize) -> PoolStats {
        PoolStats {
            idle,
            max_cap,
            acquired: self.acquired.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            returned: self.returned.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters for a [`crate::Pool`].
///
/// All counters use `Relaxed` ordering; values are eventually consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections idle in the pool when the snapshot was taken
    pub idle: usize,
    /// Idle-queue capacity
    pub max_cap: usize,
    /// Successful `get()` calls
    pub acquired: usize,
    /// Connections opened by the factory, including the initial fill
    pub created: usize,
    /// `get()` calls served from the idle queue
    pub reused: usize,
    /// Connections that went back into the idle queue
    pub returned: usize,
    /// Connections the pool closed physically
    pub discarded: usize,
}

impl PoolStats {
    /// Returns the idle-queue hit rate as a percentage (0.0-100.0).
    ///
    /// # Examples
    ///
    /// ```
    /// use connpool::PoolStats;
    ///
    /// let stats = PoolStats { acquired: 4, reused: 3, ..Default::default() };
    /// assert_eq!(stats.hit_rate(), 75.0);
    /// ```
    pub fn hit_rate(&self) -> f64 {
        if self.acquired == 0 {
            return 0.0;
        }
        (self.reused as f64 / self.acquired as f64) * 100.0
    }
}
