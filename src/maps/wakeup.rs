//! In-flight scheduler wakeups keyed by pid
//!
//! Kept apart from the per-node tables: pids and node ids are different key
//! domains and must never share a map.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub struct WakeupTable {
    inner: DashMap<u32, u64>,
    max_inflight: usize,
    inflight: AtomicUsize,
    rejected: AtomicU64,
}

impl WakeupTable {
    pub fn new(max_inflight: usize) -> Self {
        Self {
            inner: DashMap::with_capacity(max_inflight.min(1024)),
            max_inflight,
            inflight: AtomicUsize::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Store the wakeup timestamp for `pid`.
    ///
    /// A pending entry for the same pid is overwritten. New pids are dropped
    /// once the table is full; the bound is approximate under concurrent
    /// inserts.
    pub fn record_wakeup(&self, pid: u32, timestamp_ns: u64) {
        if let Some(mut pending) = self.inner.get_mut(&pid) {
            *pending = timestamp_ns;
            return;
        }
        if self.inflight.load(Ordering::Relaxed) >= self.max_inflight {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        if self.inner.insert(pid, timestamp_ns).is_none() {
            self.inflight.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove and return the pending wakeup timestamp for `pid`
    pub fn take(&self, pid: u32) -> Option<u64> {
        let (_, ts) = self.inner.remove(&pid)?;
        self.inflight.fetch_sub(1, Ordering::Relaxed);
        Some(ts)
    }

    /// Pending wakeups, without walking the map
    pub fn len(&self) -> usize {
        self.inflight.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
