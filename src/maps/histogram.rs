use super::slots::SlotTable;
use ebtel_common::{value_to_slot, MAX_SLOTS};
use std::sync::atomic::{AtomicU64, Ordering};

/// Power-of-two bucketed RTT histogram for one node.
/// Bucket `i` counts samples in `[2^i, 2^(i+1))`.
pub struct RttHistogram {
    buckets: [AtomicU64; MAX_SLOTS],
}

impl RttHistogram {
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    pub fn observe(&self, value: u64) {
        self.buckets[value_to_slot(value)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let mut buckets = [0u64; MAX_SLOTS];
        for (slot, bucket) in buckets.iter_mut().zip(self.buckets.iter()) {
            *slot = bucket.load(Ordering::Relaxed);
        }
        HistogramSnapshot { buckets }
    }
}

impl Default for RttHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RttHistogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RttHistogram")
            .field("total", &self.snapshot().total())
            .finish()
    }
}

/// Point-in-time copy of a histogram's bucket counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramSnapshot {
    pub buckets: [u64; MAX_SLOTS],
}

impl HistogramSnapshot {
    pub fn empty() -> Self {
        Self {
            buckets: [0; MAX_SLOTS],
        }
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }
}

impl Default for HistogramSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// RTT histograms for every node, created on first sample
pub struct HistogramTable {
    inner: SlotTable<RttHistogram>,
}

impl HistogramTable {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            inner: SlotTable::with_capacity(max_nodes),
        }
    }

    pub fn observe(&self, node_id: u32, value: u64) {
        if let Some(hist) = self.inner.get_or_create(node_id, RttHistogram::new) {
            hist.observe(value);
        }
    }

    pub fn snapshot(&self, node_id: u32) -> Option<HistogramSnapshot> {
        self.inner.get(node_id).map(RttHistogram::snapshot)
    }

    pub fn nodes(&self) -> Vec<u32> {
        self.inner.keys()
    }

    pub fn rejected(&self) -> u64 {
        self.inner.rejected()
    }
}
