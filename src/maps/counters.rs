//! Per-node running sums and counts
//!
//! Every field is an independent atomic. Producers only ever add, so a
//! snapshot may mix values from slightly different instants but never loses
//! an increment.

use super::slots::SlotTable;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter fields addressable through [`CounterTable::increment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    RttSum,
    RttCount,
    RetransCount,
    DropCount,
    RunqlatSum,
    RunqlatCount,
}

/// Live counters for one node
#[derive(Debug, Default)]
pub struct NodeCounters {
    rtt_sum: AtomicU64,
    rtt_count: AtomicU64,
    retrans_count: AtomicU64,
    drop_count: AtomicU64,
    runqlat_sum: AtomicU64,
    runqlat_count: AtomicU64,
    last_update: AtomicU64,
}

impl NodeCounters {
    fn field(&self, field: CounterField) -> &AtomicU64 {
        match field {
            CounterField::RttSum => &self.rtt_sum,
            CounterField::RttCount => &self.rtt_count,
            CounterField::RetransCount => &self.retrans_count,
            CounterField::DropCount => &self.drop_count,
            CounterField::RunqlatSum => &self.runqlat_sum,
            CounterField::RunqlatCount => &self.runqlat_count,
        }
    }

    pub fn add(&self, field: CounterField, delta: u64) {
        self.field(field).fetch_add(delta, Ordering::Relaxed);
    }

    /// Advance the last-update timestamp, never moving it backwards
    pub fn touch(&self, timestamp_ns: u64) {
        self.last_update.fetch_max(timestamp_ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> NodeCountersSnapshot {
        NodeCountersSnapshot {
            rtt_sum: self.rtt_sum.load(Ordering::Relaxed),
            rtt_count: self.rtt_count.load(Ordering::Relaxed),
            retrans_count: self.retrans_count.load(Ordering::Relaxed),
            drop_count: self.drop_count.load(Ordering::Relaxed),
            runqlat_sum: self.runqlat_sum.load(Ordering::Relaxed),
            runqlat_count: self.runqlat_count.load(Ordering::Relaxed),
            last_update: self.last_update.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`NodeCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeCountersSnapshot {
    pub rtt_sum: u64,
    pub rtt_count: u64,
    pub retrans_count: u64,
    pub drop_count: u64,
    pub runqlat_sum: u64,
    pub runqlat_count: u64,
    /// Monotonic nanoseconds of the most recent write
    pub last_update: u64,
}

impl NodeCountersSnapshot {
    /// Mean runqueue latency in milliseconds, 0 without samples
    pub fn runqlat_mean(&self) -> f64 {
        if self.runqlat_count == 0 {
            return 0.0;
        }
        self.runqlat_sum as f64 / self.runqlat_count as f64
    }
}

/// Counter records for every node, created on first observation
pub struct CounterTable {
    inner: SlotTable<NodeCounters>,
}

impl CounterTable {
    pub fn new(max_nodes: usize) -> Self {
        Self {
            inner: SlotTable::with_capacity(max_nodes),
        }
    }

    /// Get the node's record, creating it if absent. `None` past capacity.
    pub fn entry(&self, node_id: u32) -> Option<&NodeCounters> {
        self.inner.get_or_create(node_id, NodeCounters::default)
    }

    pub fn increment(&self, node_id: u32, field: CounterField, delta: u64) {
        if let Some(counters) = self.entry(node_id) {
            counters.add(field, delta);
        }
    }

    pub fn touch(&self, node_id: u32, timestamp_ns: u64) {
        if let Some(counters) = self.entry(node_id) {
            counters.touch(timestamp_ns);
        }
    }

    pub fn snapshot(&self, node_id: u32) -> Option<NodeCountersSnapshot> {
        self.inner.get(node_id).map(NodeCounters::snapshot)
    }

    pub fn nodes(&self) -> Vec<u32> {
        self.inner.keys()
    }

    pub fn rejected(&self) -> u64 {
        self.inner.rejected()
    }
}
