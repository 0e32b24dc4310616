pub mod counters;
pub mod drops;
pub mod histogram;
pub mod slots;
pub mod wakeup;

pub use counters::{CounterField, CounterTable, NodeCounters, NodeCountersSnapshot};
pub use drops::DropReasonTable;
pub use histogram::{HistogramSnapshot, HistogramTable, RttHistogram};
pub use slots::SlotTable;
pub use wakeup::WakeupTable;

use crate::config::AgentConfig;
use std::sync::OnceLock;
use std::time::Instant;

/// The tables shared between instrumentation callbacks and the aggregator
pub struct Tables {
    pub counters: CounterTable,
    pub histograms: HistogramTable,
    pub drop_reasons: DropReasonTable,
    pub wakeups: WakeupTable,
}

impl Tables {
    pub fn new(max_nodes: usize, max_drop_reasons: usize, max_inflight_wakeups: usize) -> Self {
        Self {
            counters: CounterTable::new(max_nodes),
            histograms: HistogramTable::new(max_nodes),
            drop_reasons: DropReasonTable::new(max_drop_reasons),
            wakeups: WakeupTable::new(max_inflight_wakeups),
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.max_nodes,
            config.max_drop_reasons,
            config.max_inflight_wakeups,
        )
    }

    /// Point-in-time copy of a node's counters and RTT histogram.
    ///
    /// `None` when the node has no counter record. A node that has counters
    /// but never saw an RTT sample gets an empty histogram.
    pub fn snapshot(&self, node_id: u32) -> Option<(NodeCountersSnapshot, HistogramSnapshot)> {
        let counters = self.counters.snapshot(node_id)?;
        let histogram = self
            .histograms
            .snapshot(node_id)
            .unwrap_or_else(HistogramSnapshot::empty);
        Some((counters, histogram))
    }

    /// Nodes present in either per-node table, ascending
    pub fn tracked_nodes(&self) -> Vec<u32> {
        let mut nodes = self.counters.nodes();
        nodes.extend(self.histograms.nodes());
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

/// Monotonic nanoseconds since the first call in this process
pub fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_requires_counter_record() {
        let tables = Tables::new(4, 4, 4);
        tables.histograms.observe(1, 8);
        assert!(tables.snapshot(1).is_none());

        tables.counters.increment(2, CounterField::RetransCount, 1);
        let (counters, histogram) = tables.snapshot(2).expect("counter record exists");
        assert_eq!(counters.retrans_count, 1);
        assert_eq!(histogram.total(), 0);

        assert_eq!(tables.tracked_nodes(), vec![1, 2]);
    }

    #[test]
    fn test_monotonic_ns_advances() {
        let first = monotonic_ns();
        let second = monotonic_ns();
        assert!(second >= first);
    }
}
