//! Instrumentation callbacks
//!
//! One handler per kernel hook. Each updates the shared tables first and
//! then, subject to sampling, publishes a [`SampledEvent`]. Handlers never
//! block and never fail: out-of-range keys and a full channel just drop data.

use super::node::NodeIdFn;
use super::sampler::SamplingPolicy;
use crate::events::{EventPublisher, EventType, SampledEvent};
use crate::maps::{monotonic_ns, CounterField, Tables};
use ebtel_common::srtt_us_to_ms;
use std::sync::Arc;

#[derive(Clone)]
pub struct Probes {
    tables: Arc<Tables>,
    publisher: EventPublisher,
    sampling: SamplingPolicy,
    node_id: NodeIdFn,
}

impl Probes {
    pub fn new(
        tables: Arc<Tables>,
        publisher: EventPublisher,
        sampling: SamplingPolicy,
        node_id: NodeIdFn,
    ) -> Self {
        Self {
            tables,
            publisher,
            sampling,
            node_id,
        }
    }

    pub fn tables(&self) -> &Arc<Tables> {
        &self.tables
    }

    /// `tcp/tcp_ack`: `srtt_us` is the kernel's smoothed RTT, shifted by 3
    pub fn on_tcp_ack(&self, srtt_us: u32) {
        self.record_rtt(srtt_us_to_ms(srtt_us));
    }

    pub fn record_rtt(&self, rtt_ms: u64) {
        let node_id = (self.node_id)();
        let now = monotonic_ns();

        self.tables.histograms.observe(node_id, rtt_ms);
        if let Some(counters) = self.tables.counters.entry(node_id) {
            counters.add(CounterField::RttSum, rtt_ms);
            counters.add(CounterField::RttCount, 1);
            counters.touch(now);
        }

        self.emit(node_id, EventType::Rtt, rtt_ms, now, 0);
    }

    /// `tcp/tcp_retransmit_skb`
    pub fn on_tcp_retransmit(&self) {
        let node_id = (self.node_id)();
        let now = monotonic_ns();

        if let Some(counters) = self.tables.counters.entry(node_id) {
            counters.add(CounterField::RetransCount, 1);
            counters.touch(now);
        }

        self.emit(node_id, EventType::Retrans, 1, now, 0);
    }

    /// `skb/kfree_skb`: `reason` is 0 on kernels without drop reasons
    pub fn on_skb_drop(&self, reason: u32) {
        let node_id = (self.node_id)();
        let now = monotonic_ns();

        self.tables.drop_reasons.record(reason);
        if let Some(counters) = self.tables.counters.entry(node_id) {
            counters.add(CounterField::DropCount, 1);
            counters.touch(now);
        }

        self.emit(node_id, EventType::Drop, 1, now, reason);
    }

    /// `sched/sched_wakeup`
    pub fn on_sched_wakeup(&self, pid: u32) {
        self.tables.wakeups.record_wakeup(pid, monotonic_ns());
    }

    /// `sched/sched_switch`: closes the wakeup of `next_pid`, if one is pending
    pub fn on_sched_switch(&self, next_pid: u32) {
        let Some(woken_at) = self.tables.wakeups.take(next_pid) else {
            return;
        };

        let now = monotonic_ns();
        let latency_ms = now.saturating_sub(woken_at) / 1_000_000;
        let node_id = (self.node_id)();

        if let Some(counters) = self.tables.counters.entry(node_id) {
            counters.add(CounterField::RunqlatSum, latency_ms);
            counters.add(CounterField::RunqlatCount, 1);
            counters.touch(now);
        }

        self.emit(node_id, EventType::Runqlat, latency_ms, now, next_pid);
    }

    fn emit(
        &self,
        node_id: u32,
        event_type: EventType,
        value: u64,
        timestamp_ns: u64,
        extra_data: u32,
    ) {
        if !self.sampling.should_publish(event_type) {
            return;
        }
        self.publisher.publish(SampledEvent {
            node_id,
            event_type,
            value,
            timestamp_ns,
            extra_data,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use crate::probe::node;
    use std::thread;
    use std::time::Duration;

    fn probes(sampling: SamplingPolicy) -> (Probes, crate::events::EventReceiver) {
        let tables = Arc::new(Tables::new(8, 8, 8));
        let (publisher, receiver) = EventChannel::bounded(64);
        (
            Probes::new(tables, publisher, sampling, node::fixed(2)),
            receiver,
        )
    }

    #[test]
    fn test_rtt_updates_histogram_and_counters() {
        let (probes, receiver) = probes(SamplingPolicy::unsampled());
        probes.record_rtt(12);
        probes.on_tcp_ack(3_000 << 3);

        let (counters, histogram) = probes.tables().snapshot(2).expect("node 2 tracked");
        assert_eq!(counters.rtt_sum, 15);
        assert_eq!(counters.rtt_count, 2);
        assert_eq!(histogram.buckets[3], 1); // 12ms
        assert_eq!(histogram.buckets[1], 1); // 3ms

        let events = receiver.poll(Duration::from_millis(10));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_type == EventType::Rtt && e.node_id == 2));
    }

    #[test]
    fn test_drop_records_reason_and_extra_data() {
        let (probes, receiver) = probes(SamplingPolicy::unsampled());
        probes.on_skb_drop(5);
        probes.on_skb_drop(5);

        assert_eq!(probes.tables().drop_reasons.count(5), 2);
        assert_eq!(probes.tables().counters.snapshot(2).map(|c| c.drop_count), Some(2));

        let events = receiver.poll(Duration::from_millis(10));
        assert!(events.iter().all(|e| e.extra_data == 5));
    }

    #[test]
    fn test_sampling_suppresses_events_not_counts() {
        let sampling = SamplingPolicy {
            rtt: 0,
            retrans: 0,
            drop: 0,
            runqlat: 0,
        };
        let (probes, receiver) = probes(sampling);
        for _ in 0..10 {
            probes.on_tcp_retransmit();
            probes.record_rtt(4);
        }

        let counters = probes.tables().counters.snapshot(2).expect("node 2 tracked");
        assert_eq!(counters.retrans_count, 10);
        assert_eq!(counters.rtt_count, 10);
        assert!(receiver.poll(Duration::from_millis(5)).is_empty());
    }

    #[test]
    fn test_runqueue_latency_from_wakeup_to_switch() {
        let (probes, receiver) = probes(SamplingPolicy::unsampled());
        probes.on_sched_wakeup(4242);
        thread::sleep(Duration::from_millis(3));
        probes.on_sched_switch(4242);
        // Switch without a pending wakeup is ignored
        probes.on_sched_switch(4242);

        let counters = probes.tables().counters.snapshot(2).expect("node 2 tracked");
        assert_eq!(counters.runqlat_count, 1);
        assert!(counters.runqlat_sum >= 3);
        assert!(probes.tables().wakeups.is_empty());

        let events = receiver.poll(Duration::from_millis(10));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Runqlat);
        assert_eq!(events[0].extra_data, 4242);
    }

    #[test]
    fn test_wakeup_pids_do_not_create_node_records() {
        let (probes, _receiver) = probes(SamplingPolicy::unsampled());
        probes.on_sched_wakeup(1);
        probes.on_sched_wakeup(3);
        assert!(probes.tables().tracked_nodes().is_empty());
    }

    #[test]
    fn test_out_of_range_node_is_dropped_silently() {
        let tables = Arc::new(Tables::new(2, 8, 8));
        let (publisher, _receiver) = EventChannel::bounded(8);
        let probes = Probes::new(tables, publisher, SamplingPolicy::unsampled(), node::fixed(9));

        probes.record_rtt(10);
        probes.on_tcp_retransmit();

        assert!(probes.tables().tracked_nodes().is_empty());
        assert_eq!(probes.tables().counters.rejected(), 2);
    }
}
