//! Periodic aggregation of the shared tables into metrics snapshots
//!
//! The aggregator is the single consumer of the event channel and the only
//! reader that turns raw counters into rates and percentiles. It is
//! synchronous; the CLI runs it on a blocking thread.

use crate::config::AgentConfig;
use crate::events::{EventReceiver, EventType};
use crate::maps::Tables;
use crate::metrics::{percentile, CpuSampler, Exporter, MetricsSnapshot, RateState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maps node ids to the `node` label
#[derive(Debug, Clone)]
pub struct NodeNames {
    host: String,
}

impl NodeNames {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    pub fn name(&self, node_id: u32) -> String {
        if node_id == 0 {
            self.host.clone()
        } else {
            format!("{}-{}", self.host, node_id)
        }
    }
}

pub struct Aggregator {
    tables: Arc<Tables>,
    receiver: EventReceiver,
    cpu: Box<dyn CpuSampler>,
    node_names: NodeNames,
    interval: Duration,
    poll_timeout: Duration,
    rates: HashMap<u32, RateState>,
    processed: [u64; 4],
    ticks: u64,
}

impl Aggregator {
    pub fn new(
        tables: Arc<Tables>,
        receiver: EventReceiver,
        cpu: Box<dyn CpuSampler>,
        node_names: NodeNames,
        config: &AgentConfig,
    ) -> Self {
        Self {
            tables,
            receiver,
            cpu,
            node_names,
            interval: config.interval(),
            poll_timeout: config.poll_timeout(),
            rates: HashMap::new(),
            processed: [0; 4],
            ticks: 0,
        }
    }

    /// Take whatever the channel holds, waiting at most `timeout`.
    ///
    /// Events are informational only; the tables already carry their effect.
    pub fn drain(&mut self, timeout: Duration) -> usize {
        let events = self.receiver.poll(timeout);
        for event in &events {
            debug!(
                "Event: node={} type={} value={} extra={}",
                event.node_id, event.event_type, event.value, event.extra_data
            );
            self.processed[event.event_type.index()] += 1;
        }
        events.len()
    }

    /// Number of events drained so far for `event_type`
    pub fn processed(&self, event_type: EventType) -> u64 {
        self.processed[event_type.index()]
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Recompute a snapshot for every tracked node, in ascending node order
    pub fn tick(&mut self, now: Instant) -> Vec<MetricsSnapshot> {
        self.ticks += 1;
        let wall_clock = SystemTime::now();
        let cpu_utilization = self.cpu.current_utilization();
        debug!(
            "Tick {}: channel depth {}/{}, {} dropped",
            self.ticks,
            self.receiver.len(),
            self.receiver.capacity(),
            self.receiver.dropped()
        );

        let mut snapshots = Vec::new();
        for node_id in self.tables.tracked_nodes() {
            let Some((counters, histogram)) = self.tables.snapshot(node_id) else {
                debug!("Node {} has no counters yet, skipping", node_id);
                continue;
            };

            let (tcp_retrans_rate, drop_rate) =
                self.rates.entry(node_id).or_default().update(&counters, now);

            snapshots.push(MetricsSnapshot {
                node_id,
                node_name: self.node_names.name(node_id),
                rtt_p50: percentile(&histogram, 50.0),
                rtt_p99: percentile(&histogram, 99.0),
                tcp_retrans_rate,
                drop_rate,
                runqlat_p95: counters.runqlat_mean(),
                cpu_utilization,
                last_update: wall_clock,
            });
        }

        snapshots
    }

    /// Tick immediately, then every interval, until `shutdown` is cancelled
    pub fn run<E: Exporter>(&mut self, exporter: &mut E, shutdown: &CancellationToken) {
        info!(
            "Aggregating every {:?} (poll timeout {:?})",
            self.interval, self.poll_timeout
        );

        let mut next_tick = Instant::now();
        while !shutdown.is_cancelled() {
            let now = Instant::now();
            if now >= next_tick {
                let snapshots = self.tick(now);
                if let Err(e) = exporter.export(&snapshots) {
                    warn!("Failed to export metrics: {}", e);
                }
                next_tick += self.interval;
                if next_tick < now {
                    // Fell behind by more than an interval
                    next_tick = now + self.interval;
                }
            }

            let until_tick = next_tick.saturating_duration_since(Instant::now());
            self.drain(self.poll_timeout.min(until_tick));
        }

        info!(
            "Aggregator stopped after {} ticks ({} events published, {} dropped)",
            self.ticks,
            self.receiver.published(),
            self.receiver.dropped()
        );
    }
}
