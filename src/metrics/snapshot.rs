use std::time::SystemTime;

/// Aggregated metrics for one node, recomputed in full on every tick
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub node_id: u32,
    pub node_name: String,
    pub rtt_p50: f64,
    pub rtt_p99: f64,
    pub tcp_retrans_rate: f64,
    pub drop_rate: f64,
    /// Mean runqueue latency; exported under the p95 name
    pub runqlat_p95: f64,
    pub cpu_utilization: f64,
    pub last_update: SystemTime,
}

impl MetricsSnapshot {
    pub fn new(node_id: u32, node_name: impl Into<String>) -> Self {
        Self {
            node_id,
            node_name: node_name.into(),
            rtt_p50: 0.0,
            rtt_p99: 0.0,
            tcp_retrans_rate: 0.0,
            drop_rate: 0.0,
            runqlat_p95: 0.0,
            cpu_utilization: 0.0,
            last_update: SystemTime::UNIX_EPOCH,
        }
    }
}
