use crate::metrics::snapshot::MetricsSnapshot;
use crate::{EbtelError, Result};
use std::fmt::Write as _;
use std::io::{self, Stdout, Write};
use tracing::debug;

struct Gauge {
    name: &'static str,
    help: &'static str,
    value: fn(&MetricsSnapshot) -> f64,
}

const GAUGES: [Gauge; 6] = [
    Gauge {
        name: "ebpf_rtt_p50_milliseconds",
        help: "50th percentile RTT in milliseconds",
        value: |m| m.rtt_p50,
    },
    Gauge {
        name: "ebpf_rtt_p99_milliseconds",
        help: "99th percentile RTT in milliseconds",
        value: |m| m.rtt_p99,
    },
    Gauge {
        name: "ebpf_tcp_retrans_rate",
        help: "TCP retransmission rate per second",
        value: |m| m.tcp_retrans_rate,
    },
    Gauge {
        name: "ebpf_drop_rate",
        help: "Packet drop rate per second",
        value: |m| m.drop_rate,
    },
    Gauge {
        name: "ebpf_runqlat_p95_milliseconds",
        help: "95th percentile runqueue latency",
        value: |m| m.runqlat_p95,
    },
    Gauge {
        name: "ebpf_cpu_utilization",
        help: "CPU utilization percentage",
        value: |m| m.cpu_utilization,
    },
];

/// Render one tick's snapshots as Prometheus exposition text.
///
/// Each gauge gets its `# HELP` and `# TYPE` lines once, followed by one
/// sample per node; a blank line terminates the record. No snapshots renders
/// nothing.
pub fn render(snapshots: &[MetricsSnapshot]) -> String {
    let mut out = String::new();
    if snapshots.is_empty() {
        return out;
    }

    for gauge in &GAUGES {
        let _ = writeln!(out, "# HELP {} {}", gauge.name, gauge.help);
        let _ = writeln!(out, "# TYPE {} gauge", gauge.name);
        for snapshot in snapshots {
            let _ = writeln!(
                out,
                "{}{{node=\"{}\"}} {:.2}",
                gauge.name,
                escape_label_value(&snapshot.node_name),
                (gauge.value)(snapshot)
            );
        }
    }
    out.push('\n');
    out
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Sink for a tick's worth of snapshots
pub trait Exporter {
    /// Emit all snapshots of one tick as a single record
    fn export(&mut self, snapshots: &[MetricsSnapshot]) -> Result<()>;
}

/// Writes Prometheus text to any `Write` sink, one `write_all` per tick
pub struct PrometheusExporter<W: Write> {
    out: W,
    exports: u64,
}

impl PrometheusExporter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> PrometheusExporter<W> {
    pub fn new(out: W) -> Self {
        Self { out, exports: 0 }
    }

    /// Number of ticks written so far
    pub fn exports(&self) -> u64 {
        self.exports
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Exporter for PrometheusExporter<W> {
    fn export(&mut self, snapshots: &[MetricsSnapshot]) -> Result<()> {
        if snapshots.is_empty() {
            debug!("No tracked nodes, nothing to export");
            return Ok(());
        }

        let text = render(snapshots);
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| EbtelError::Export(format!("failed to write metrics: {}", e)))?;
        self.exports += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(node_name: &str) -> MetricsSnapshot {
        MetricsSnapshot {
            rtt_p50: 16.0,
            rtt_p99: 128.0,
            tcp_retrans_rate: 10.0,
            drop_rate: 0.333,
            runqlat_p95: 2.5,
            cpu_utilization: 41.256,
            ..MetricsSnapshot::new(0, node_name)
        }
    }

    #[test]
    fn test_render_single_node() {
        let text = render(&[sample("worker-1")]);
        let expected = "\
# HELP ebpf_rtt_p50_milliseconds 50th percentile RTT in milliseconds
# TYPE ebpf_rtt_p50_milliseconds gauge
ebpf_rtt_p50_milliseconds{node=\"worker-1\"} 16.00
# HELP ebpf_rtt_p99_milliseconds 99th percentile RTT in milliseconds
# TYPE ebpf_rtt_p99_milliseconds gauge
ebpf_rtt_p99_milliseconds{node=\"worker-1\"} 128.00
# HELP ebpf_tcp_retrans_rate TCP retransmission rate per second
# TYPE ebpf_tcp_retrans_rate gauge
ebpf_tcp_retrans_rate{node=\"worker-1\"} 10.00
# HELP ebpf_drop_rate Packet drop rate per second
# TYPE ebpf_drop_rate gauge
ebpf_drop_rate{node=\"worker-1\"} 0.33
# HELP ebpf_runqlat_p95_milliseconds 95th percentile runqueue latency
# TYPE ebpf_runqlat_p95_milliseconds gauge
ebpf_runqlat_p95_milliseconds{node=\"worker-1\"} 2.50
# HELP ebpf_cpu_utilization CPU utilization percentage
# TYPE ebpf_cpu_utilization gauge
ebpf_cpu_utilization{node=\"worker-1\"} 41.26

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_multi_node_shares_headers() {
        let text = render(&[sample("a"), sample("b")]);
        assert_eq!(text.matches("# TYPE ebpf_drop_rate gauge").count(), 1);
        assert!(text.contains("ebpf_drop_rate{node=\"a\"} 0.33\nebpf_drop_rate{node=\"b\"} 0.33\n"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn test_render_empty() {
        assert!(render(&[]).is_empty());
    }

    #[test]
    fn test_label_escaping() {
        let text = render(&[sample("we\"ird\\host")]);
        assert!(text.contains("{node=\"we\\\"ird\\\\host\"}"));
    }

    #[test]
    fn test_exporter_writes_whole_tick() {
        let mut exporter = PrometheusExporter::new(Vec::new());
        exporter.export(&[sample("n")]).expect("export to memory");
        exporter.export(&[]).expect("empty export");

        assert_eq!(exporter.exports(), 1);
        let written = String::from_utf8(exporter.into_inner()).expect("utf8");
        assert_eq!(written, render(&[sample("n")]));
    }
}
