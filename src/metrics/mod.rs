pub mod cpu;
pub mod exporter;
pub mod percentile;
pub mod rate;
pub mod snapshot;

pub use cpu::{CpuSampler, ProcStatCpu, StaticCpu};
pub use exporter::{render, Exporter, PrometheusExporter};
pub use percentile::percentile;
pub use rate::{rate, RateState};
pub use snapshot::MetricsSnapshot;
