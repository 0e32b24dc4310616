use crate::probe::SamplingPolicy;
use crate::{EbtelError, Result};
use ebtel_common::{MAX_DROP_REASONS, MAX_INFLIGHT_WAKEUPS, MAX_NODES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Agent configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Seconds between aggregation ticks. Default: 5.
    pub interval_secs: u64,

    /// Upper bound on one event-channel poll, in milliseconds. Default: 100.
    pub poll_timeout_ms: u64,

    /// Sampled event channel capacity. Default: 65536.
    pub channel_capacity: usize,

    /// Node identifier bound for the per-node tables. Default: 256.
    pub max_nodes: usize,

    /// Drop-reason code bound. Default: 64.
    pub max_drop_reasons: usize,

    /// In-flight scheduler wakeups tracked at once. Default: 10240.
    pub max_inflight_wakeups: usize,

    /// Range of the default CPU-hash node strategy. Default: 8.
    pub node_slots: u32,

    /// Host name used in metric labels. Falls back to `NODE_NAME`, then the
    /// system host name.
    pub node_name: Option<String>,

    /// Location of the kernel CPU statistics. Default: /proc/stat.
    pub proc_stat_path: PathBuf,

    /// Per event type 1-in-N publication rates.
    pub sampling: SamplingPolicy,

    /// Producer threads started by `run --synthetic`. Default: 4.
    pub synthetic_producers: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            poll_timeout_ms: 100,
            channel_capacity: 65_536,
            max_nodes: MAX_NODES,
            max_drop_reasons: MAX_DROP_REASONS,
            max_inflight_wakeups: MAX_INFLIGHT_WAKEUPS,
            node_slots: 8,
            node_name: None,
            proc_stat_path: PathBuf::from("/proc/stat"),
            sampling: SamplingPolicy::default(),
            synthetic_producers: 4,
        }
    }
}

impl AgentConfig {
    /// Load from a YAML file, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                let contents = fs::read_to_string(path).map_err(|e| {
                    EbtelError::Config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_yaml(&contents)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(EbtelError::Config("interval_secs must be > 0".into()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(EbtelError::Config("poll_timeout_ms must be > 0".into()));
        }
        if self.poll_timeout() >= self.interval() {
            return Err(EbtelError::Config(format!(
                "poll_timeout_ms ({}) must be shorter than the {}s interval",
                self.poll_timeout_ms, self.interval_secs
            )));
        }
        if self.channel_capacity == 0 {
            return Err(EbtelError::Config("channel_capacity must be > 0".into()));
        }
        if self.max_nodes == 0 || self.max_drop_reasons == 0 || self.max_inflight_wakeups == 0 {
            return Err(EbtelError::Config("table capacities must be > 0".into()));
        }
        if self.node_slots == 0 || self.node_slots as usize > self.max_nodes {
            return Err(EbtelError::Config(format!(
                "node_slots must be between 1 and max_nodes ({}), got {}",
                self.max_nodes, self.node_slots
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Host name for metric labels: config, then `NODE_NAME`, then hostname
    pub fn resolve_node_name(&self) -> String {
        self.node_name
            .clone()
            .filter(|name| !name.is_empty())
            .or_else(|| std::env::var("NODE_NAME").ok().filter(|n| !n.is_empty()))
            .or_else(|| {
                hostname::get()
                    .ok()
                    .map(|h| h.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}
