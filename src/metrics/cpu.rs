//! CPU utilization sampled from `/proc/stat`
//!
//! Utilization is the busy share of CPU time between two consecutive
//! samples, so the first call has nothing to compare against and reports 0.

use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Source of the node's CPU utilization percentage
pub trait CpuSampler: Send {
    /// Utilization in `[0, 100]` since the previous call
    fn current_utilization(&mut self) -> f64;
}

/// Cumulative CPU times from the aggregate `cpu` line, in clock ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

/// Parse the aggregate `cpu` line of a `/proc/stat` dump.
///
/// Busy time counts user, nice, system, irq and softirq; idle and iowait
/// are excluded.
pub fn parse_proc_stat(contents: &str) -> Option<CpuTimes> {
    let line = contents
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))?;

    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;

    let [user, nice, system, idle, iowait, irq, softirq] = fields[..] else {
        return None;
    };

    let total = [user, nice, system, idle, iowait, irq, softirq]
        .into_iter()
        .try_fold(0u64, u64::checked_add)?;
    Some(CpuTimes {
        busy: total - idle - iowait,
        total,
    })
}

pub struct ProcStatCpu {
    path: PathBuf,
    previous: Option<CpuTimes>,
}

impl ProcStatCpu {
    pub fn new() -> Self {
        Self::with_path(PathBuf::from("/proc/stat"))
    }

    /// Read from a custom stat file (for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            previous: None,
        }
    }

    fn read(&self) -> Option<CpuTimes> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };

        let times = parse_proc_stat(&contents);
        if times.is_none() {
            warn!("No parsable cpu line in {}", self.path.display());
        }
        times
    }
}

impl Default for ProcStatCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSampler for ProcStatCpu {
    fn current_utilization(&mut self) -> f64 {
        let Some(current) = self.read() else {
            return 0.0;
        };

        let utilization = match self.previous {
            Some(previous) => {
                let total = current.total.saturating_sub(previous.total);
                let busy = current.busy.saturating_sub(previous.busy);
                if total == 0 {
                    0.0
                } else {
                    (busy as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
                }
            }
            None => 0.0,
        };

        self.previous = Some(current);
        utilization
    }
}

/// Fixed utilization, for tests and hosts without `/proc`
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCpu(pub f64);

impl CpuSampler for StaticCpu {
    fn current_utilization(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Seek, Write};
    use tempfile::NamedTempFile;

    const STAT_A: &str = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\nintr 1234\n";
    const STAT_B: &str = "cpu  160 0 140 800 100 0 0 0 0 0\ncpu0 80 0 70 400 50 0 0 0 0 0\nintr 1300\n";

    fn write_stat(file: &mut NamedTempFile, contents: &str) {
        let f = file.as_file_mut();
        f.set_len(0).expect("truncate");
        f.rewind().expect("rewind");
        f.write_all(contents.as_bytes()).expect("write stat");
        f.flush().expect("flush");
    }

    #[test]
    fn test_parse_proc_stat() {
        let times = parse_proc_stat(STAT_A).expect("cpu line");
        assert_eq!(times.total, 1000);
        assert_eq!(times.busy, 200);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_proc_stat("").is_none());
        assert!(parse_proc_stat("cpu0 1 2 3 4 5 6 7\n").is_none());
        assert!(parse_proc_stat("cpu 1 2 x 4 5 6 7\n").is_none());
        assert!(parse_proc_stat("cpu 1 2 3\n").is_none());
    }

    #[test]
    fn test_parse_rejects_overflowing_totals() {
        let stat = format!("cpu  {} {} 0 0 0 0 0\n", u64::MAX, 1);
        assert!(parse_proc_stat(&stat).is_none());
    }

    #[test]
    fn test_overflowing_stat_degrades_to_zero() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write_stat(&mut file, &format!("cpu  {} {} 0 0 0 0 0\n", u64::MAX, u64::MAX));
        let mut cpu = ProcStatCpu::with_path(file.path().to_path_buf());
        assert_eq!(cpu.current_utilization(), 0.0);
    }

    #[test]
    fn test_utilization_between_samples() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write_stat(&mut file, STAT_A);
        let mut cpu = ProcStatCpu::with_path(file.path().to_path_buf());

        assert_eq!(cpu.current_utilization(), 0.0);

        // +100 busy out of +200 total
        write_stat(&mut file, STAT_B);
        assert_eq!(cpu.current_utilization(), 50.0);

        // No progress at all
        assert_eq!(cpu.current_utilization(), 0.0);
    }

    #[test]
    fn test_missing_file_degrades_to_zero() {
        let mut cpu = ProcStatCpu::with_path(PathBuf::from("/nonexistent/ebtel/stat"));
        assert_eq!(cpu.current_utilization(), 0.0);
        assert_eq!(cpu.current_utilization(), 0.0);
    }
}
