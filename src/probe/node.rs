//! Node identification strategies
//!
//! How a callback decides which node it reports for belongs to whatever
//! attaches the instrumentation, so it is injected as a plain function.

use std::sync::Arc;

pub type NodeIdFn = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Every observation belongs to one node
pub fn fixed(node_id: u32) -> NodeIdFn {
    Arc::new(move || node_id)
}

/// Hash the current CPU into `0..slots`
pub fn cpu_hash(slots: u32) -> NodeIdFn {
    let slots = slots.max(1);
    Arc::new(move || current_cpu() % slots)
}

#[cfg(target_os = "linux")]
fn current_cpu() -> u32 {
    // SAFETY: sched_getcpu has no preconditions
    let cpu = unsafe { libc::sched_getcpu() };
    if cpu < 0 {
        0
    } else {
        cpu as u32
    }
}

#[cfg(not(target_os = "linux"))]
fn current_cpu() -> u32 {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_strategy() {
        let node = fixed(5);
        assert_eq!(node(), 5);
        assert_eq!(node(), 5);
    }

    #[test]
    fn test_cpu_hash_stays_in_range() {
        let node = cpu_hash(3);
        for _ in 0..100 {
            assert!(node() < 3);
        }
        // Zero slots falls back to a single node
        assert_eq!(cpu_hash(0)(), 0);
    }
}
